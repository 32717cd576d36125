pub mod load;

pub type Byte = u8; // 1 byte

/// Default memory: the full 8-bit address space
pub type StdMem = Memory<256>;

/// Emulates the byte-addressable RAM of the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Byte; S],
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory { data: [0; S] }
    }
}

impl<const S: usize> Memory<S> {
    /// Reads a byte from the memory. Addresses wrap modulo the memory
    /// size; an out-of-range address is defined behavior, not an error.
    pub fn read_byte(&self, address: Byte) -> Byte {
        self.data[address as usize % S]
    }

    /// Writes a byte to the memory, wrapping the address like [`Memory::read_byte`]
    pub fn write_byte(&mut self, address: Byte, value: Byte) {
        self.data[address as usize % S] = value;
    }

    /// Writes an array of bytes to consecutive memory addresses
    pub fn write_array(&mut self, address: Byte, data: &[Byte]) {
        let start = address as usize % S;
        (&mut self.data[start..start + data.len()]).copy_from_slice(data);
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $byte:expr ),+ ) => {
        $mem.write_array($pos, &[
            $(
                $byte as $crate::memory::Byte,
            )+
        ]);
    };
}

#[cfg(test)]
mod tests {
    use crate::processor::Instruction;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_read_byte() -> Result<()> {
        let mut mem = StdMem::default();
        mem.data[0x2] = 0x12;
        assert_eq!(mem.read_byte(0x2), 0x12);

        Ok(())
    }

    #[test]
    fn test_write_byte() -> Result<()> {
        let mut mem = StdMem::default();
        mem.write_byte(0x44, 12);
        assert_eq!(mem.data[0x44], 12);

        Ok(())
    }

    #[test]
    fn test_address_wraps_on_small_memory() -> Result<()> {
        let mut mem: Memory<16> = Memory::default();
        mem.write_byte(0x12, 7);
        assert_eq!(mem.data[0x2], 7);
        assert_eq!(mem.read_byte(0x12), 7);

        Ok(())
    }

    #[test]
    fn test_write_array() -> Result<()> {
        let mut mem = StdMem::default();
        mem.write_array(0x44, &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(mem.data[0x44], 0x12);
        assert_eq!(mem.data[0x45], 0x34);
        assert_eq!(mem.data[0x46], 0x56);
        assert_eq!(mem.data[0x47], 0x78);

        Ok(())
    }

    #[test]
    fn test_write_instructions() -> Result<()> {
        let mut mem = StdMem::default();

        mem.write_array(
            0x10,
            &[
                Instruction::LDI as Byte,
                0,
                8,
                Instruction::PRN as Byte,
                0,
                Instruction::HLT as Byte,
            ],
        );

        let mut mem2 = StdMem::default();
        use crate::processor::Instruction::*;
        write_instructions!(mem2 : 0x10 => LDI, 0, 8, PRN, 0, HLT);

        assert_eq!(mem, mem2);

        Ok(())
    }
}
