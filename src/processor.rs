use std::convert::TryFrom;
use std::io::Write;

use crate::memory::{Byte, Memory};
use color_eyre::eyre::{Result, WrapErr};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Index of the register reserved as the stack pointer
pub const SP: usize = 7;

/// Equal bit in the flags register, set by CMP
pub const FL_EQ: Byte = 0x01;

/// Initial stack pointer value; the stack grows downward from here
const STACK_START: Byte = 0xF4;

/// Emulates the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Processor {
    /// General-purpose registers; `reg[SP]` is the stack pointer
    pub reg: [Byte; 8],
    /// Program counter
    pub pc: Byte,
    /// Flags register
    pub fl: Byte,
    /// Termination flag. Set to true when a HLT instruction executes
    pub halted: bool,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

/// Operand bytes trailing an opcode. The count is fixed by the opcode's
/// two high bits, so a given mnemonic always decodes to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operands {
    Zero,
    One(Byte),
    Two(Byte, Byte),
}

impl Operands {
    /// Number of operand bytes in the encoding
    pub fn count(&self) -> Byte {
        match self {
            Operands::Zero => 0,
            Operands::One(_) => 1,
            Operands::Two(_, _) => 2,
        }
    }

    /// First operand byte, or 0 when the encoding carries none
    pub fn first(&self) -> Byte {
        match *self {
            Operands::One(a) | Operands::Two(a, _) => a,
            Operands::Zero => 0,
        }
    }

    /// Second operand byte, or 0 when the encoding carries none
    pub fn second(&self) -> Byte {
        match *self {
            Operands::Two(_, b) => b,
            _ => 0,
        }
    }
}

/// A single decoded instruction: the raw opcode byte plus its operands.
/// Decoded fresh each cycle and discarded after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decoded {
    pub opcode: Byte,
    pub operands: Operands,
}

impl Decoded {
    /// Reads the instruction at `pc`: the opcode byte, then two trailing
    /// operand bytes if bit 7 of the opcode is set, one if bit 6 is set,
    /// none otherwise.
    pub fn fetch<const S: usize>(memory: &Memory<S>, pc: Byte) -> Self {
        let opcode = memory.read_byte(pc);

        let operands = if opcode & 0x80 != 0 {
            Operands::Two(
                memory.read_byte(pc.wrapping_add(1)),
                memory.read_byte(pc.wrapping_add(2)),
            )
        } else if opcode & 0x40 != 0 {
            Operands::One(memory.read_byte(pc.wrapping_add(1)))
        } else {
            Operands::Zero
        };

        Self { opcode, operands }
    }

    /// Total encoded length in bytes: the default program counter advance
    /// after execution
    pub fn len(&self) -> Byte {
        1 + self.operands.count()
    }
}

/// Operations the ALU can apply to the register file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Mul,
    And,
    Or,
    Xor,
    Not,
    Cmp,
}

impl Processor {
    /// Initializes a new CPU: everything zeroed except the stack pointer
    pub fn new() -> Self {
        let mut reg = [0; 8];
        reg[SP] = STACK_START;

        Self {
            reg,
            pc: 0,
            fl: 0,
            halted: false,
        }
    }

    /// Reads a general-purpose register. Register numbers occupy the low
    /// three bits of an operand byte
    pub fn register(&self, index: Byte) -> Byte {
        self.reg[(index & 0x7) as usize]
    }

    /// Writes a general-purpose register
    pub fn set_register(&mut self, index: Byte, value: Byte) {
        self.reg[(index & 0x7) as usize] = value;
    }

    /// Applies `op` to the registers numbered `a` and `b`, writing the
    /// result back to `a`. `Cmp` writes the flags register instead and
    /// leaves both registers untouched; the unary `Not` ignores `b`.
    pub fn alu(&mut self, op: AluOp, a: Byte, b: Byte) {
        match op {
            AluOp::Add => self.set_register(a, self.register(a).wrapping_add(self.register(b))),
            AluOp::Mul => self.set_register(a, self.register(a).wrapping_mul(self.register(b))),
            AluOp::And => self.set_register(a, self.register(a) & self.register(b)),
            AluOp::Or => self.set_register(a, self.register(a) | self.register(b)),
            AluOp::Xor => self.set_register(a, self.register(a) ^ self.register(b)),
            AluOp::Not => self.set_register(a, !self.register(a)),
            AluOp::Cmp => {
                if self.register(a) == self.register(b) {
                    self.fl |= FL_EQ;
                } else {
                    self.fl &= !FL_EQ;
                }
            }
        }
    }

    /// Pushes `value` onto the stack: SP is decremented before the write,
    /// so the stack grows toward lower addresses
    fn push<const S: usize>(&mut self, memory: &mut Memory<S>, value: Byte) {
        self.reg[SP] = self.reg[SP].wrapping_sub(1);
        memory.write_byte(self.reg[SP], value);
    }

    /// Pops the top of the stack: the value is read before SP is incremented
    fn pop<const S: usize>(&mut self, memory: &mut Memory<S>) -> Byte {
        let value = memory.read_byte(self.reg[SP]);
        self.reg[SP] = self.reg[SP].wrapping_add(1);
        value
    }

    /// Executes a single instruction. `out` receives PRN output.
    pub fn execute_instruction<const S: usize, W: Write>(
        &mut self,
        instruction: Instruction,
        operands: Operands,
        memory: &mut Memory<S>,
        out: &mut W,
    ) -> Result<()> {
        let (a, b) = (operands.first(), operands.second());
        let mut next = self.pc.wrapping_add(1 + operands.count());

        match instruction {
            Instruction::HLT => {
                self.halted = true;
                next = self.pc;
            }
            Instruction::LDI => self.set_register(a, b),
            Instruction::PRN => {
                writeln!(out, "{}", self.register(a)).wrap_err("failed to write PRN output")?;
            }
            Instruction::ADD => self.alu(AluOp::Add, a, b),
            Instruction::MUL => self.alu(AluOp::Mul, a, b),
            Instruction::CMP => self.alu(AluOp::Cmp, a, b),
            Instruction::AND => self.alu(AluOp::And, a, b),
            Instruction::OR => self.alu(AluOp::Or, a, b),
            Instruction::XOR => self.alu(AluOp::Xor, a, b),
            Instruction::NOT => self.alu(AluOp::Not, a, 0),
            Instruction::PUSH => self.push(memory, self.register(a)),
            Instruction::POP => {
                let value = self.pop(memory);
                self.set_register(a, value);
            }
            Instruction::CALL => {
                // the return address is the instruction after the CALL
                self.push(memory, next);
                next = self.register(a);
            }
            Instruction::RET => next = self.pop(memory),
            Instruction::JMP => next = self.register(a),
            Instruction::JEQ => {
                if self.fl & FL_EQ != 0 {
                    next = self.register(a);
                }
            }
            Instruction::JNE => {
                if self.fl & FL_EQ == 0 {
                    next = self.register(a);
                }
            }
        }

        self.pc = next;

        Ok(())
    }

    /// Runs one fetch-decode-execute cycle
    pub fn step<const S: usize, W: Write>(
        &mut self,
        memory: &mut Memory<S>,
        out: &mut W,
    ) -> Result<()> {
        let decoded = Decoded::fetch(memory, self.pc);

        match Instruction::try_from(decoded.opcode) {
            Ok(instruction) => {
                debug!("{:#04x}: {} {:?}", self.pc, instruction, decoded.operands);
                self.execute_instruction(instruction, decoded.operands, memory, out)
            }
            Err(_) => {
                // unknown opcodes are reported and skipped, so a malformed
                // program keeps running
                error!(
                    "unrecognized opcode {:#04x} at {:#04x}",
                    decoded.opcode, self.pc
                );
                self.pc = self.pc.wrapping_add(decoded.len());
                Ok(())
            }
        }
    }

    /// Runs the fetch-decode-execute loop until a HLT instruction. A
    /// program without HLT runs forever.
    pub fn run<const S: usize, W: Write>(
        &mut self,
        memory: &mut Memory<S>,
        out: &mut W,
    ) -> Result<()> {
        while !self.halted {
            self.step(memory, out)?;
        }

        Ok(())
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal , )+ ) => {
        /// The instruction set, one variant per opcode byte.
        ///
        /// The two high bits of an opcode give its operand count: bit 7
        /// set means two trailing operand bytes, bit 6 set means one.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// Stop execution
    HLT = 0x01,
    /// Return from subroutine: pop the return address into PC
    RET = 0x11,
    /// Push a register onto the stack
    PUSH = 0x45,
    /// Pop the top of the stack into a register
    POP = 0x46,
    /// Print a register as a decimal number
    PRN = 0x47,
    /// Call the subroutine at the address held in a register
    CALL = 0x50,
    /// Jump to the address held in a register
    JMP = 0x54,
    /// Jump if the equal flag is set
    JEQ = 0x55,
    /// Jump if the equal flag is clear
    JNE = 0x56,
    /// Bitwise complement of a register
    NOT = 0x69,
    /// Load an immediate value into a register
    LDI = 0x82,
    /// Add two registers
    ADD = 0xA0,
    /// Multiply two registers
    MUL = 0xA2,
    /// Compare two registers and set the equal flag
    CMP = 0xA7,
    /// Bitwise AND of two registers
    AND = 0xA8,
    /// Bitwise OR of two registers
    OR = 0xAA,
    /// Bitwise XOR of two registers
    XOR = 0xAB,
}
