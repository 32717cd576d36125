//! Loads a program image into memory.
//!
//! An image is a plain-text file with one instruction byte per line,
//! written as a string of `0`/`1` characters:
//!
//! ```text
//! # print8.img
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```
//!
//! Bytes are assigned to consecutive addresses starting at 0. Lines that
//! do not start with a binary digit (blank lines, comments) are skipped
//! and do not consume an address.

use std::convert::Infallible;
use std::str::{FromStr, Lines};
use std::{fs, io, path::Path};

use super::{Byte, Memory};

#[derive(Debug, Clone)]
pub struct Loader<'a, const S: usize> {
    lines: Lines<'a>,
    line_nr: usize,
    cursor: usize,
    memory: Memory<S>,
}

impl<'a, const S: usize> Loader<'a, S> {
    /// Creates a new loader for `data` which will populate `memory`.
    pub fn new(data: &'a str, memory: Memory<S>) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            cursor: 0,
            memory,
        }
    }

    /// Consumes `self` and loads all valid lines of the image into memory.
    ///
    /// Loading never fails: unparseable lines are skipped. Addresses past
    /// the end of memory wrap, per the memory contract.
    pub fn load(mut self) -> Memory<S> {
        while self.load_next_line().is_some() {}

        log::debug!("loaded {} bytes from {} lines", self.cursor, self.line_nr);

        self.memory
    }

    /// Loads the next line of the image, if any. Returns `None` once the
    /// input is exhausted.
    fn load_next_line(&mut self) -> Option<()> {
        let line = self.lines.next()?.trim_start();
        self.line_nr += 1;

        match parse_binary_literal(line) {
            Some(byte) => {
                self.memory.write_byte(self.cursor as Byte, byte);
                self.cursor += 1;
            }
            None => {
                log::debug!("[{}] no binary literal; line skipped", self.line_nr);
            }
        }

        Some(())
    }
}

/// Parses the leading run of binary digits of `line` as an 8-bit value.
/// Anything after the run (inline comments) is ignored. Runs longer than
/// eight digits keep only the low 8 bits.
fn parse_binary_literal(line: &str) -> Option<Byte> {
    let digits = match line.find(|c| c != '0' && c != '1') {
        Some(end) => &line[..end],
        None => line,
    };

    if digits.is_empty() {
        return None;
    }

    // The value modulo 256 is exactly the last eight binary digits.
    let digits = &digits[digits.len().saturating_sub(8)..];
    Byte::from_str_radix(digits, 2).ok()
}

impl<const S: usize> Memory<S> {
    /// Reads a program image from the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails only if the file cannot be read; the image content itself
    /// cannot be invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(Loader::new(&data, Self::default()).load())
    }
}

impl<const S: usize> FromStr for Memory<S> {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Loader::new(s, Self::default()).load())
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::StdMem;
    use crate::processor::Instruction;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn load_print8() -> Result<()> {
        let data = r#"
            10000010
            00000000
            00001000
            01000111
            00000000
            00000001
        "#;

        let mem: StdMem = data.parse()?;

        assert_eq!(mem.read_byte(0), Instruction::LDI as Byte);
        assert_eq!(mem.read_byte(1), 0);
        assert_eq!(mem.read_byte(2), 8);
        assert_eq!(mem.read_byte(3), Instruction::PRN as Byte);
        assert_eq!(mem.read_byte(4), 0);
        assert_eq!(mem.read_byte(5), Instruction::HLT as Byte);

        Ok(())
    }

    #[test]
    fn load_skips_comments_and_blank_lines() -> Result<()> {
        let data = r#"
            # a comment line

            10000010 # LDI R0,8
            00000000
            00001000
            this line is not a literal
            00000001
        "#;

        let mem: StdMem = data.parse()?;

        assert_eq!(mem.read_byte(0), Instruction::LDI as Byte);
        assert_eq!(mem.read_byte(1), 0);
        assert_eq!(mem.read_byte(2), 8);
        // skipped lines consume no address
        assert_eq!(mem.read_byte(3), Instruction::HLT as Byte);

        Ok(())
    }

    #[test]
    fn load_truncates_long_literals() -> Result<()> {
        let mem: StdMem = "111111111\n".parse()?;

        // nine ones: only the low eight bits are kept
        assert_eq!(mem.read_byte(0), 0xFF);

        Ok(())
    }

    #[test]
    fn load_wraps_past_end_of_memory() -> Result<()> {
        let data = "00000001\n".repeat(257);
        let mem: StdMem = data.parse()?;

        // byte 256 lands back on address 0
        assert_eq!(mem.read_byte(0), 1);
        assert_eq!(mem.read_byte(255), 1);

        Ok(())
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = StdMem::from_file("no/such/image.img");
        assert!(result.is_err());
    }
}
