//! Emulator for a minimal 8-bit computer: 256 bytes of RAM, eight
//! general-purpose registers and a variable-length instruction encoding
//! where the two high bits of the opcode give the operand count.

pub mod memory;
pub mod processor;
