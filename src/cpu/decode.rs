//! Instruction word layout.
//!
//! An instruction is a packed 24-bit value stored in a `u32`:
//! - Bits 23-16: opcode
//! - Bits 15-8: operand 1 (destination register, I/O address or jump target)
//! - Bits 7-0: operand 2 (source register, I/O address or immediate)
//!
//! Bits 31-24 are ignored.

use crate::isa::Opcode;
use serde::{Serialize, Deserialize};

/// The three fields of a decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstructionWord {
    pub opcode: u8,
    pub operand1: u8,
    pub operand2: u8,
}

impl InstructionWord {
    pub const fn new(opcode: u8, operand1: u8, operand2: u8) -> Self {
        Self { opcode, operand1, operand2 }
    }

    /// The declared opcode, if any.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Pack back into a 24-bit word.
    pub const fn to_word(self) -> u32 {
        encode_fields(self.opcode, self.operand1, self.operand2)
    }
}

/// Split a raw instruction word into its fields.
pub const fn decode(word: u32) -> InstructionWord {
    InstructionWord {
        opcode: (word >> 16) as u8,
        operand1: (word >> 8) as u8,
        operand2: word as u8,
    }
}

/// Pack raw fields into an instruction word.
pub const fn encode_fields(opcode: u8, operand1: u8, operand2: u8) -> u32 {
    (opcode as u32) << 16 | (operand1 as u32) << 8 | operand2 as u32
}

/// Encode an instruction.
pub const fn encode(opcode: Opcode, operand1: u8, operand2: u8) -> u32 {
    encode_fields(opcode.to_u8(), operand1, operand2)
}
