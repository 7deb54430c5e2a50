//! Opcode table.
//!
//! Every declared opcode is one variant of [`Opcode`]. The execute phase
//! matches on it exhaustively, so a new variant cannot be added without
//! giving it execution semantics.

use serde::{Serialize, Deserialize};

/// A declared opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Transfer ====================

    /// No operation
    Nop = 0x00,
    /// Load immediate: Rd := K
    Ldi = 0x01,
    /// Copy register: Rd := Rr
    Mov = 0x02,
    /// Write I/O cell: IO[A] := Rr
    Out = 0x03,
    /// Read I/O cell: Rd := IO[A]
    In = 0x04,
    /// Store to data storage: DATA[A] := Rr
    Sts = 0x05,
    /// Load from data storage: Rd := DATA[A]
    Lds = 0x06,

    // ==================== Logic ====================

    Clr = 0x07,
    Ori = 0x08,
    Andi = 0x09,
    Xori = 0x0A,
    Or = 0x0B,
    And = 0x0C,
    Xor = 0x0D,

    // ==================== Arithmetic ====================

    Addi = 0x0E,
    Subi = 0x0F,
    Add = 0x10,
    Sub = 0x11,
    Inc = 0x12,
    Dec = 0x13,
    Cpi = 0x14,
    Cp = 0x15,

    // ==================== Control Flow ====================

    /// Unconditional absolute jump
    Jmp = 0x16,
    Breq = 0x17,
    Brne = 0x18,
    Brge = 0x19,
    Brgt = 0x1A,
    Brle = 0x1B,
    Brlt = 0x1C,
    Call = 0x1D,
    Ret = 0x1E,
    Reti = 0x1F,

    // ==================== Stack / Shift / Interrupt flag ====================

    Push = 0x20,
    Pop = 0x21,
    Lsl = 0x22,
    Lsr = 0x23,
    Sei = 0x24,
    Cli = 0x25,
}

impl Opcode {
    /// Every declared opcode, in encoding order.
    pub const ALL: [Opcode; 38] = [
        Opcode::Nop, Opcode::Ldi, Opcode::Mov, Opcode::Out, Opcode::In,
        Opcode::Sts, Opcode::Lds, Opcode::Clr, Opcode::Ori, Opcode::Andi,
        Opcode::Xori, Opcode::Or, Opcode::And, Opcode::Xor, Opcode::Addi,
        Opcode::Subi, Opcode::Add, Opcode::Sub, Opcode::Inc, Opcode::Dec,
        Opcode::Cpi, Opcode::Cp, Opcode::Jmp, Opcode::Breq, Opcode::Brne,
        Opcode::Brge, Opcode::Brgt, Opcode::Brle, Opcode::Brlt, Opcode::Call,
        Opcode::Ret, Opcode::Reti, Opcode::Push, Opcode::Pop, Opcode::Lsl,
        Opcode::Lsr, Opcode::Sei, Opcode::Cli,
    ];

    /// Look up the opcode for a raw 8-bit value.
    ///
    /// Returns `None` for undeclared values.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// The raw encoding of this opcode.
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Canonical upper-case mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Ldi => "LDI",
            Opcode::Mov => "MOV",
            Opcode::Out => "OUT",
            Opcode::In => "IN",
            Opcode::Sts => "STS",
            Opcode::Lds => "LDS",
            Opcode::Clr => "CLR",
            Opcode::Ori => "ORI",
            Opcode::Andi => "ANDI",
            Opcode::Xori => "XORI",
            Opcode::Or => "OR",
            Opcode::And => "AND",
            Opcode::Xor => "XOR",
            Opcode::Addi => "ADDI",
            Opcode::Subi => "SUBI",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Cpi => "CPI",
            Opcode::Cp => "CP",
            Opcode::Jmp => "JMP",
            Opcode::Breq => "BREQ",
            Opcode::Brne => "BRNE",
            Opcode::Brge => "BRGE",
            Opcode::Brgt => "BRGT",
            Opcode::Brle => "BRLE",
            Opcode::Brlt => "BRLT",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Reti => "RETI",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Lsl => "LSL",
            Opcode::Lsr => "LSR",
            Opcode::Sei => "SEI",
            Opcode::Cli => "CLI",
        }
    }

    /// Parse a mnemonic (case-insensitive).
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        let upper = text.to_ascii_uppercase();
        Self::ALL.iter().copied().find(|op| op.mnemonic() == upper)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Mnemonic for a raw opcode value, or `"Unknown"` if it is not declared.
pub fn opcode_name(opcode: u8) -> &'static str {
    Opcode::from_u8(opcode).map_or("Unknown", Opcode::mnemonic)
}
