//! Register file, I/O space and status-bit vocabulary.

use serde::{Serialize, Deserialize};

/// Number of general-purpose registers (R0-R31).
pub const REGISTER_COUNT: usize = 32;

// Memory-mapped I/O registers, at the bottom of data memory.
pub const DDRB: u8 = 0x00;
pub const PORTB: u8 = 0x01;
pub const PINB: u8 = 0x02;

pub const DDRC: u8 = 0x03;
pub const PORTC: u8 = 0x04;
pub const PINC: u8 = 0x05;

pub const DDRD: u8 = 0x06;
pub const PORTD: u8 = 0x07;
pub const PIND: u8 = 0x08;

pub const PCICR: u8 = 0x09;
pub const PCIFR: u8 = 0x0A;

pub const PCMSK0: u8 = 0x10;
pub const PCMSK1: u8 = 0x11;
pub const PCMSK2: u8 = 0x12;

/// Symbolic I/O registers as `(name, address)` pairs.
pub const IO_REGISTERS: [(&str, u8); 14] = [
    ("DDRB", DDRB),
    ("PORTB", PORTB),
    ("PINB", PINB),
    ("DDRC", DDRC),
    ("PORTC", PORTC),
    ("PINC", PINC),
    ("DDRD", DDRD),
    ("PORTD", PORTD),
    ("PIND", PIND),
    ("PCICR", PCICR),
    ("PCIFR", PCIFR),
    ("PCMSK0", PCMSK0),
    ("PCMSK1", PCMSK1),
    ("PCMSK2", PCMSK2),
];

/// Phase of the instruction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CycleState {
    #[default]
    Fetch,
    Decode,
    Execute,
}

impl CycleState {
    /// The phase that follows this one.
    pub const fn next(self) -> Self {
        match self {
            CycleState::Fetch => CycleState::Decode,
            CycleState::Decode => CycleState::Execute,
            CycleState::Execute => CycleState::Fetch,
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(cycle_state_name(*self))
    }
}

/// Display name of a cycle state.
pub fn cycle_state_name(state: CycleState) -> &'static str {
    match state {
        CycleState::Fetch => "Fetch",
        CycleState::Decode => "Decode",
        CycleState::Execute => "Execute",
    }
}

/// Status register bits (`INZVC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFlag {
    Carry,
    Overflow,
    Zero,
    Negative,
    Interrupt,
}

impl StatusFlag {
    /// All flags, most significant first (display order `INZVC`).
    pub const ALL: [StatusFlag; 5] = [
        StatusFlag::Interrupt,
        StatusFlag::Negative,
        StatusFlag::Zero,
        StatusFlag::Overflow,
        StatusFlag::Carry,
    ];

    /// Bit position within the status register.
    pub const fn bit(self) -> u8 {
        match self {
            StatusFlag::Carry => 0,
            StatusFlag::Overflow => 1,
            StatusFlag::Zero => 2,
            StatusFlag::Negative => 3,
            StatusFlag::Interrupt => 4,
        }
    }

    pub const fn mask(self) -> u8 {
        1 << self.bit()
    }

    /// Single-letter name used in the `INZVC` display.
    pub const fn letter(self) -> char {
        match self {
            StatusFlag::Carry => 'C',
            StatusFlag::Overflow => 'V',
            StatusFlag::Zero => 'Z',
            StatusFlag::Negative => 'N',
            StatusFlag::Interrupt => 'I',
        }
    }
}

/// Symbolic name of a register: `R<index>`, or `"Unknown"` past R31.
pub fn register_name(index: u8) -> String {
    if (index as usize) < REGISTER_COUNT {
        format!("R{}", index)
    } else {
        "Unknown".to_string()
    }
}

/// Parse a register name such as `R16` (case-insensitive).
pub fn register_index(name: &str) -> Option<u8> {
    let digits = name.strip_prefix('R').or_else(|| name.strip_prefix('r'))?;
    let index: u8 = digits.parse().ok()?;
    ((index as usize) < REGISTER_COUNT).then_some(index)
}

/// Symbolic name of an I/O address, if it has one.
pub fn io_register_name(address: u8) -> Option<&'static str> {
    IO_REGISTERS
        .iter()
        .find(|(_, addr)| *addr == address)
        .map(|(name, _)| *name)
}

/// Address of a named I/O register (case-insensitive).
pub fn io_register_address(name: &str) -> Option<u8> {
    IO_REGISTERS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, addr)| *addr)
}
