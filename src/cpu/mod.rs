//! Control unit of the simulated core.
//!
//! This module implements the whole machine:
//! - 32 general-purpose 8-bit registers and a 5-bit status register
//! - 2000 bytes of data memory (I/O registers, data storage, stack)
//! - up to 256 words of program memory, addressed by an 8-bit PC
//! - the three-phase fetch/decode/execute state machine

pub mod alu;
pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod snapshot;

pub use memory::{DataMemory, ProgramMemory, MemoryError, DATA_MEMORY_SIZE, DATA_BASE, STACK_LIMIT};
pub use registers::{RegisterFile, RegisterError, StatusRegister};
pub use decode::{InstructionWord, decode, encode};
pub use execute::{ControlUnit, Config, Cycle, CpuError, UnknownOpcodePolicy};
pub use snapshot::{Snapshot, PortB};

/// Built-in demonstration program: toggles port B from a pin input.
pub const DEMO_PROGRAM: [u32; 13] = [
    0x160500, // JMP 0x05
    0x000000, // NOP
    0x000000, // NOP
    0x000000, // NOP
    0x000000, // NOP
    0x011001, // LDI R16, 0x01
    0x030010, // OUT DDRB, R16
    0x021110, // MOV R17, R16
    0x011020, // LDI R16, 0x20
    0x030110, // OUT PORTB, R16
    0x030211, // OUT PINB, R17
    0x041002, // IN R16, PINB
    0x160500, // JMP 0x05
];
