//! # mcu8
//!
//! An instructional simulator of a small 8-bit register-based
//! microcontroller core.
//!
//! The machine has 32 general-purpose registers, a 2000-byte data space
//! shared by memory-mapped I/O and general storage, a 5-bit status register
//! and a fetch/decode/execute cycle that can be advanced one phase at a time.

pub mod isa;
pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use isa::{Opcode, CycleState, StatusFlag, opcode_name, cycle_state_name, register_name, format_binary};
pub use cpu::{ControlUnit, Config, Cycle, CpuError, UnknownOpcodePolicy, Snapshot, InstructionWord, DEMO_PROGRAM};
pub use asm::{assemble, disassemble, load_program, AssemblerError, LoadError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
