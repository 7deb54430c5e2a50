//! Instruction set definition for the simulated core.
//!
//! This module is the static vocabulary of the machine:
//! - [`Opcode`] - the closed set of declared opcodes and their mnemonics
//! - register, I/O register and status-bit names
//! - [`format_binary`] - binary digit strings for diagnostic display
//!
//! Nothing in here holds mutable state.

mod opcode;
mod names;
mod format;

pub use opcode::{Opcode, opcode_name};
pub use names::{
    CycleState, StatusFlag, cycle_state_name, register_name, register_index, io_register_name, io_register_address,
    REGISTER_COUNT, IO_REGISTERS,
    DDRB, PORTB, PINB, DDRC, PORTC, PINC, DDRD, PORTD, PIND,
    PCICR, PCIFR, PCMSK0, PCMSK1, PCMSK2,
};
pub use format::format_binary;
