//! TUI debugger for the simulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Control unit state (phase, PC, IR, status flags, port B)
//! - Register file and data memory views
//! - Instruction / clock-cycle stepping, run and breakpoints
//! - Pin input toggling for PINB

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
