//! Debugger application state and logic.

use crate::asm::disasm::disassemble_instruction;
use crate::cpu::{ControlUnit, Cycle, DATA_MEMORY_SIZE};
use crate::isa::PINB;
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub cu: ControlUnit,
    /// Breakpoints (by program address).
    pub breakpoints: HashSet<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Data memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger around a prepared machine.
    pub fn new(cu: ControlUnit) -> Self {
        Self {
            cu,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. 's' instruction, 'c' clock cycle, 'r' run, 'q' quit.".into(),
            mem_scroll: 0,
        }
    }

    /// Run one full instruction cycle.
    pub fn step(&mut self) {
        match self.cu.step_instruction() {
            Ok(Cycle::Reset { opcode, address }) => {
                self.status = format!("Unknown opcode {:#04x} at {:02X}, system reset", opcode, address);
            }
            Ok(_) => {
                let word = self.cu.ir();
                self.status = format!("{:02X}: {}", self.cu.mar(), disassemble_instruction(word));
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run one clock cycle (a single phase).
    pub fn clock(&mut self) {
        let before = self.cu.state();
        match self.cu.step_state() {
            Ok(_) => self.status = format!("{} done, next: {}", before, self.cu.state()),
            Err(e) => self.status = format!("Error: {}", e),
        }
    }

    /// Run until breakpoint or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        // Check for breakpoint
        let pc = self.cu.pc();
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02X}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cu.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02X}", pc);
        }
    }

    /// Toggle one bit of the pin input register PINB.
    pub fn toggle_pin(&mut self, bit: u8) {
        let pinb = self.cu.snapshot().io.pinb ^ (1 << bit);
        match self.cu.write_data_memory(PINB as usize, pinb) {
            Ok(()) => self.status = format!("PINB = {:08b}", pinb),
            Err(e) => self.status = format!("Error: {}", e),
        }
    }

    /// Reset the machine.
    pub fn reset(&mut self) {
        self.cu.reset();
        self.running = false;
        self.status = "System reset!".into();
    }

    /// Get disassembly around the instruction in flight.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u8, String, bool)> {
        let words = self.cu.program().words();
        let current = self.cu.mar() as usize;
        let start = current.saturating_sub(lines / 2);

        words
            .iter()
            .enumerate()
            .skip(start)
            .take(lines)
            .map(|(addr, word)| (addr as u8, disassemble_instruction(*word), addr == current))
            .collect()
    }
}

/// Run the debugger on a machine.
pub fn run_debugger(cu: ControlUnit) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(cu);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('c') => {
                            app.running = false;
                            app.clock();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char(c @ '0'..='7') => app.toggle_pin(c as u8 - b'0'),
                        KeyCode::Up => app.mem_scroll = app.mem_scroll.saturating_sub(1),
                        KeyCode::Down => {
                            app.mem_scroll = (app.mem_scroll + 1).min(DATA_MEMORY_SIZE / 8 - 1);
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = DebuggerApp::new(ControlUnit::new());
        app.step();
        assert_eq!(app.cu.pc(), 5);
        app.toggle_breakpoint();
        app.run();
        app.tick();
        assert!(!app.running);
        assert_eq!(app.cu.pc(), 5);
    }

    #[test]
    fn test_toggle_pin() {
        let mut app = DebuggerApp::new(ControlUnit::new());
        app.toggle_pin(5);
        assert_eq!(app.cu.snapshot().io.pinb, 0x20);
        app.toggle_pin(5);
        assert_eq!(app.cu.snapshot().io.pinb, 0x00);
    }

    #[test]
    fn test_disassembly_marks_current() {
        let mut app = DebuggerApp::new(ControlUnit::new());
        app.step();
        app.step();
        let lines = app.get_disassembly(4);
        let current: Vec<_> = lines.iter().filter(|(_, _, cur)| *cur).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 5);
    }
}
