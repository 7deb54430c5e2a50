//! Read-only machine state for presentation layers.

use crate::cpu::decode::InstructionWord;
use crate::cpu::execute::ControlUnit;
use crate::isa::{cycle_state_name, opcode_name, CycleState, DDRB, PINB, PORTB, REGISTER_COUNT};
use serde::{Serialize, Deserialize};

/// The three I/O cells of port B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortB {
    pub ddrb: u8,
    pub portb: u8,
    pub pinb: u8,
}

/// A copy of everything a debugger or printout needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub opcode_name: String,
    pub state_name: String,
    pub state: CycleState,
    pub program_counter: u8,
    pub memory_address: u8,
    pub instruction_register: u32,
    pub fields: InstructionWord,
    /// Status register bits, `INZVC`.
    pub status: u8,
    pub stack_pointer: usize,
    pub registers: [u8; REGISTER_COUNT],
    pub io: PortB,
    pub instructions: u64,
}

impl Snapshot {
    pub(crate) fn capture(cu: &ControlUnit) -> Self {
        let fields = cu.fields();
        let data = cu.data_memory();
        let io = |addr: u8| data.read(addr as usize).unwrap_or_default();

        Self {
            opcode_name: opcode_name(fields.opcode).to_string(),
            state_name: cycle_state_name(cu.state()).to_string(),
            state: cu.state(),
            program_counter: cu.pc(),
            memory_address: cu.mar(),
            instruction_register: cu.ir(),
            fields,
            status: cu.status().bits(),
            stack_pointer: cu.sp(),
            registers: *cu.registers().as_array(),
            io: PortB {
                ddrb: io(DDRB),
                portb: io(PORTB),
                pinb: io(PINB),
            },
            instructions: cu.instructions(),
        }
    }

    /// Contents of register `index`, if it exists.
    pub fn register(&self, index: u8) -> Option<u8> {
        self.registers.get(index as usize).copied()
    }
}
