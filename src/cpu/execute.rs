//! Control unit: the fetch-decode-execute state machine.
//!
//! [`ControlUnit::step_state`] advances exactly one phase of the instruction
//! cycle; [`ControlUnit::step_instruction`] runs phases until an Execute
//! phase has completed.

use crate::cpu::alu::{self, AluOp};
use crate::cpu::decode::{self, InstructionWord};
use crate::cpu::memory::{
    DataMemory, MemoryError, ProgramMemory, DATA_BASE, DATA_MEMORY_SIZE, STACK_LIMIT,
};
use crate::cpu::registers::{RegisterError, RegisterFile, StatusRegister};
use crate::cpu::snapshot::Snapshot;
use crate::cpu::DEMO_PROGRAM;
use crate::isa::{CycleState, Opcode, StatusFlag};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the control unit does when Execute meets an undeclared opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownOpcodePolicy {
    /// Reset the whole machine and carry on from address 0.
    #[default]
    Reset,
    /// Leave the machine untouched and report [`CpuError::UnknownOpcode`].
    Fault,
}

/// Control unit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    pub unknown_opcode: UnknownOpcodePolicy,
}

/// Outcome of one state-machine transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cycle {
    /// An instruction word was read from `address`.
    Fetched { address: u8, word: u32 },
    /// The instruction register was split into its fields.
    Decoded(InstructionWord),
    /// An instruction was executed.
    Executed(Opcode),
    /// An undeclared opcode forced a full reset.
    Reset { opcode: u8, address: u8 },
}

/// The simulated core.
///
/// Owns every piece of machine state; independent machines are independent
/// instances. Serializes for state dumps but is only ever built by the
/// constructors below.
#[derive(Clone, Serialize)]
pub struct ControlUnit {
    /// Instruction register: the word most recently fetched.
    ir: u32,
    /// Program counter: address of the next word to fetch.
    pc: u8,
    /// Memory address register: address of the instruction in flight.
    mar: u8,
    sr: StatusRegister,
    /// Stack pointer into data memory (descending, points at the next free cell).
    sp: usize,
    fields: InstructionWord,
    regs: RegisterFile,
    data: DataMemory,
    program: ProgramMemory,
    state: CycleState,
    config: Config,
    /// Instructions executed since the last reset.
    instructions: u64,
}

impl ControlUnit {
    /// Create a control unit running the built-in demonstration program.
    pub fn new() -> Self {
        let program = ProgramMemory::new(&DEMO_PROGRAM)
            .unwrap_or_default();
        Self::from_parts(program, Config::default())
    }

    /// Create a control unit running `program`.
    pub fn with_program(program: &[u32]) -> Result<Self, CpuError> {
        Ok(Self::from_parts(ProgramMemory::new(program)?, Config::default()))
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    fn from_parts(program: ProgramMemory, config: Config) -> Self {
        let mut cu = Self {
            ir: 0,
            pc: 0,
            mar: 0,
            sr: StatusRegister::new(),
            sp: DATA_MEMORY_SIZE - 1,
            fields: InstructionWord::default(),
            regs: RegisterFile::new(),
            data: DataMemory::new(),
            program,
            state: CycleState::Fetch,
            config,
            instructions: 0,
        };
        cu.reset();
        cu
    }

    /// Reset every register, all of data memory and the decode state.
    ///
    /// Program memory and configuration are kept.
    pub fn reset(&mut self) {
        self.ir = 0;
        self.pc = 0;
        self.mar = 0;
        self.sr.reset();
        self.sp = DATA_MEMORY_SIZE - 1;
        self.fields = InstructionWord::default();
        self.regs.reset();
        self.data.clear();
        self.state = CycleState::Fetch;
        self.instructions = 0;
    }

    /// Advance exactly one phase of the instruction cycle.
    ///
    /// A failed step leaves the machine as it was before the call.
    pub fn step_state(&mut self) -> Result<Cycle, CpuError> {
        match self.state {
            CycleState::Fetch => self.fetch(),
            CycleState::Decode => Ok(self.decode()),
            CycleState::Execute => self.execute(),
        }
    }

    /// Advance phases until an Execute phase has completed.
    ///
    /// Returns the outcome of that Execute phase.
    pub fn step_instruction(&mut self) -> Result<Cycle, CpuError> {
        loop {
            let previous = self.state;
            let cycle = self.step_state()?;
            if previous == CycleState::Execute {
                return Ok(cycle);
            }
        }
    }

    /// Run at most `max_instructions` instruction cycles.
    ///
    /// Returns the number of instruction cycles completed.
    pub fn run(&mut self, max_instructions: u64) -> Result<u64, CpuError> {
        for done in 0..max_instructions {
            if let Err(e) = self.step_instruction() {
                log::warn!("stopped after {} instruction cycles: {}", done, e);
                return Err(e);
            }
        }
        Ok(max_instructions)
    }

    fn fetch(&mut self) -> Result<Cycle, CpuError> {
        let word = self.program.read(self.pc).map_err(|_| CpuError::ProgramCounterOutOfRange {
            pc: self.pc,
            len: self.program.len(),
        })?;

        self.ir = word;
        self.mar = self.pc;
        self.pc = self.pc.wrapping_add(1);
        self.state = CycleState::Decode;

        log::debug!("fetch  [{:#04x}] {:#08x}", self.mar, word);
        Ok(Cycle::Fetched { address: self.mar, word })
    }

    fn decode(&mut self) -> Cycle {
        self.fields = decode::decode(self.ir);
        self.state = CycleState::Execute;

        log::debug!(
            "decode [{:#04x}] op={:#04x} op1={:#04x} op2={:#04x}",
            self.mar, self.fields.opcode, self.fields.operand1, self.fields.operand2
        );
        Cycle::Decoded(self.fields)
    }

    fn execute(&mut self) -> Result<Cycle, CpuError> {
        let Some(opcode) = self.fields.opcode() else {
            return self.unknown_opcode();
        };

        if let Err(e) = self.apply(opcode) {
            log::warn!("{} at {:#04x} faulted: {}", opcode, self.mar, e);
            return Err(e);
        }

        self.state = CycleState::Fetch;
        self.instructions += 1;

        log::debug!("exec   [{:#04x}] {} -> pc={:#04x}", self.mar, opcode, self.pc);
        Ok(Cycle::Executed(opcode))
    }

    fn unknown_opcode(&mut self) -> Result<Cycle, CpuError> {
        let opcode = self.fields.opcode;
        let address = self.mar;

        match self.config.unknown_opcode {
            UnknownOpcodePolicy::Reset => {
                log::warn!("unknown opcode {:#04x} at {:#04x}, resetting", opcode, address);
                self.reset();
                Ok(Cycle::Reset { opcode, address })
            }
            UnknownOpcodePolicy::Fault => Err(CpuError::UnknownOpcode { opcode, address }),
        }
    }

    /// Apply the effect of one instruction.
    ///
    /// Every fallible read happens before the first write, so an error
    /// leaves the machine unchanged.
    fn apply(&mut self, opcode: Opcode) -> Result<(), CpuError> {
        let InstructionWord { operand1: op1, operand2: op2, .. } = self.fields;

        match opcode {
            // ==================== Transfer ====================

            Opcode::Nop => {}

            Opcode::Ldi => self.regs.write(op1, op2)?,

            Opcode::Mov => {
                let value = self.regs.read(op2)?;
                self.regs.write(op1, value)?;
            }

            Opcode::In => {
                let value = self.data.read(op2 as usize)?;
                self.regs.write(op1, value)?;
            }

            Opcode::Out => {
                let value = self.regs.read(op2)?;
                self.data.write(op1 as usize, value)?;
            }

            Opcode::Lds => {
                let value = self.data.read(DATA_BASE + op2 as usize)?;
                self.regs.write(op1, value)?;
            }

            Opcode::Sts => {
                let value = self.regs.read(op2)?;
                self.data.write(DATA_BASE + op1 as usize, value)?;
            }

            // ==================== Logic / Arithmetic ====================

            Opcode::Clr => {
                self.regs.read(op1)?;
                let result = alu::clr(&mut self.sr);
                self.regs.write(op1, result)?;
            }

            Opcode::Ori => self.alu_immediate(alu::or, true)?,
            Opcode::Andi => self.alu_immediate(alu::and, true)?,
            Opcode::Xori => self.alu_immediate(alu::xor, true)?,
            Opcode::Addi => self.alu_immediate(alu::add, true)?,
            Opcode::Subi => self.alu_immediate(alu::sub, true)?,
            Opcode::Cpi => self.alu_immediate(alu::sub, false)?,

            Opcode::Or => self.alu_register(alu::or, true)?,
            Opcode::And => self.alu_register(alu::and, true)?,
            Opcode::Xor => self.alu_register(alu::xor, true)?,
            Opcode::Add => self.alu_register(alu::add, true)?,
            Opcode::Sub => self.alu_register(alu::sub, true)?,
            Opcode::Cp => self.alu_register(alu::sub, false)?,

            Opcode::Inc => self.alu_unary(alu::inc)?,
            Opcode::Dec => self.alu_unary(alu::dec)?,
            Opcode::Lsl => self.alu_unary(alu::lsl)?,
            Opcode::Lsr => self.alu_unary(alu::lsr)?,

            // ==================== Control Flow ====================

            Opcode::Jmp => self.pc = op1,

            Opcode::Breq => self.branch(self.sr.test(StatusFlag::Zero)),
            Opcode::Brne => self.branch(!self.sr.test(StatusFlag::Zero)),
            Opcode::Brge => self.branch(!self.sr.signed_less()),
            Opcode::Brlt => self.branch(self.sr.signed_less()),
            Opcode::Brgt => {
                let taken = !self.sr.test(StatusFlag::Zero) && !self.sr.signed_less();
                self.branch(taken);
            }
            Opcode::Brle => {
                let taken = self.sr.test(StatusFlag::Zero) || self.sr.signed_less();
                self.branch(taken);
            }

            Opcode::Call => {
                self.push(self.pc)?;
                self.pc = op1;
            }

            Opcode::Ret => self.pc = self.pop()?,

            Opcode::Reti => {
                self.pc = self.pop()?;
                self.sr.set(StatusFlag::Interrupt);
            }

            // ==================== Stack ====================

            Opcode::Push => {
                let value = self.regs.read(op1)?;
                self.push(value)?;
            }

            Opcode::Pop => {
                self.regs.read(op1)?;
                let value = self.pop()?;
                self.regs.write(op1, value)?;
            }

            // ==================== Interrupt flag ====================

            Opcode::Sei => self.sr.set(StatusFlag::Interrupt),
            Opcode::Cli => self.sr.clear(StatusFlag::Interrupt),
        }

        Ok(())
    }

    /// `Rd := Rd op K`, or just the flags when `write_back` is false.
    fn alu_immediate(&mut self, op: AluOp, write_back: bool) -> Result<(), CpuError> {
        let rd = self.regs.read(self.fields.operand1)?;
        self.alu_commit(op, rd, self.fields.operand2, write_back)
    }

    /// `Rd := Rd op Rr`, or just the flags when `write_back` is false.
    fn alu_register(&mut self, op: AluOp, write_back: bool) -> Result<(), CpuError> {
        let rd = self.regs.read(self.fields.operand1)?;
        let rr = self.regs.read(self.fields.operand2)?;
        self.alu_commit(op, rd, rr, write_back)
    }

    fn alu_commit(&mut self, op: AluOp, a: u8, b: u8, write_back: bool) -> Result<(), CpuError> {
        let result = op(&mut self.sr, a, b);
        if write_back {
            self.regs.write(self.fields.operand1, result)?;
        }
        Ok(())
    }

    fn alu_unary(&mut self, op: fn(&mut StatusRegister, u8) -> u8) -> Result<(), CpuError> {
        let rd = self.regs.read(self.fields.operand1)?;
        let result = op(&mut self.sr, rd);
        self.regs.write(self.fields.operand1, result)?;
        Ok(())
    }

    fn branch(&mut self, taken: bool) {
        if taken {
            self.pc = self.fields.operand1;
        }
    }

    fn push(&mut self, value: u8) -> Result<(), CpuError> {
        if self.sp < STACK_LIMIT {
            return Err(CpuError::StackOverflow { sp: self.sp });
        }
        self.data.write(self.sp, value)?;
        self.sp -= 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<u8, CpuError> {
        let addr = self.sp + 1;
        if addr >= DATA_MEMORY_SIZE {
            return Err(CpuError::StackUnderflow { sp: self.sp });
        }
        let value = self.data.read(addr)?;
        self.sp = addr;
        Ok(value)
    }

    // ==================== External interface ====================

    /// Write a data-memory cell from outside the core (e.g. pin input).
    pub fn write_data_memory(&mut self, addr: usize, value: u8) -> Result<(), CpuError> {
        self.data.write(addr, value)?;
        log::debug!("external write [{:#06x}] = {:#04x}", addr, value);
        Ok(())
    }

    pub fn read_data_memory(&self, addr: usize) -> Result<u8, CpuError> {
        Ok(self.data.read(addr)?)
    }

    pub fn read_register(&self, index: u8) -> Result<u8, CpuError> {
        Ok(self.regs.read(index)?)
    }

    /// Read-only view of the machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    // ==================== Introspection ====================

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn mar(&self) -> u8 {
        self.mar
    }

    pub fn ir(&self) -> u32 {
        self.ir
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn status(&self) -> StatusRegister {
        self.sr
    }

    pub fn fields(&self) -> InstructionWord {
        self.fields
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn data_memory(&self) -> &DataMemory {
        &self.data
    }

    pub fn program(&self) -> &ProgramMemory {
        &self.program
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Instructions executed since the last reset.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }
}

impl Default for ControlUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ControlUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlUnit")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("ir", &format_args!("{:#08x}", self.ir))
            .field("sr", &self.sr)
            .field("instructions", &self.instructions)
            .finish()
    }
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("program counter {pc:#04x} outside program memory ({len} words)")]
    ProgramCounterOutOfRange { pc: u8, len: usize },

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("stack overflow (SP={sp})")]
    StackOverflow { sp: usize },

    #[error("stack underflow (SP={sp})")]
    StackUnderflow { sp: usize },

    #[error("unknown opcode {opcode:#04x} at address {address:#04x}")]
    UnknownOpcode { opcode: u8, address: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::isa::{DDRB, PINB, PORTB};

    const R16: u8 = 16;
    const R17: u8 = 17;

    fn machine(program: &[u32]) -> ControlUnit {
        ControlUnit::with_program(program).unwrap()
    }

    #[test]
    fn test_reset_state() {
        let cu = ControlUnit::new();
        assert_eq!(cu.state(), CycleState::Fetch);
        assert_eq!(cu.pc(), 0);
        assert_eq!(cu.ir(), 0);
        assert_eq!(cu.sp(), DATA_MEMORY_SIZE - 1);
        assert_eq!(cu.program().len(), DEMO_PROGRAM.len());
    }

    #[test]
    fn test_phases() {
        let mut cu = machine(&[encode(Opcode::Ldi, R16, 0x42)]);

        assert_eq!(cu.step_state().unwrap(), Cycle::Fetched { address: 0, word: 0x011042 });
        assert_eq!(cu.state(), CycleState::Decode);
        assert_eq!(cu.pc(), 1);
        assert_eq!(cu.mar(), 0);

        assert_eq!(
            cu.step_state().unwrap(),
            Cycle::Decoded(InstructionWord::new(0x01, R16, 0x42))
        );
        assert_eq!(cu.state(), CycleState::Execute);
        assert_eq!(cu.read_register(R16).unwrap(), 0);

        assert_eq!(cu.step_state().unwrap(), Cycle::Executed(Opcode::Ldi));
        assert_eq!(cu.state(), CycleState::Fetch);
        assert_eq!(cu.read_register(R16).unwrap(), 0x42);
    }

    #[test]
    fn test_ldi_out_in_round_trip() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0x01),
            encode(Opcode::Out, DDRB, R16),
            encode(Opcode::In, R17, DDRB),
        ]);
        cu.run(3).unwrap();
        assert_eq!(cu.read_register(R17).unwrap(), 0x01);
        assert_eq!(cu.read_data_memory(DDRB as usize).unwrap(), 0x01);
    }

    #[test]
    fn test_jmp_is_absolute() {
        let mut program = vec![encode(Opcode::Jmp, 0x05, 0x00)];
        program.extend([encode(Opcode::Nop, 0, 0); 4]);
        program.push(encode(Opcode::Ldi, R16, 0x99));
        let mut cu = machine(&program);

        cu.step_instruction().unwrap();
        assert_eq!(cu.pc(), 0x05);

        assert_eq!(cu.step_state().unwrap(), Cycle::Fetched { address: 5, word: program[5] });
    }

    #[test]
    fn test_mov() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, 3, 0x7E),
            encode(Opcode::Mov, 30, 3),
        ]);
        cu.run(2).unwrap();
        assert_eq!(cu.read_register(30).unwrap(), 0x7E);
    }

    #[test]
    fn test_lds_sts_use_data_storage() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0x5A),
            encode(Opcode::Sts, 0x10, R16),
            encode(Opcode::Lds, R17, 0x10),
        ]);
        cu.run(3).unwrap();
        assert_eq!(cu.read_data_memory(DATA_BASE + 0x10).unwrap(), 0x5A);
        assert_eq!(cu.read_data_memory(0x10).unwrap(), 0);
        assert_eq!(cu.read_register(R17).unwrap(), 0x5A);
    }

    #[test]
    fn test_countdown_loop() {
        // R16 = 3; loop: DEC R16; BRNE loop
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 3),
            encode(Opcode::Dec, R16, 0),
            encode(Opcode::Brne, 0x01, 0),
            encode(Opcode::Ldi, R17, 0xEE),
        ]);
        cu.run(1 + 3 * 2 + 1).unwrap();
        assert_eq!(cu.read_register(R16).unwrap(), 0);
        assert_eq!(cu.read_register(R17).unwrap(), 0xEE);
        assert!(cu.status().test(StatusFlag::Zero));
    }

    #[test]
    fn test_signed_branches() {
        // CPI R16, 5 with R16 = 3 -> less than
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 3),
            encode(Opcode::Cpi, R16, 5),
            encode(Opcode::Brge, 0x05, 0),
            encode(Opcode::Brlt, 0x06, 0),
            encode(Opcode::Nop, 0, 0),
            encode(Opcode::Nop, 0, 0),
            encode(Opcode::Brle, 0x08, 0),
            encode(Opcode::Nop, 0, 0),
            encode(Opcode::Brgt, 0x00, 0),
        ]);
        cu.run(3).unwrap();
        assert_eq!(cu.pc(), 3, "BRGE must not be taken");
        cu.run(1).unwrap();
        assert_eq!(cu.pc(), 6, "BRLT must be taken");
        cu.run(1).unwrap();
        assert_eq!(cu.pc(), 8, "BRLE must be taken");
        cu.run(1).unwrap();
        assert_eq!(cu.pc(), 9, "BRGT must not be taken");
        assert_eq!(cu.read_register(R16).unwrap(), 3, "CPI must not write back");
    }

    #[test]
    fn test_call_ret() {
        let mut cu = machine(&[
            encode(Opcode::Call, 0x03, 0),
            encode(Opcode::Ldi, R17, 0x11),
            encode(Opcode::Jmp, 0x01, 0),
            encode(Opcode::Ldi, R16, 0x22),
            encode(Opcode::Ret, 0, 0),
        ]);

        cu.step_instruction().unwrap();
        assert_eq!(cu.pc(), 3);
        assert_eq!(cu.sp(), DATA_MEMORY_SIZE - 2);
        assert_eq!(cu.read_data_memory(DATA_MEMORY_SIZE - 1).unwrap(), 1);

        cu.run(2).unwrap();
        assert_eq!(cu.pc(), 1);
        assert_eq!(cu.sp(), DATA_MEMORY_SIZE - 1);

        cu.step_instruction().unwrap();
        assert_eq!(cu.read_register(R16).unwrap(), 0x22);
        assert_eq!(cu.read_register(R17).unwrap(), 0x11);
    }

    #[test]
    fn test_push_pop() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0xAB),
            encode(Opcode::Push, R16, 0),
            encode(Opcode::Clr, R16, 0),
            encode(Opcode::Pop, R17, 0),
        ]);
        cu.run(4).unwrap();
        assert_eq!(cu.read_register(R16).unwrap(), 0);
        assert_eq!(cu.read_register(R17).unwrap(), 0xAB);
        assert_eq!(cu.sp(), DATA_MEMORY_SIZE - 1);
    }

    #[test]
    fn test_stack_underflow_leaves_state() {
        let mut cu = machine(&[encode(Opcode::Ret, 0, 0)]);
        cu.step_state().unwrap();
        cu.step_state().unwrap();

        let err = cu.step_state().unwrap_err();
        assert_eq!(err, CpuError::StackUnderflow { sp: DATA_MEMORY_SIZE - 1 });
        assert_eq!(cu.state(), CycleState::Execute);
        assert_eq!(cu.pc(), 1);
    }

    fn flags(cu: &ControlUnit) -> (bool, bool, bool, bool) {
        let sr = cu.status();
        (
            sr.test(StatusFlag::Negative),
            sr.test(StatusFlag::Zero),
            sr.test(StatusFlag::Overflow),
            sr.test(StatusFlag::Carry),
        )
    }

    #[test]
    fn test_register_form_writes_destination_only() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0x30),
            encode(Opcode::Ldi, R17, 0x12),
            encode(Opcode::Add, R16, R17),
            encode(Opcode::Sub, R16, R17),
            encode(Opcode::Sub, R16, R17),
        ]);
        cu.run(3).unwrap();
        assert_eq!(cu.read_register(R16).unwrap(), 0x42);
        assert_eq!(cu.read_register(R17).unwrap(), 0x12);

        cu.run(2).unwrap();
        assert_eq!(cu.read_register(R16).unwrap(), 0x1E);
        assert_eq!(cu.read_register(R17).unwrap(), 0x12);
    }

    #[test]
    fn test_logic_ops() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0xF0),
            encode(Opcode::Ldi, R17, 0x3C),
            encode(Opcode::Mov, 18, R16),
            encode(Opcode::Mov, 19, R16),
            encode(Opcode::Mov, 20, R16),
            encode(Opcode::Or, 18, R17),
            encode(Opcode::And, 19, R17),
            encode(Opcode::Xor, 20, R17),
            encode(Opcode::Ori, 21, 0x0F),
            encode(Opcode::Ldi, 22, 0xF0),
            encode(Opcode::Andi, 22, 0x3C),
            encode(Opcode::Ldi, 23, 0xFF),
            encode(Opcode::Xori, 23, 0xFF),
        ]);
        cu.run(13).unwrap();
        assert_eq!(cu.read_register(18).unwrap(), 0xFC);
        assert_eq!(cu.read_register(19).unwrap(), 0x30);
        assert_eq!(cu.read_register(20).unwrap(), 0xCC);
        assert_eq!(cu.read_register(R17).unwrap(), 0x3C);
        assert_eq!(cu.read_register(21).unwrap(), 0x0F);
        assert_eq!(cu.read_register(22).unwrap(), 0x30);
        assert_eq!(cu.read_register(23).unwrap(), 0x00);
        assert_eq!(flags(&cu), (false, true, false, false));
    }

    #[test]
    fn test_cp_sets_flags_only() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 5),
            encode(Opcode::Ldi, R17, 5),
            encode(Opcode::Cp, R16, R17),
            encode(Opcode::Ldi, R17, 6),
            encode(Opcode::Cp, R16, R17),
        ]);
        cu.run(3).unwrap();
        assert_eq!(flags(&cu), (false, true, false, false));
        assert_eq!(cu.read_register(R16).unwrap(), 5);
        assert_eq!(cu.read_register(R17).unwrap(), 5);

        cu.run(2).unwrap();
        assert_eq!(flags(&cu), (true, false, false, true));
        assert_eq!(cu.read_register(R16).unwrap(), 5);
        assert_eq!(cu.read_register(R17).unwrap(), 6);
    }

    #[test]
    fn test_breq_taken_and_not_taken() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 1),
            encode(Opcode::Cpi, R16, 1),
            encode(Opcode::Breq, 0x05, 0),
            encode(Opcode::Nop, 0, 0),
            encode(Opcode::Nop, 0, 0),
            encode(Opcode::Cpi, R16, 2),
            encode(Opcode::Breq, 0x00, 0),
            encode(Opcode::Ldi, R17, 0xAA),
        ]);
        cu.run(3).unwrap();
        assert_eq!(cu.pc(), 5, "BREQ must be taken on equal");
        cu.run(2).unwrap();
        assert_eq!(cu.pc(), 7, "BREQ must fall through on not equal");
        cu.run(1).unwrap();
        assert_eq!(cu.read_register(R17).unwrap(), 0xAA);
    }

    #[test]
    fn test_immediate_carry_and_borrow() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0xFF),
            encode(Opcode::Addi, R16, 0x02),
            encode(Opcode::Ldi, R17, 0x01),
            encode(Opcode::Subi, R17, 0x02),
        ]);
        cu.run(2).unwrap();
        assert_eq!(cu.read_register(R16).unwrap(), 0x01);
        assert_eq!(flags(&cu), (false, false, false, true));

        cu.run(2).unwrap();
        assert_eq!(cu.read_register(R17).unwrap(), 0xFF);
        assert_eq!(flags(&cu), (true, false, false, true));
    }

    #[test]
    fn test_inc_and_shifts() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0x7F),
            encode(Opcode::Inc, R16, 0),
            encode(Opcode::Ldi, R17, 0x81),
            encode(Opcode::Lsl, R17, 0),
            encode(Opcode::Ldi, 18, 0x81),
            encode(Opcode::Lsr, 18, 0),
        ]);
        cu.run(2).unwrap();
        assert_eq!(cu.read_register(R16).unwrap(), 0x80);
        assert_eq!(flags(&cu), (true, false, true, false));

        cu.run(2).unwrap();
        assert_eq!(cu.read_register(R17).unwrap(), 0x02);
        assert_eq!(flags(&cu), (false, false, true, true));

        cu.run(2).unwrap();
        assert_eq!(cu.read_register(18).unwrap(), 0x40);
        assert_eq!(flags(&cu), (false, false, true, true));
    }

    #[test]
    fn test_stack_overflow() {
        let program = [
            encode(Opcode::Push, 0, 0),
            encode(Opcode::Jmp, 0x00, 0),
        ];
        let mut cu = machine(&program);
        let capacity = (DATA_MEMORY_SIZE - STACK_LIMIT) as u64;
        cu.run(capacity * 2).unwrap();
        let err = cu.run(2).unwrap_err();
        assert_eq!(err, CpuError::StackOverflow { sp: STACK_LIMIT - 1 });
    }

    #[test]
    fn test_sei_cli_reti() {
        let mut cu = machine(&[
            encode(Opcode::Sei, 0, 0),
            encode(Opcode::Cli, 0, 0),
            encode(Opcode::Call, 0x03, 0),
            encode(Opcode::Reti, 0, 0),
        ]);
        cu.run(1).unwrap();
        assert!(cu.status().test(StatusFlag::Interrupt));
        cu.run(1).unwrap();
        assert!(!cu.status().test(StatusFlag::Interrupt));
        cu.run(2).unwrap();
        assert!(cu.status().test(StatusFlag::Interrupt));
        assert_eq!(cu.pc(), 3);
    }

    #[test]
    fn test_register_out_of_range_is_reported() {
        let mut cu = machine(&[encode(Opcode::Ldi, 32, 1)]);
        let err = cu.step_instruction().unwrap_err();
        assert_eq!(err, CpuError::Register(RegisterError::OutOfRange(32)));
        assert_eq!(cu.state(), CycleState::Execute);
    }

    #[test]
    fn test_pop_into_bad_register_keeps_stack() {
        let mut cu = machine(&[
            encode(Opcode::Push, 0, 0),
            encode(Opcode::Pop, 40, 0),
        ]);
        cu.step_instruction().unwrap();
        let sp = cu.sp();
        assert!(cu.step_instruction().is_err());
        assert_eq!(cu.sp(), sp);
    }

    #[test]
    fn test_fetch_past_end() {
        let mut cu = machine(&[encode(Opcode::Nop, 0, 0)]);
        cu.step_instruction().unwrap();
        let err = cu.step_state().unwrap_err();
        assert_eq!(err, CpuError::ProgramCounterOutOfRange { pc: 1, len: 1 });
        assert_eq!(cu.state(), CycleState::Fetch);
    }

    #[test]
    fn test_unknown_opcode_resets() {
        let mut cu = machine(&[
            encode(Opcode::Ldi, R16, 0x01),
            encode(Opcode::Out, PORTB, R16),
            0x260000,
        ]);
        cu.run(2).unwrap();
        assert_eq!(cu.step_instruction().unwrap(), Cycle::Reset { opcode: 0x26, address: 2 });

        let mut fresh = machine(&[]);
        fresh.reset();
        assert_eq!(cu.snapshot(), fresh.snapshot());
    }

    #[test]
    fn test_unknown_opcode_fault_policy() {
        let config = Config { unknown_opcode: UnknownOpcodePolicy::Fault };
        let mut cu = machine(&[encode(Opcode::Ldi, R16, 7), 0xFF0000]).with_config(config);
        cu.step_instruction().unwrap();
        let err = cu.step_instruction().unwrap_err();
        assert_eq!(err, CpuError::UnknownOpcode { opcode: 0xFF, address: 1 });
        assert_eq!(cu.read_register(R16).unwrap(), 7);
    }

    #[test]
    fn test_external_pin_write() {
        let mut cu = ControlUnit::new();
        cu.write_data_memory(PINB as usize, 0x20).unwrap();
        assert_eq!(cu.snapshot().io.pinb, 0x20);
        assert!(cu.write_data_memory(DATA_MEMORY_SIZE, 1).is_err());
    }
}
