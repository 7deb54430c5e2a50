//! Operand shapes shared by the assembler and disassembler.

use crate::isa::Opcode;

/// What kind of value an operand field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Register index (R0-R31).
    Reg,
    /// 8-bit immediate.
    Imm,
    /// I/O window address (may be written by name, e.g. `PINB`).
    Io,
    /// Offset into data storage (LDS/STS).
    Data,
    /// Program address (may be written as a label).
    Target,
}

/// Assembly-order operand list: `operand1` first, then `operand2`.
pub fn operands(opcode: Opcode) -> &'static [Operand] {
    use Operand::*;

    match opcode {
        Opcode::Nop | Opcode::Ret | Opcode::Reti | Opcode::Sei | Opcode::Cli => &[],

        Opcode::Clr | Opcode::Inc | Opcode::Dec | Opcode::Lsl | Opcode::Lsr
        | Opcode::Push | Opcode::Pop => &[Reg],

        Opcode::Ldi | Opcode::Ori | Opcode::Andi | Opcode::Xori | Opcode::Addi
        | Opcode::Subi | Opcode::Cpi => &[Reg, Imm],

        Opcode::Mov | Opcode::Or | Opcode::And | Opcode::Xor | Opcode::Add
        | Opcode::Sub | Opcode::Cp => &[Reg, Reg],

        Opcode::In => &[Reg, Io],
        Opcode::Out => &[Io, Reg],
        Opcode::Lds => &[Reg, Data],
        Opcode::Sts => &[Data, Reg],

        Opcode::Jmp | Opcode::Breq | Opcode::Brne | Opcode::Brge | Opcode::Brgt
        | Opcode::Brle | Opcode::Brlt | Opcode::Call => &[Target],
    }
}
