//! Disassembler.
//!
//! Converts instruction words back to assembly text that [`assemble`]
//! accepts.
//!
//! [`assemble`]: crate::asm::assemble

use crate::asm::syntax::{operands, Operand};
use crate::cpu::decode::decode;
use crate::isa::{io_register_name, register_name, REGISTER_COUNT};

/// Disassemble a single instruction word.
///
/// Words the assembler could not reproduce (undeclared opcodes, register
/// fields past R31, non-zero unused fields) come out as `.word`.
pub fn disassemble_instruction(word: u32) -> String {
    let raw = || format!(".word {:#08x}", word & 0xFF_FFFF);

    let fields = decode(word);
    let Some(opcode) = fields.opcode() else {
        return raw();
    };

    let shape = operands(opcode);
    let values = [fields.operand1, fields.operand2];
    if values[shape.len()..].iter().any(|&v| v != 0) {
        return raw();
    }

    let Some(args) = shape
        .iter()
        .zip(values)
        .map(|(kind, value)| format_operand(*kind, value))
        .collect::<Option<Vec<String>>>()
    else {
        return raw();
    };

    if args.is_empty() {
        opcode.mnemonic().to_string()
    } else {
        format!("{} {}", opcode, args.join(", "))
    }
}

/// Disassemble a program to a listing with addresses.
pub fn disassemble(words: &[u32]) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    for (addr, word) in words.iter().enumerate() {
        let line = disassemble_instruction(*word);
        output.push_str(&format!("{:02X}: {:<20} ; {:06X}\n", addr, line, word & 0xFF_FFFF));
    }

    output
}

fn format_operand(kind: Operand, value: u8) -> Option<String> {
    let text = match kind {
        Operand::Reg if (value as usize) < REGISTER_COUNT => register_name(value),
        Operand::Reg => return None,
        Operand::Io => match io_register_name(value) {
            Some(name) => name.to_string(),
            None => format!("{:#04x}", value),
        },
        Operand::Imm | Operand::Data | Operand::Target => format!("{:#04x}", value),
    };
    Some(text)
}
