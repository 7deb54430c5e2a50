//! Simple assembler for the core's instruction set.
//!
//! Syntax:
//! ```text
//! ; Comment
//! start:              ; Define a label
//!     LDI R16, 0x01   ; Destination first
//!     OUT DDRB, R16   ; I/O registers by name
//!     IN  R17, PINB
//!     BRNE start      ; Jump targets by label
//!     .word 0x160500  ; Raw instruction word
//! ```

use crate::asm::syntax::{operands, Operand};
use crate::cpu::decode::encode;
use crate::cpu::memory::PROGRAM_MEMORY_CAPACITY;
use crate::isa::{io_register_address, register_index, Opcode};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a list of instruction words.
pub fn assemble(source: &str) -> Result<Vec<u32>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> address). An end-of-program label may sit
    /// one past the last addressable word.
    symbols: HashMap<String, usize>,
    /// Forward references: (output_index, label, source_line).
    pending: Vec<(usize, String, usize)>,
    /// Output words.
    output: Vec<u32>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u32>, AssemblerError> {
        // Pass 1: collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: patch label references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if line.is_empty() {
            return Ok(());
        }

        // Label definition, possibly followed by an instruction
        if let Some((label, rest)) = line.split_once(':') {
            let label = label.trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", label),
                });
            }
            if self.symbols.insert(label.clone(), self.output.len()).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            let rest = rest.trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, r)) => (m, r.trim()),
            None => (line, ""),
        };

        let args: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        if mnemonic.eq_ignore_ascii_case(".word") {
            let [value] = args.as_slice() else {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: ".word requires one value".into(),
                });
            };
            let word = parse_number(value).ok_or_else(|| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid number '{}'", value),
            })?;
            if word > 0xFF_FFFF {
                return Err(AssemblerError::ValueOutOfRange { line: line_num, value: word });
            }
            self.emit(word, line_num)?;
            return Ok(());
        }

        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
            AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic: mnemonic.to_uppercase(),
            }
        })?;

        let shape = operands(opcode);
        if args.len() != shape.len() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!(
                    "{} takes {} operand(s), found {}",
                    opcode,
                    shape.len(),
                    args.len()
                ),
            });
        }

        let mut fields = [0u8; 2];
        for (slot, (kind, arg)) in shape.iter().zip(&args).enumerate() {
            fields[slot] = self.parse_operand(*kind, arg, line_num)?;
        }

        self.emit(encode(opcode, fields[0], fields[1]), line_num)
    }

    fn parse_operand(&mut self, kind: Operand, arg: &str, line_num: usize) -> Result<u8, AssemblerError> {
        match kind {
            Operand::Reg => register_index(arg).ok_or_else(|| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("expected register R0-R31, found '{}'", arg),
            }),

            Operand::Io => match io_register_address(arg) {
                Some(addr) => Ok(addr),
                None => self.parse_byte(arg, line_num),
            },

            Operand::Imm | Operand::Data => self.parse_byte(arg, line_num),

            Operand::Target => {
                if parse_number(arg).is_some() {
                    return self.parse_byte(arg, line_num);
                }
                // Label reference - resolved in pass 2
                let out_idx = self.output.len();
                self.pending.push((out_idx, arg.to_uppercase(), line_num));
                Ok(0)
            }
        }
    }

    fn parse_byte(&self, arg: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let value = parse_number(arg).ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number '{}'", arg),
        })?;
        u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }

    fn emit(&mut self, word: u32, line_num: usize) -> Result<(), AssemblerError> {
        if self.output.len() >= PROGRAM_MEMORY_CAPACITY {
            return Err(AssemblerError::ProgramTooLarge { line: line_num });
        }
        self.output.push(word);
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num) in &self.pending {
            let addr = self.symbols.get(label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: *line_num,
                label: label.clone(),
            })?;
            let addr = u8::try_from(*addr).map_err(|_| AssemblerError::ValueOutOfRange {
                line: *line_num,
                value: *addr as u32,
            })?;

            // Targets always live in operand 1 (bits 15-8)
            if let Some(word) = self.output.get_mut(*out_idx) {
                *word = (*word & !0x00_FF00) | (addr as u32) << 8;
            }
        }
        Ok(())
    }
}

/// Parse a decimal, `0x` hex or `0b` binary literal.
fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2).ok()
    } else {
        text.parse().ok()
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: u32 },

    #[error("program exceeds 256 words at line {line}")]
    ProgramTooLarge { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::DEMO_PROGRAM;

    #[test]
    fn test_assemble_demo_program() {
        let source = r#"
            ; Port B demo
                    JMP main
                    NOP
                    NOP
                    NOP
                    NOP
            main:   LDI R16, 0x01
                    OUT DDRB, R16
                    MOV R17, R16
                    LDI R16, 0x20
                    OUT PORTB, R16
                    OUT PINB, R17
                    IN  R16, PINB
                    JMP main
        "#;

        assert_eq!(assemble(source).unwrap(), DEMO_PROGRAM.to_vec());
    }

    #[test]
    fn test_forward_and_backward_labels() {
        let source = "
        top:
            call sub
            jmp top
        sub: inc r1
            ret
        ";
        let words = assemble(source).unwrap();
        assert_eq!(words, vec![0x1D0200, 0x160000, 0x120100, 0x1E0000]);
    }

    #[test]
    fn test_number_formats() {
        let words = assemble("LDI R0, 0b101\nLDI R1, 255\n.word 0xAABBCC").unwrap();
        assert_eq!(words, vec![0x010005, 0x0101FF, 0xAABBCC]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            assemble("HLT"),
            Err(AssemblerError::UnknownMnemonic { line: 1, mnemonic: "HLT".into() })
        );
        assert_eq!(
            assemble("LDI R16, 256"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        );
        assert_eq!(
            assemble("\nJMP nowhere"),
            Err(AssemblerError::UndefinedLabel { line: 2, label: "NOWHERE".into() })
        );
        assert!(matches!(assemble("LDI R32, 1"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(assemble("MOV R1"), Err(AssemblerError::SyntaxError { .. })));
        assert!(matches!(assemble("a:\na:"), Err(AssemblerError::DuplicateLabel { line: 2, .. })));
    }

    #[test]
    fn test_program_too_large() {
        let source = "NOP\n".repeat(257);
        assert_eq!(assemble(&source), Err(AssemblerError::ProgramTooLarge { line: 257 }));
        assert_eq!(assemble(&"NOP\n".repeat(256)).unwrap().len(), 256);
    }

    #[test]
    fn test_label_after_full_program() {
        let source = "NOP\n".repeat(256) + "end:";
        assert_eq!(assemble(&source).unwrap().len(), 256);

        let source = "JMP end\n".to_string() + &"NOP\n".repeat(255) + "end:";
        assert_eq!(
            assemble(&source),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        );
    }
}
