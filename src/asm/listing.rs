//! Hex listing format for programs.
//!
//! A listing is plain text:
//! - One 24-bit instruction word per line, in hex (`0x` prefix optional)
//! - Anything after `;` is a comment
//! - Blank lines are ignored

use crate::asm::disasm::disassemble_instruction;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Parse listing text into instruction words.
pub fn parse_listing(text: &str) -> Result<Vec<u32>, ListingError> {
    let mut words = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let content = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if content.is_empty() {
            continue;
        }

        let digits = content
            .strip_prefix("0x")
            .or_else(|| content.strip_prefix("0X"))
            .unwrap_or(content);

        let word = u32::from_str_radix(digits, 16)
            .ok()
            .filter(|w| *w <= 0xFF_FFFF)
            .ok_or_else(|| ListingError::ParseError {
                line: line_num + 1,
                message: format!("expected a 24-bit hex word, found '{}'", content),
            })?;

        words.push(word);
    }

    Ok(words)
}

/// Load a listing file from disk.
pub fn load_listing<P: AsRef<Path>>(path: P) -> Result<Vec<u32>, ListingError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_listing(&text)
}

/// Render words as listing text, annotated with their disassembly.
pub fn format_listing(words: &[u32]) -> String {
    let mut text = String::new();
    text.push_str(&format!("; {} instructions\n\n", words.len()));
    for (addr, word) in words.iter().enumerate() {
        text.push_str(&format!(
            "0x{:06X} ; {:02X}: {}\n",
            word & 0xFF_FFFF,
            addr,
            disassemble_instruction(*word)
        ));
    }
    text
}

/// Save words as a listing file.
pub fn save_listing<P: AsRef<Path>>(path: P, words: &[u32]) -> Result<(), ListingError> {
    let mut file = std::fs::File::create(path.as_ref())?;
    file.write_all(format_listing(words).as_bytes())?;
    Ok(())
}

/// Errors that can occur while reading or writing listings.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}
