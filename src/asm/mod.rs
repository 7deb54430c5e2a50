//! Program loading: assembler, disassembler and hex listings.
//!
//! This module provides:
//! - A two-pass assembler (text → instruction words)
//! - A disassembler (instruction words → text)
//! - A line-based hex listing format for saving and loading programs

mod syntax;
pub mod assembler;
pub mod disasm;
pub mod listing;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_instruction};
pub use listing::{load_listing, save_listing, parse_listing, format_listing, ListingError};

use std::path::Path;
use thiserror::Error;

/// Load a program from disk: `.asm` files are assembled, anything else is
/// read as a hex listing.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<u32>, LoadError> {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("asm")) {
        let source = std::fs::read_to_string(path).map_err(ListingError::from)?;
        Ok(assemble(&source)?)
    } else {
        Ok(load_listing(path)?)
    }
}

/// Errors from [`load_program`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error(transparent)]
    Listing(#[from] ListingError),
}
