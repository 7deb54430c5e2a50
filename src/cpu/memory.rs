//! Program and data memory.
//!
//! Program memory holds up to 256 packed instruction words, addressed by the
//! 8-bit program counter. Data memory is a flat 2000-byte space shared by the
//! memory-mapped I/O registers (low addresses), general data storage and the
//! stack (top of memory).
//!
//! All access is bounds-checked and reports a [`MemoryError`].

use serde::Serialize;
use thiserror::Error;

/// Size of data memory in bytes.
pub const DATA_MEMORY_SIZE: usize = 2000;

/// Maximum number of words in program memory (the PC is 8 bits wide).
pub const PROGRAM_MEMORY_CAPACITY: usize = 256;

/// Base of general data storage, addressed by LDS/STS.
pub const DATA_BASE: usize = 0x100;

/// Lowest address the stack may grow down to.
pub const STACK_LIMIT: usize = 0x200;

/// Program memory: read-only after load.
#[derive(Clone, Default, Serialize)]
pub struct ProgramMemory {
    words: Vec<u32>,
}

impl ProgramMemory {
    /// Load a program. Fails if it does not fit the 8-bit address space.
    pub fn new(words: &[u32]) -> Result<Self, MemoryError> {
        if words.len() > PROGRAM_MEMORY_CAPACITY {
            return Err(MemoryError::ProgramTooLarge {
                size: words.len(),
                capacity: PROGRAM_MEMORY_CAPACITY,
            });
        }
        Ok(Self { words: words.to_vec() })
    }

    /// Read the word at `addr`.
    pub fn read(&self, addr: u8) -> Result<u32, MemoryError> {
        self.words
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange {
                addr: addr as usize,
                size: self.words.len(),
            })
    }

    /// Number of populated words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl std::fmt::Debug for ProgramMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramMemory")
            .field("words", &self.words.len())
            .field("capacity", &PROGRAM_MEMORY_CAPACITY)
            .finish()
    }
}

/// Data memory: 2000 bytes of I/O registers, data storage and stack.
#[derive(Clone, Serialize)]
pub struct DataMemory {
    cells: Vec<u8>,
}

impl DataMemory {
    /// Create a new data memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; DATA_MEMORY_SIZE],
        }
    }

    /// Read a byte.
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange { addr, size: DATA_MEMORY_SIZE })
    }

    /// Write a byte.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or(MemoryError::AddressOutOfRange { addr, size: DATA_MEMORY_SIZE })?;
        *cell = value;
        Ok(())
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Dump a range of cells (for debugging), clipped to memory size.
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        self.cells
            .iter()
            .copied()
            .enumerate()
            .skip(start)
            .take(count)
            .collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for DataMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DataMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("DataMemory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &DATA_MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address {addr} out of range (0-{})", .size.saturating_sub(1))]
    AddressOutOfRange { addr: usize, size: usize },

    #[error("program size {size} exceeds program memory capacity {capacity}")]
    ProgramTooLarge { size: usize, capacity: usize },
}
