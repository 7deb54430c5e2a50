//! Register file and status register.
//!
//! The core has 32 uniform 8-bit general-purpose registers (R0-R31) and a
//! 5-bit status register holding the `INZVC` flags.

use crate::isa::{StatusFlag, REGISTER_COUNT, format_binary};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The general-purpose register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    regs: [u8; REGISTER_COUNT],
}

impl RegisterFile {
    /// Create a register file with every register zeroed.
    pub fn new() -> Self {
        Self { regs: [0; REGISTER_COUNT] }
    }

    /// Read a register.
    #[inline]
    pub fn read(&self, index: u8) -> Result<u8, RegisterError> {
        self.regs
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::OutOfRange(index))
    }

    /// Write a register.
    #[inline]
    pub fn write(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let reg = self
            .regs
            .get_mut(index as usize)
            .ok_or(RegisterError::OutOfRange(index))?;
        *reg = value;
        Ok(())
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.regs = [0; REGISTER_COUNT];
    }

    pub fn as_array(&self) -> &[u8; REGISTER_COUNT] {
        &self.regs
    }
}

/// Register index outside R0-R31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("register index {0} out of range (R0-R31)")]
    OutOfRange(u8),
}

/// The status register (`INZVC`, bit 4 down to bit 0).
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRegister(u8);

impl StatusRegister {
    /// Mask of the implemented bits.
    pub const MASK: u8 = 0b1_1111;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn set(&mut self, flag: StatusFlag) {
        self.0 |= flag.mask();
    }

    pub fn clear(&mut self, flag: StatusFlag) {
        self.0 &= !flag.mask();
    }

    pub fn test(self, flag: StatusFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Set or clear a flag from a boolean.
    pub fn update(&mut self, flag: StatusFlag, value: bool) {
        if value {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Update N and Z from an 8-bit result.
    pub fn update_nz(&mut self, result: u8) {
        self.update(StatusFlag::Negative, result & 0x80 != 0);
        self.update(StatusFlag::Zero, result == 0);
    }

    /// Signed comparison outcome `N xor V` (true means "less than").
    pub fn signed_less(self) -> bool {
        self.test(StatusFlag::Negative) != self.test(StatusFlag::Overflow)
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

impl std::fmt::Debug for StatusRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SR=")?;
        for flag in StatusFlag::ALL {
            let c = if self.test(flag) { flag.letter() } else { '-' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_binary(self.0 as u32, 5))
    }
}
