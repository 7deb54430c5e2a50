//! 8-bit ALU operations.
//!
//! Each operation takes the status register it updates and returns the
//! result byte. Flag conventions:
//! - C: carry out of bit 7 (add), borrow (sub), or the bit shifted out
//! - V: two's-complement overflow
//! - N: bit 7 of the result
//! - Z: result is zero

use crate::cpu::registers::StatusRegister;
use crate::isa::StatusFlag;

/// Signature shared by the two-operand ALU operations.
pub type AluOp = fn(&mut StatusRegister, u8, u8) -> u8;

pub fn add(sr: &mut StatusRegister, a: u8, b: u8) -> u8 {
    let (result, carry) = a.overflowing_add(b);
    sr.update(StatusFlag::Carry, carry);
    sr.update(StatusFlag::Overflow, (a ^ result) & (b ^ result) & 0x80 != 0);
    sr.update_nz(result);
    result
}

pub fn sub(sr: &mut StatusRegister, a: u8, b: u8) -> u8 {
    let (result, borrow) = a.overflowing_sub(b);
    sr.update(StatusFlag::Carry, borrow);
    sr.update(StatusFlag::Overflow, (a ^ b) & (a ^ result) & 0x80 != 0);
    sr.update_nz(result);
    result
}

pub fn or(sr: &mut StatusRegister, a: u8, b: u8) -> u8 {
    logic(sr, a | b)
}

pub fn and(sr: &mut StatusRegister, a: u8, b: u8) -> u8 {
    logic(sr, a & b)
}

pub fn xor(sr: &mut StatusRegister, a: u8, b: u8) -> u8 {
    logic(sr, a ^ b)
}

fn logic(sr: &mut StatusRegister, result: u8) -> u8 {
    sr.clear(StatusFlag::Overflow);
    sr.update_nz(result);
    result
}

/// Increment; carry is left untouched.
pub fn inc(sr: &mut StatusRegister, a: u8) -> u8 {
    let result = a.wrapping_add(1);
    sr.update(StatusFlag::Overflow, a == 0x7F);
    sr.update_nz(result);
    result
}

/// Decrement; carry is left untouched.
pub fn dec(sr: &mut StatusRegister, a: u8) -> u8 {
    let result = a.wrapping_sub(1);
    sr.update(StatusFlag::Overflow, a == 0x80);
    sr.update_nz(result);
    result
}

pub fn clr(sr: &mut StatusRegister) -> u8 {
    logic(sr, 0)
}

/// Logical shift left.
pub fn lsl(sr: &mut StatusRegister, a: u8) -> u8 {
    shift(sr, a << 1, a & 0x80 != 0)
}

/// Logical shift right.
pub fn lsr(sr: &mut StatusRegister, a: u8) -> u8 {
    shift(sr, a >> 1, a & 0x01 != 0)
}

fn shift(sr: &mut StatusRegister, result: u8, carry: bool) -> u8 {
    sr.update(StatusFlag::Carry, carry);
    sr.update_nz(result);
    let negative = sr.test(StatusFlag::Negative);
    sr.update(StatusFlag::Overflow, negative != carry);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(sr: StatusRegister) -> (bool, bool, bool, bool) {
        (
            sr.test(StatusFlag::Negative),
            sr.test(StatusFlag::Zero),
            sr.test(StatusFlag::Overflow),
            sr.test(StatusFlag::Carry),
        )
    }

    #[test]
    fn test_add_carry_and_overflow() {
        let mut sr = StatusRegister::new();
        assert_eq!(add(&mut sr, 0xFF, 0x01), 0x00);
        assert_eq!(flags(sr), (false, true, false, true));

        assert_eq!(add(&mut sr, 0x7F, 0x01), 0x80);
        assert_eq!(flags(sr), (true, false, true, false));
    }

    #[test]
    fn test_sub_borrow() {
        let mut sr = StatusRegister::new();
        assert_eq!(sub(&mut sr, 0x01, 0x02), 0xFF);
        assert_eq!(flags(sr), (true, false, false, true));

        assert_eq!(sub(&mut sr, 0x80, 0x01), 0x7F);
        assert_eq!(flags(sr), (false, false, true, false));

        assert_eq!(sub(&mut sr, 5, 5), 0);
        assert!(sr.test(StatusFlag::Zero));
    }

    #[test]
    fn test_logic_keeps_carry() {
        let mut sr = StatusRegister::new();
        sr.set(StatusFlag::Carry);
        sr.set(StatusFlag::Overflow);
        assert_eq!(and(&mut sr, 0xF0, 0x0F), 0);
        assert_eq!(flags(sr), (false, true, false, true));
        assert_eq!(or(&mut sr, 0xF0, 0x0F), 0xFF);
        assert_eq!(xor(&mut sr, 0xFF, 0x0F), 0xF0);
    }

    #[test]
    fn test_inc_dec() {
        let mut sr = StatusRegister::new();
        sr.set(StatusFlag::Carry);
        assert_eq!(inc(&mut sr, 0x7F), 0x80);
        assert_eq!(flags(sr), (true, false, true, true));
        assert_eq!(dec(&mut sr, 0x01), 0x00);
        assert_eq!(flags(sr), (false, true, false, true));
    }

    #[test]
    fn test_shifts() {
        let mut sr = StatusRegister::new();
        assert_eq!(lsl(&mut sr, 0x81), 0x02);
        assert_eq!(flags(sr), (false, false, true, true));
        assert_eq!(lsr(&mut sr, 0x01), 0x00);
        assert_eq!(flags(sr), (false, true, true, true));
    }

    #[test]
    fn test_clr() {
        let mut sr = StatusRegister::from_bits(0b01010);
        assert_eq!(clr(&mut sr), 0);
        assert_eq!(flags(sr), (false, true, false, false));
    }
}
