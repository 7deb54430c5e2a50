//! Binary formatting for diagnostic display.

/// Render `value` as binary digits, zero-padded to at least `min_width`.
///
/// Values that need more digits than `min_width` are printed at their
/// natural width. At least one digit is always produced.
pub fn format_binary(value: u32, min_width: usize) -> String {
    let digits = format!("{:b}", value);
    "0".repeat(min_width.saturating_sub(digits.len())) + &digits
}
