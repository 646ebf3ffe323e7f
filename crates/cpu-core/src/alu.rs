//! Flag-producing arithmetic and the barrel shifter.
//!
//! Every helper here is pure: it takes operand words (plus incoming carry
//! where the operation consumes one) and returns the result together with
//! the carry and overflow it produced. Callers decide whether those flags
//! actually land in the status register.

/// Result of a flag-producing arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    /// The 32-bit result word.
    pub value: u32,
    /// Carry out (for subtraction, the "no borrow" sense).
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

/// `a + b`. Carry is unsigned overflow; signed overflow is
/// `!(a ^ b) & (result ^ b)` bit 31.
#[must_use]
pub const fn add(a: u32, b: u32) -> AluResult {
    let (value, carry) = a.overflowing_add(b);
    AluResult {
        value,
        carry,
        overflow: (!(a ^ b) & (value ^ b)) >> 31 != 0,
    }
}

/// `a + b + carry_in`. Carry is set when the full 64-bit sum exceeds
/// `u32::MAX`.
#[must_use]
pub const fn adc(a: u32, b: u32, carry_in: bool) -> AluResult {
    let wide = a as u64 + b as u64 + carry_in as u64;
    let value = wide as u32;
    AluResult {
        value,
        carry: wide > u32::MAX as u64,
        overflow: (!(a ^ b) & (value ^ b)) >> 31 != 0,
    }
}

/// `a - b`. Carry means "no borrow": `a >= b`. Signed overflow is
/// `(a ^ b) & (result ^ a)` bit 31.
#[must_use]
pub const fn sub(a: u32, b: u32) -> AluResult {
    let value = a.wrapping_sub(b);
    AluResult {
        value,
        carry: a >= b,
        overflow: ((a ^ b) & (value ^ a)) >> 31 != 0,
    }
}

/// `a - b - !carry_in`. Carry means "no borrow":
/// `a >= b + borrow` in 64-bit arithmetic.
#[must_use]
pub const fn sbc(a: u32, b: u32, carry_in: bool) -> AluResult {
    let borrow = !carry_in as u32;
    let value = a.wrapping_sub(b).wrapping_sub(borrow);
    AluResult {
        value,
        carry: a as u64 >= b as u64 + borrow as u64,
        overflow: ((a ^ b) & (value ^ a)) >> 31 != 0,
    }
}

/// The four barrel-shifter operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    /// Maps a 2-bit shift-type field.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }

    /// Lowercase assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Lsl => "lsl",
            Self::Lsr => "lsr",
            Self::Asr => "asr",
            Self::Ror => "ror",
        }
    }
}

/// Shifts `value` by an immediate amount in 0..=31, applying the encoded
/// zero-amount special cases, and returns the result with the shifter's
/// carry-out.
///
/// `lsl #0` passes the value and incoming carry through unchanged;
/// `lsr #0` and `asr #0` encode a shift by 32; `ror #0` is a rotate through
/// carry by one (`rrx`).
#[must_use]
pub const fn shift_by_immediate(
    kind: ShiftKind,
    value: u32,
    amount: u8,
    carry_in: bool,
) -> (u32, bool) {
    match (kind, amount) {
        (ShiftKind::Lsl, 0) => (value, carry_in),
        (ShiftKind::Lsl, n) => (value << n, value >> (32 - n) & 1 != 0),
        (ShiftKind::Lsr, 0) => (0, value >> 31 != 0),
        (ShiftKind::Lsr, n) => (value >> n, value >> (n - 1) & 1 != 0),
        (ShiftKind::Asr, 0) => {
            let fill = if value >> 31 != 0 { u32::MAX } else { 0 };
            (fill, value >> 31 != 0)
        }
        (ShiftKind::Asr, n) => (
            (value as i32 >> n) as u32,
            value >> (n - 1) & 1 != 0,
        ),
        (ShiftKind::Ror, 0) => {
            ((carry_in as u32) << 31 | value >> 1, value & 1 != 0)
        }
        (ShiftKind::Ror, n) => (value.rotate_right(n as u32), value >> (n - 1) & 1 != 0),
    }
}

/// Shifts `value` by a register-sourced amount.
///
/// Only the low byte of the amount participates. Zero passes the value and
/// incoming carry through; 32 and beyond follow each operation's saturation
/// behavior, and a rotate by a multiple of 32 leaves the value intact with
/// bit 31 as carry.
#[must_use]
pub const fn shift_by_register(
    kind: ShiftKind,
    value: u32,
    amount: u32,
    carry_in: bool,
) -> (u32, bool) {
    let n = amount & 0xFF;
    if n == 0 {
        return (value, carry_in);
    }
    match kind {
        ShiftKind::Lsl => match n {
            1..=31 => (value << n, value >> (32 - n) & 1 != 0),
            32 => (0, value & 1 != 0),
            _ => (0, false),
        },
        ShiftKind::Lsr => match n {
            1..=31 => (value >> n, value >> (n - 1) & 1 != 0),
            32 => (0, value >> 31 != 0),
            _ => (0, false),
        },
        ShiftKind::Asr => {
            if n < 32 {
                ((value as i32 >> n) as u32, value >> (n - 1) & 1 != 0)
            } else {
                let fill = if value >> 31 != 0 { u32::MAX } else { 0 };
                (fill, value >> 31 != 0)
            }
        }
        ShiftKind::Ror => {
            let r = n & 31;
            if r == 0 {
                (value, value >> 31 != 0)
            } else {
                (value.rotate_right(r), value >> (r - 1) & 1 != 0)
            }
        }
    }
}

/// Expands a wide-encoding 8-bit immediate rotated right by `2 * rotate`.
///
/// A zero rotation keeps the incoming carry; otherwise the carry-out is
/// bit 31 of the rotated value.
#[must_use]
pub const fn rotated_immediate(imm: u8, rotate: u8, carry_in: bool) -> (u32, bool) {
    let value = (imm as u32).rotate_right(rotate as u32 * 2);
    if rotate == 0 {
        (value, carry_in)
    } else {
        (value, value >> 31 != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        adc, add, rotated_immediate, sbc, shift_by_immediate, shift_by_register, sub, ShiftKind,
    };
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn add_overflow_at_the_signed_boundary() {
        let r = add(0x7FFF_FFFF, 1);
        assert_eq!(r.value, 0x8000_0000);
        assert!(!r.carry);
        assert!(r.overflow);

        let r = add(0x8000_0000, 0x8000_0000);
        assert_eq!(r.value, 0);
        assert!(r.carry);
        assert!(r.overflow);
    }

    #[test]
    fn sub_carry_means_no_borrow() {
        assert!(sub(5, 5).carry);
        assert!(sub(6, 5).carry);
        assert!(!sub(4, 5).carry);

        let r = sub(0x8000_0000, 1);
        assert_eq!(r.value, 0x7FFF_FFFF);
        assert!(r.overflow);
    }

    #[test]
    fn sbc_borrow_counts_against_the_carry_out() {
        // 5 - 5 - 1 borrows even though the operands are equal.
        let r = sbc(5, 5, false);
        assert_eq!(r.value, u32::MAX);
        assert!(!r.carry);

        let r = sbc(5, 5, true);
        assert_eq!(r.value, 0);
        assert!(r.carry);
    }

    proptest! {
        #[test]
        fn adc_matches_the_wide_sum(a: u32, b: u32, c: bool) {
            let wide = u64::from(a) + u64::from(b) + u64::from(c);
            let r = adc(a, b, c);
            prop_assert_eq!(u64::from(r.value), wide & 0xFFFF_FFFF);
            prop_assert_eq!(r.carry, wide > u64::from(u32::MAX));
        }

        #[test]
        fn sbc_matches_the_wide_difference(a: u32, b: u32, c: bool) {
            let r = sbc(a, b, c);
            let borrow = u64::from(!c);
            prop_assert_eq!(
                r.value,
                a.wrapping_sub(b).wrapping_sub(!c as u32)
            );
            prop_assert_eq!(r.carry, u64::from(a) >= u64::from(b) + borrow);
        }

        #[test]
        fn signed_overflow_matches_checked_arithmetic(a: i32, b: i32) {
            prop_assert_eq!(
                add(a as u32, b as u32).overflow,
                a.checked_add(b).is_none()
            );
            prop_assert_eq!(
                sub(a as u32, b as u32).overflow,
                a.checked_sub(b).is_none()
            );
        }
    }

    #[rstest]
    #[case(ShiftKind::Lsl, 0xF000_000F, 4, (0x0000_00F0, true))]
    #[case(ShiftKind::Lsr, 0xF000_000F, 4, (0x0F00_0000, true))]
    #[case(ShiftKind::Asr, 0xF000_000F, 4, (0xFF00_0000, true))]
    #[case(ShiftKind::Ror, 0xF000_000F, 4, (0xFF00_0000, true))]
    fn immediate_shifts_produce_the_last_bit_shifted_out(
        #[case] kind: ShiftKind,
        #[case] value: u32,
        #[case] amount: u8,
        #[case] expected: (u32, bool),
    ) {
        assert_eq!(shift_by_immediate(kind, value, amount, false), expected);
    }

    #[test]
    fn immediate_zero_amount_special_cases() {
        // lsl #0 is a pure pass-through.
        assert_eq!(
            shift_by_immediate(ShiftKind::Lsl, 0xDEAD, 0, true),
            (0xDEAD, true)
        );
        // lsr #0 and asr #0 encode a shift by 32.
        assert_eq!(
            shift_by_immediate(ShiftKind::Lsr, 0x8000_0001, 0, false),
            (0, true)
        );
        assert_eq!(
            shift_by_immediate(ShiftKind::Asr, 0x8000_0001, 0, false),
            (u32::MAX, true)
        );
        assert_eq!(
            shift_by_immediate(ShiftKind::Asr, 0x7000_0001, 0, true),
            (0, false)
        );
        // ror #0 is rrx: rotate through carry by one.
        assert_eq!(
            shift_by_immediate(ShiftKind::Ror, 0x0000_0003, 0, true),
            (0x8000_0001, true)
        );
        assert_eq!(
            shift_by_immediate(ShiftKind::Ror, 0x0000_0002, 0, false),
            (0x0000_0001, false)
        );
    }

    #[test]
    fn register_shift_saturation_at_32_and_beyond() {
        let v = 0x8000_0001;
        assert_eq!(shift_by_register(ShiftKind::Lsl, v, 32, false), (0, true));
        assert_eq!(shift_by_register(ShiftKind::Lsl, v, 33, true), (0, false));
        assert_eq!(shift_by_register(ShiftKind::Lsr, v, 32, false), (0, true));
        assert_eq!(shift_by_register(ShiftKind::Lsr, v, 100, true), (0, false));
        assert_eq!(
            shift_by_register(ShiftKind::Asr, v, 32, false),
            (u32::MAX, true)
        );
        assert_eq!(
            shift_by_register(ShiftKind::Asr, 0x7000_0000, 99, true),
            (0, false)
        );
    }

    #[test]
    fn register_shift_amount_zero_keeps_the_carry() {
        assert_eq!(
            shift_by_register(ShiftKind::Lsr, 0xFFFF, 0, true),
            (0xFFFF, true)
        );
        // Only the low byte of the amount participates: 256 acts like zero.
        assert_eq!(
            shift_by_register(ShiftKind::Ror, 0xFFFF, 256, false),
            (0xFFFF, false)
        );
    }

    #[test]
    fn register_rotate_by_multiples_of_32() {
        assert_eq!(
            shift_by_register(ShiftKind::Ror, 0x8000_0000, 32, false),
            (0x8000_0000, true)
        );
        assert_eq!(
            shift_by_register(ShiftKind::Ror, 0x0000_0001, 64, true),
            (0x0000_0001, false)
        );
        assert_eq!(
            shift_by_register(ShiftKind::Ror, 0x0000_00F0, 36, false),
            (0x0000_000F, false)
        );
    }

    #[test]
    fn rotated_immediate_carry_rules() {
        assert_eq!(rotated_immediate(0xFF, 0, true), (0xFF, true));
        assert_eq!(rotated_immediate(0xFF, 0, false), (0xFF, false));
        assert_eq!(rotated_immediate(0x02, 1, false), (0x8000_0000, true));
        assert_eq!(rotated_immediate(0xFF, 4, false), (0xFF00_0000, true));
        assert_eq!(rotated_immediate(0x01, 8, true), (0x0001_0000, false));
    }
}
