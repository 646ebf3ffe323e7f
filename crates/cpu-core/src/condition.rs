use crate::state::Psr;

/// The 16 condition codes shared by both encodings.
///
/// Every wide instruction carries one in its top nibble; compact conditional
/// branches carry one in bits 11:8. [`Condition::Never`] is the wide
/// encoding's escape hatch for unconditional extension space and predicates
/// to false when evaluated as an ordinary condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Condition {
    /// `eq` - Z set.
    Equal,
    /// `ne` - Z clear.
    NotEqual,
    /// `cs` - C set.
    CarrySet,
    /// `cc` - C clear.
    CarryClear,
    /// `mi` - N set.
    Negative,
    /// `pl` - N clear.
    PositiveOrZero,
    /// `vs` - V set.
    OverflowSet,
    /// `vc` - V clear.
    OverflowClear,
    /// `hi` - C set and Z clear.
    UnsignedHigher,
    /// `ls` - C clear or Z set.
    UnsignedLowerOrSame,
    /// `ge` - N equals V.
    GreaterOrEqual,
    /// `lt` - N differs from V.
    LessThan,
    /// `gt` - Z clear and N equals V.
    GreaterThan,
    /// `le` - Z set or N differs from V.
    LessOrEqual,
    /// `al` - always.
    Always,
    /// `nv` - never.
    Never,
}

impl Condition {
    /// Maps a 4-bit field to its condition. Only the low nibble is read.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0xF {
            0x0 => Self::Equal,
            0x1 => Self::NotEqual,
            0x2 => Self::CarrySet,
            0x3 => Self::CarryClear,
            0x4 => Self::Negative,
            0x5 => Self::PositiveOrZero,
            0x6 => Self::OverflowSet,
            0x7 => Self::OverflowClear,
            0x8 => Self::UnsignedHigher,
            0x9 => Self::UnsignedLowerOrSame,
            0xA => Self::GreaterOrEqual,
            0xB => Self::LessThan,
            0xC => Self::GreaterThan,
            0xD => Self::LessOrEqual,
            0xE => Self::Always,
            _ => Self::Never,
        }
    }

    /// Evaluates the condition against the given status flags.
    #[must_use]
    pub const fn passes(self, psr: Psr) -> bool {
        match self {
            Self::Equal => psr.zero(),
            Self::NotEqual => !psr.zero(),
            Self::CarrySet => psr.carry(),
            Self::CarryClear => !psr.carry(),
            Self::Negative => psr.negative(),
            Self::PositiveOrZero => !psr.negative(),
            Self::OverflowSet => psr.overflow(),
            Self::OverflowClear => !psr.overflow(),
            Self::UnsignedHigher => psr.carry() && !psr.zero(),
            Self::UnsignedLowerOrSame => !psr.carry() || psr.zero(),
            Self::GreaterOrEqual => psr.negative() == psr.overflow(),
            Self::LessThan => psr.negative() != psr.overflow(),
            Self::GreaterThan => !psr.zero() && psr.negative() == psr.overflow(),
            Self::LessOrEqual => psr.zero() || psr.negative() != psr.overflow(),
            Self::Always => true,
            Self::Never => false,
        }
    }

    /// Mnemonic suffix, empty for `al`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::CarrySet => "cs",
            Self::CarryClear => "cc",
            Self::Negative => "mi",
            Self::PositiveOrZero => "pl",
            Self::OverflowSet => "vs",
            Self::OverflowClear => "vc",
            Self::UnsignedHigher => "hi",
            Self::UnsignedLowerOrSame => "ls",
            Self::GreaterOrEqual => "ge",
            Self::LessThan => "lt",
            Self::GreaterThan => "gt",
            Self::LessOrEqual => "le",
            Self::Always => "",
            Self::Never => "nv",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Condition;
    use crate::state::{Mode, Psr};

    /// Builds a status word with the four result flags set per the low bits
    /// of `nzcv` (bit 3 = N ... bit 0 = V).
    fn psr_with(nzcv: u32) -> Psr {
        let mut psr = Psr::reset(Mode::User);
        psr.set_negative(nzcv & 0b1000 != 0);
        psr.set_zero(nzcv & 0b0100 != 0);
        psr.set_carry(nzcv & 0b0010 != 0);
        psr.set_overflow(nzcv & 0b0001 != 0);
        psr
    }

    #[test]
    fn every_condition_matches_its_flag_definition() {
        for nzcv in 0..16_u32 {
            let psr = psr_with(nzcv);
            let (n, z, c, v) = (
                nzcv & 0b1000 != 0,
                nzcv & 0b0100 != 0,
                nzcv & 0b0010 != 0,
                nzcv & 0b0001 != 0,
            );
            let expected = [
                z,
                !z,
                c,
                !c,
                n,
                !n,
                v,
                !v,
                c && !z,
                !c || z,
                n == v,
                n != v,
                !z && n == v,
                z || n != v,
                true,
                false,
            ];
            for (bits, want) in expected.into_iter().enumerate() {
                let cond = Condition::from_bits(bits as u8);
                assert_eq!(
                    cond.passes(psr),
                    want,
                    "{cond:?} with n={n} z={z} c={c} v={v}"
                );
            }
        }
    }

    #[test]
    fn from_bits_ignores_the_high_nibble() {
        for bits in 0..=255_u8 {
            assert_eq!(
                Condition::from_bits(bits),
                Condition::from_bits(bits & 0xF)
            );
        }
    }

    #[test]
    fn always_has_an_empty_suffix() {
        assert_eq!(Condition::Always.suffix(), "");
        assert_eq!(Condition::UnsignedHigher.suffix(), "hi");
    }
}
