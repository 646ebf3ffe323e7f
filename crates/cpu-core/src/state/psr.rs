use crate::fault::CoreError;

/// `PSR` bit for a negative result.
pub const PSR_N: u32 = 1 << 31;
/// `PSR` bit for a zero result.
pub const PSR_Z: u32 = 1 << 30;
/// `PSR` bit for carry/no-borrow.
pub const PSR_C: u32 = 1 << 29;
/// `PSR` bit for signed overflow.
pub const PSR_V: u32 = 1 << 28;
/// `PSR` sticky saturation bit.
pub const PSR_Q: u32 = 1 << 27;
/// `PSR` bit disabling normal interrupts.
pub const PSR_I: u32 = 1 << 7;
/// `PSR` bit disabling fast interrupts.
pub const PSR_F: u32 = 1 << 6;
/// `PSR` instruction-set-width bit (set = compact 16-bit encoding).
pub const PSR_T: u32 = 1 << 5;
/// Mask of the 5-bit privilege/banking mode field.
pub const PSR_MODE_MASK: u32 = 0x1F;

/// Privilege/register-banking mode selector stored in the status register.
///
/// Exactly 7 values are legal; anything else written into the mode field is
/// an invariant violation surfaced as [`CoreError::IllegalMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u32)]
pub enum Mode {
    /// Unprivileged mode.
    User = 0x10,
    /// Fast-interrupt mode; shadows R8-R14.
    Fiq = 0x11,
    /// Interrupt mode; shadows R13-R14.
    Irq = 0x12,
    /// Supervisor mode entered by reset and software interrupt.
    Supervisor = 0x13,
    /// Abort mode entered by memory faults.
    Abort = 0x17,
    /// Mode entered by undefined instructions.
    Undefined = 0x1B,
    /// Privileged mode sharing the unprivileged register set.
    System = 0x1F,
}

impl Mode {
    /// All 7 legal modes in ascending encoding order.
    pub const ALL: [Self; 7] = [
        Self::User,
        Self::Fiq,
        Self::Irq,
        Self::Supervisor,
        Self::Abort,
        Self::Undefined,
        Self::System,
    ];

    /// Returns the 5-bit field encoding for this mode.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Decodes a 5-bit mode field, rejecting the 25 illegal values.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & PSR_MODE_MASK {
            0x10 => Some(Self::User),
            0x11 => Some(Self::Fiq),
            0x12 => Some(Self::Irq),
            0x13 => Some(Self::Supervisor),
            0x17 => Some(Self::Abort),
            0x1B => Some(Self::Undefined),
            0x1F => Some(Self::System),
            _ => None,
        }
    }

    /// Returns `true` when this mode owns a saved status register.
    ///
    /// User and System share the unbanked register view and have no SPSR.
    #[must_use]
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }

    /// Returns `true` for modes allowed to touch the control fields of the
    /// status register.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }
}

/// A 32-bit status-register word.
///
/// Holds the four arithmetic flags, the sticky saturation flag, the two
/// interrupt-disable bits, the instruction-set-width bit, and the mode
/// field. Mode validity is enforced where a `Psr` is installed as the
/// current status register, not on every bit-level edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Psr(u32);

impl Psr {
    /// Builds a status word from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Builds the canonical power-on status word: the given mode with both
    /// interrupt-disable bits set and the wide encoding selected.
    #[must_use]
    pub const fn reset(mode: Mode) -> Self {
        Self(mode.bits() | PSR_I | PSR_F)
    }

    /// Returns the raw 32-bit word.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Raw 5-bit mode field, legal or not.
    #[must_use]
    pub const fn mode_bits(self) -> u32 {
        self.0 & PSR_MODE_MASK
    }

    /// Decoded mode field, `None` for the illegal encodings.
    #[must_use]
    pub const fn mode(self) -> Option<Mode> {
        Mode::from_bits(self.0)
    }

    /// Decoded mode field as a checked result.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalMode`] for the 25 reserved encodings.
    pub const fn checked_mode(self) -> Result<Mode, CoreError> {
        match self.mode() {
            Some(mode) => Ok(mode),
            None => Err(CoreError::IllegalMode {
                value: self.mode_bits(),
            }),
        }
    }

    /// Replaces the mode field.
    pub const fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !PSR_MODE_MASK) | mode.bits();
    }

    const fn flag(self, mask: u32) -> bool {
        (self.0 & mask) != 0
    }

    const fn set_flag(&mut self, mask: u32, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Negative flag.
    #[must_use]
    pub const fn negative(self) -> bool {
        self.flag(PSR_N)
    }

    /// Zero flag.
    #[must_use]
    pub const fn zero(self) -> bool {
        self.flag(PSR_Z)
    }

    /// Carry / no-borrow flag.
    #[must_use]
    pub const fn carry(self) -> bool {
        self.flag(PSR_C)
    }

    /// Signed-overflow flag.
    #[must_use]
    pub const fn overflow(self) -> bool {
        self.flag(PSR_V)
    }

    /// Sticky saturation flag.
    #[must_use]
    pub const fn saturation(self) -> bool {
        self.flag(PSR_Q)
    }

    /// `true` when normal interrupts are masked.
    #[must_use]
    pub const fn irq_disabled(self) -> bool {
        self.flag(PSR_I)
    }

    /// `true` when fast interrupts are masked.
    #[must_use]
    pub const fn fiq_disabled(self) -> bool {
        self.flag(PSR_F)
    }

    /// `true` when the compact 16-bit encoding is selected.
    #[must_use]
    pub const fn thumb(self) -> bool {
        self.flag(PSR_T)
    }

    /// Sets or clears the negative flag.
    pub const fn set_negative(&mut self, on: bool) {
        self.set_flag(PSR_N, on);
    }

    /// Sets or clears the zero flag.
    pub const fn set_zero(&mut self, on: bool) {
        self.set_flag(PSR_Z, on);
    }

    /// Sets or clears the carry flag.
    pub const fn set_carry(&mut self, on: bool) {
        self.set_flag(PSR_C, on);
    }

    /// Sets or clears the signed-overflow flag.
    pub const fn set_overflow(&mut self, on: bool) {
        self.set_flag(PSR_V, on);
    }

    /// Sets or clears the sticky saturation flag.
    pub const fn set_saturation(&mut self, on: bool) {
        self.set_flag(PSR_Q, on);
    }

    /// Masks or unmasks normal interrupts.
    pub const fn set_irq_disabled(&mut self, on: bool) {
        self.set_flag(PSR_I, on);
    }

    /// Masks or unmasks fast interrupts.
    pub const fn set_fiq_disabled(&mut self, on: bool) {
        self.set_flag(PSR_F, on);
    }

    /// Selects the compact (true) or wide (false) encoding.
    pub const fn set_thumb(&mut self, on: bool) {
        self.set_flag(PSR_T, on);
    }

    /// Updates N and Z from a 32-bit result, leaving C and V untouched.
    pub const fn set_nz(&mut self, result: u32) {
        self.set_negative((result >> 31) != 0);
        self.set_zero(result == 0);
    }
}

impl Default for Psr {
    fn default() -> Self {
        Self::reset(Mode::Supervisor)
    }
}

#[cfg(test)]
mod tests {
    use super::{Mode, Psr, PSR_MODE_MASK};
    use crate::fault::CoreError;

    #[test]
    fn exactly_seven_mode_encodings_are_legal() {
        let legal: Vec<u32> = (0..=PSR_MODE_MASK)
            .filter(|bits| Mode::from_bits(*bits).is_some())
            .collect();
        assert_eq!(legal.len(), 7);
        for mode in Mode::ALL {
            assert_eq!(Mode::from_bits(mode.bits()), Some(mode));
        }
    }

    #[test]
    fn spsr_ownership_excludes_user_and_system() {
        assert!(!Mode::User.has_spsr());
        assert!(!Mode::System.has_spsr());
        for mode in [Mode::Fiq, Mode::Irq, Mode::Supervisor, Mode::Abort, Mode::Undefined] {
            assert!(mode.has_spsr());
        }
    }

    #[test]
    fn reset_word_masks_interrupts_and_selects_wide_encoding() {
        let psr = Psr::reset(Mode::Supervisor);
        assert!(psr.irq_disabled());
        assert!(psr.fiq_disabled());
        assert!(!psr.thumb());
        assert_eq!(psr.mode(), Some(Mode::Supervisor));
    }

    #[test]
    fn flag_setters_roundtrip_each_bit_independently() {
        let mut psr = Psr::from_bits(Mode::User.bits());
        psr.set_negative(true);
        psr.set_carry(true);
        assert!(psr.negative());
        assert!(!psr.zero());
        assert!(psr.carry());
        assert!(!psr.overflow());

        psr.set_negative(false);
        assert!(!psr.negative());
        assert!(psr.carry());
    }

    #[test]
    fn set_nz_tracks_sign_and_zero() {
        let mut psr = Psr::from_bits(Mode::User.bits());
        psr.set_nz(0x8000_0000);
        assert!(psr.negative());
        assert!(!psr.zero());

        psr.set_nz(0);
        assert!(!psr.negative());
        assert!(psr.zero());
    }

    #[test]
    fn checked_mode_reports_illegal_field_values() {
        let psr = Psr::from_bits(0b00101);
        assert_eq!(
            psr.checked_mode(),
            Err(CoreError::IllegalMode { value: 0b00101 })
        );
    }
}
