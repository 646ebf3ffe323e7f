use crate::state::Mode;

/// The seven exception entries, in vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Exception {
    /// Power-on or hard reset.
    Reset,
    /// An opcode with no allocated semantics was executed.
    UndefinedInstruction,
    /// A `swi` instruction requested a supervisor service.
    SoftwareInterrupt,
    /// An opcode fetch faulted.
    PrefetchAbort,
    /// A data access faulted.
    DataAbort,
    /// The ordinary interrupt line was asserted.
    Irq,
    /// The fast interrupt line was asserted.
    Fiq,
}

impl Exception {
    /// Offset of this exception's vector from the vector base.
    ///
    /// Offset `0x14` is a reserved slot with no exception behind it.
    #[must_use]
    pub const fn vector_offset(self) -> u32 {
        match self {
            Self::Reset => 0x00,
            Self::UndefinedInstruction => 0x04,
            Self::SoftwareInterrupt => 0x08,
            Self::PrefetchAbort => 0x0C,
            Self::DataAbort => 0x10,
            Self::Irq => 0x18,
            Self::Fiq => 0x1C,
        }
    }

    /// Mode the core enters when taking this exception.
    #[must_use]
    pub const fn entry_mode(self) -> Mode {
        match self {
            Self::Reset | Self::SoftwareInterrupt => Mode::Supervisor,
            Self::UndefinedInstruction => Mode::Undefined,
            Self::PrefetchAbort | Self::DataAbort => Mode::Abort,
            Self::Irq => Mode::Irq,
            Self::Fiq => Mode::Fiq,
        }
    }

    /// Whether entry additionally masks fast interrupts. Every entry masks
    /// ordinary interrupts.
    #[must_use]
    pub const fn disables_fiq(self) -> bool {
        matches!(self, Self::Reset | Self::Fiq)
    }
}
