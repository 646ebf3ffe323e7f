use core::fmt;

use thiserror::Error;

/// Host-visible classification of genuinely-unimplemented instruction paths.
///
/// These encodings are reachable from guest code but have no semantics in
/// this interpreter; they are reported to the caller instead of aborting the
/// host process, so a bring-up harness can assert on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum UnimplementedKind {
    /// Saturating add/subtract family (`QADD`/`QSUB`/`QDADD`/`QDSUB`).
    SaturatingArithmetic,
    /// Coprocessor data operations and coprocessor load/store (`CDP`/`LDC`/`STC`).
    CoprocessorData,
    /// Doubleword load/store addressing forms (`LDRD`/`STRD`).
    DoublewordTransfer,
    /// Halfword multiply-accumulate-long forms (`SMLALxy`).
    HalfwordMultiplyLong,
}

impl fmt::Display for UnimplementedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SaturatingArithmetic => "saturating arithmetic",
            Self::CoprocessorData => "coprocessor data operation",
            Self::DoublewordTransfer => "doubleword transfer",
            Self::HalfwordMultiplyLong => "halfword multiply-accumulate-long",
        };
        f.write_str(name)
    }
}

/// Host-level programming-error taxonomy.
///
/// Guest-visible conditions (undefined instructions, software interrupts,
/// hardware interrupts) never surface here; they are recovered inside the
/// interpreter by vectoring into an exception. Only invariant violations a
/// caller may legitimately want to halt on become a `CoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CoreError {
    /// A status-register write carried a mode field outside the 7 legal values.
    #[error("illegal mode value {value:#07b} written to the status register")]
    IllegalMode {
        /// The offending 5-bit mode field.
        value: u32,
    },
    /// A coprocessor transfer targeted a coprocessor this core does not have.
    #[error("coprocessor transfer targets p{coprocessor} on a core without one")]
    CoprocessorMismatch {
        /// Coprocessor number from the opcode.
        coprocessor: u8,
    },
    /// A reachable opcode hit a path with no implemented semantics.
    #[error("unimplemented {kind} path (opcode {word:#010x})")]
    Unimplemented {
        /// The raw fetched opcode word.
        word: u32,
        /// Which unimplemented family was hit.
        kind: UnimplementedKind,
    },
}

impl CoreError {
    /// Returns `true` when the error indicates corrupted interpreter state
    /// rather than merely unsupported guest code.
    #[must_use]
    pub const fn is_invariant_violation(self) -> bool {
        matches!(self, Self::IllegalMode { .. } | Self::CoprocessorMismatch { .. })
    }
}
