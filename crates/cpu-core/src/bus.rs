//! Contract between the interpreter and its external collaborators.
//!
//! The bus owns address decoding, waitstate bookkeeping, and the interrupt
//! controller; the interpreter only tags each access with an [`AccessKind`]
//! so the bus can account timing, and samples the interrupt lines once per
//! cycle before decode.

/// Classification of a memory access, used by the bus for timing bookkeeping.
///
/// The interpreter itself never branches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessKind {
    /// Opcode fetch following the previous fetch sequentially.
    InstructionSequential,
    /// Opcode fetch after a branch or exception redirect.
    InstructionNonSequential,
    /// Data access adjacent to the previous data access.
    DataSequential,
    /// Isolated data access.
    DataNonSequential,
}

impl AccessKind {
    /// Returns `true` for opcode fetches.
    #[must_use]
    pub const fn is_instruction(self) -> bool {
        matches!(
            self,
            Self::InstructionSequential | Self::InstructionNonSequential
        )
    }

    /// Returns `true` for sequential accesses.
    #[must_use]
    pub const fn is_sequential(self) -> bool {
        matches!(self, Self::InstructionSequential | Self::DataSequential)
    }
}

/// Memory and interrupt-line surface consumed by a core instance.
///
/// Word and halfword accesses are made with aligned addresses; the
/// interpreter applies the architecture's rotation rules for misaligned
/// loads itself before calling in.
pub trait Bus {
    /// Reads one byte.
    fn read8(&mut self, addr: u32, kind: AccessKind) -> u8;
    /// Reads a halfword from a halfword-aligned address.
    fn read16(&mut self, addr: u32, kind: AccessKind) -> u16;
    /// Reads a word from a word-aligned address.
    fn read32(&mut self, addr: u32, kind: AccessKind) -> u32;

    /// Writes one byte.
    fn write8(&mut self, addr: u32, value: u8, kind: AccessKind);
    /// Writes a halfword to a halfword-aligned address.
    fn write16(&mut self, addr: u32, value: u16, kind: AccessKind);
    /// Writes a word to a word-aligned address.
    fn write32(&mut self, addr: u32, value: u32, kind: AccessKind);

    /// Current state of the interrupt request line.
    ///
    /// Recomputed by the bus whenever its enable/pending registers change;
    /// the interpreter samples it once per cycle before decode.
    fn pending_interrupt(&self) -> bool;

    /// Current state of the fast interrupt request line.
    ///
    /// Sampled ahead of the ordinary line each cycle. Defaults to never
    /// asserted for buses whose platform does not wire the fast line.
    fn pending_fast_interrupt(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::AccessKind;

    #[test]
    fn access_kind_classification_is_consistent() {
        assert!(AccessKind::InstructionSequential.is_instruction());
        assert!(AccessKind::InstructionNonSequential.is_instruction());
        assert!(!AccessKind::DataSequential.is_instruction());
        assert!(!AccessKind::DataNonSequential.is_instruction());

        assert!(AccessKind::InstructionSequential.is_sequential());
        assert!(AccessKind::DataSequential.is_sequential());
        assert!(!AccessKind::InstructionNonSequential.is_sequential());
        assert!(!AccessKind::DataNonSequential.is_sequential());
    }
}
