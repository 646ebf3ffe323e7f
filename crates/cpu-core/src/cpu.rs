//! The per-cycle core driver.

use crate::bus::{AccessKind, Bus};
use crate::cp15::Cp15;
use crate::decode;
use crate::decode::ThumbInstr;
use crate::exception::Exception;
use crate::fault::CoreError;
use crate::state::{Psr, RegisterBank, LR, PC};

/// Which of the two cores this instance models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CoreVariant {
    /// The restricted core: no coprocessor, vectors fixed at zero.
    Arm7,
    /// The privileged core: carries CP15, may relocate its vectors high.
    Arm9,
}

impl CoreVariant {
    /// Whether this variant carries the system-control coprocessor.
    #[must_use]
    pub const fn has_cp15(self) -> bool {
        matches!(self, Self::Arm9)
    }
}

/// What a single [`Cpu::step`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An earlier instruction's internal cycles are still draining.
    Stalled,
    /// A pending interrupt line was taken instead of an instruction.
    Interrupt,
    /// The fetched instruction's condition failed; only the PC advanced.
    Skipped,
    /// The fetched instruction executed.
    Executed,
}

/// A single CPU core, stepped one instruction (or stall cycle) at a time.
///
/// The core owns nothing beyond its architectural state; memory, the
/// interrupt line, and everything else behind them belong to the [`Bus`]
/// implementation passed into [`Cpu::step`].
#[derive(Debug, Clone)]
pub struct Cpu {
    pub(crate) regs: RegisterBank,
    pub(crate) cp15: Option<Cp15>,
    pub(crate) variant: CoreVariant,
    /// Internal cycles still owed by the last instruction.
    extra_delay: u32,
    /// Halfword fetched ahead by the long-call prefix.
    pub(crate) prefetched: Option<u16>,
    /// Whether the next instruction fetch continues a sequential run.
    sequential_fetch: bool,
}

impl Cpu {
    /// Creates a core in its post-reset state.
    #[must_use]
    pub fn new(variant: CoreVariant) -> Self {
        let mut cpu = Self {
            regs: RegisterBank::new(),
            cp15: None,
            variant,
            extra_delay: 0,
            prefetched: None,
            sequential_fetch: false,
        };
        cpu.reset();
        cpu
    }

    /// Puts the core back into its post-reset state: Supervisor mode, both
    /// interrupt masks set, wide encoding, PC at the reset vector. The
    /// coprocessor (when present) is reset too, which on this core places
    /// the vectors at the high base.
    pub fn reset(&mut self) {
        self.regs = RegisterBank::new();
        self.cp15 = self.variant.has_cp15().then(Cp15::new);
        self.extra_delay = 0;
        self.prefetched = None;
        self.sequential_fetch = false;
        self.regs.write(PC, self.vector_base());
        self.regs.take_pc_redirect();
    }

    /// Advances the core by one cycle-step: drains a stall cycle, takes a
    /// pending interrupt (the fast line outranks the ordinary one), or
    /// fetches, decodes, and executes one instruction.
    ///
    /// # Errors
    ///
    /// Invariant violations surface as [`CoreError`]; see
    /// [`CoreError::is_invariant_violation`] for which of them indicate a
    /// corrupted core rather than unsupported input.
    pub fn step(&mut self, bus: &mut dyn Bus) -> Result<StepOutcome, CoreError> {
        if self.extra_delay > 0 {
            self.extra_delay -= 1;
            return Ok(StepOutcome::Stalled);
        }
        // An external PC write between steps invalidates the prefetch.
        if self.regs.take_pc_redirect() {
            self.prefetched = None;
            self.sequential_fetch = false;
        }
        if bus.pending_fast_interrupt() && !self.regs.cpsr().fiq_disabled() {
            let pc = self.regs.read(PC);
            self.enter_exception(Exception::Fiq, pc.wrapping_add(4))?;
            self.regs.take_pc_redirect();
            self.prefetched = None;
            self.sequential_fetch = false;
            return Ok(StepOutcome::Interrupt);
        }
        if bus.pending_interrupt() && !self.regs.cpsr().irq_disabled() {
            let pc = self.regs.read(PC);
            self.enter_exception(Exception::Irq, pc.wrapping_add(4))?;
            self.regs.take_pc_redirect();
            self.prefetched = None;
            self.sequential_fetch = false;
            return Ok(StepOutcome::Interrupt);
        }
        if self.regs.cpsr().thumb() {
            self.step_thumb(bus)
        } else {
            self.step_arm(bus)
        }
    }

    fn step_arm(&mut self, bus: &mut dyn Bus) -> Result<StepOutcome, CoreError> {
        let pc = self.regs.read(PC);
        let word = bus.read32(pc & !3, self.fetch_kind());
        let (cond, instr) = decode::arm::decode(word);
        if !cond.passes(self.regs.cpsr()) {
            self.advance(pc, 4);
            return Ok(StepOutcome::Skipped);
        }
        self.regs.set_pc_sequential(pc.wrapping_add(8));
        crate::exec::arm::execute(self, bus, &instr)?;
        if self.regs.take_pc_redirect() {
            self.prefetched = None;
            self.sequential_fetch = false;
        } else {
            self.advance(pc, 4);
        }
        Ok(StepOutcome::Executed)
    }

    fn step_thumb(&mut self, bus: &mut dyn Bus) -> Result<StepOutcome, CoreError> {
        let pc = self.regs.read(PC);
        let half = match self.prefetched.take() {
            Some(half) => half,
            None => bus.read16(pc & !1, self.fetch_kind()),
        };
        let instr = decode::thumb::decode(half);
        if let ThumbInstr::ConditionalBranch { condition, .. } = instr {
            if !condition.passes(self.regs.cpsr()) {
                self.advance(pc, 2);
                return Ok(StepOutcome::Skipped);
            }
        }
        self.regs.set_pc_sequential(pc.wrapping_add(4));
        crate::exec::thumb::execute(self, bus, &instr)?;
        if self.regs.take_pc_redirect() {
            self.prefetched = None;
            self.sequential_fetch = false;
        } else {
            self.advance(pc, 2);
        }
        Ok(StepOutcome::Executed)
    }

    fn advance(&mut self, pc: u32, size: u32) {
        self.regs.set_pc_sequential(pc.wrapping_add(size));
        self.sequential_fetch = true;
    }

    const fn fetch_kind(&self) -> AccessKind {
        if self.sequential_fetch {
            AccessKind::InstructionSequential
        } else {
            AccessKind::InstructionNonSequential
        }
    }

    /// Vectors the core into `exception`, banking the outgoing status word
    /// and leaving `return_addr` in the entry mode's link register.
    pub(crate) fn enter_exception(
        &mut self,
        exception: Exception,
        return_addr: u32,
    ) -> Result<(), CoreError> {
        let old = self.regs.cpsr();
        let mut psr = old;
        psr.set_mode(exception.entry_mode());
        psr.set_thumb(false);
        psr.set_irq_disabled(true);
        if exception.disables_fiq() {
            psr.set_fiq_disabled(true);
        }
        self.regs.set_cpsr(psr)?;
        self.regs.set_spsr(old);
        self.regs.write(LR, return_addr);
        let vector = self.vector_base() + exception.vector_offset();
        self.regs.write(PC, vector);
        log::debug!("{exception:?} taken, vector {vector:#010x}, return {return_addr:#010x}");
        Ok(())
    }

    fn vector_base(&self) -> u32 {
        match &self.cp15 {
            Some(cp15) if cp15.high_vectors() => 0xFFFF_0000,
            _ => 0,
        }
    }

    /// Queues `cycles` additional stall steps after the current
    /// instruction.
    pub(crate) const fn add_delay(&mut self, cycles: u32) {
        self.extra_delay += cycles;
    }

    /// Which core variant this instance emulates.
    #[must_use]
    pub const fn variant(&self) -> CoreVariant {
        self.variant
    }

    /// Reads a live general-purpose register.
    #[must_use]
    pub const fn reg(&self, index: usize) -> u32 {
        self.regs.read(index)
    }

    /// Writes a live general-purpose register. Writing the PC redirects
    /// the next fetch.
    pub const fn set_reg(&mut self, index: usize, value: u32) {
        self.regs.write(index, value);
    }

    /// Current status register.
    #[must_use]
    pub const fn cpsr(&self) -> Psr {
        self.regs.cpsr()
    }

    /// Installs a full status word, switching register banks as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalMode`] for a reserved mode field.
    pub fn set_cpsr(&mut self, psr: Psr) -> Result<(), CoreError> {
        self.regs.set_cpsr(psr)
    }

    /// Current mode's saved status register.
    #[must_use]
    pub const fn spsr(&self) -> Psr {
        self.regs.spsr()
    }

    /// The system-control coprocessor, present only on the privileged
    /// variant.
    #[must_use]
    pub const fn cp15(&self) -> Option<&Cp15> {
        self.cp15.as_ref()
    }
}
