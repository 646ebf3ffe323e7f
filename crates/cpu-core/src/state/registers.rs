use super::psr::{Mode, Psr};
use crate::fault::CoreError;

/// Register index of the stack pointer.
pub const SP: usize = 13;
/// Register index of the link register.
pub const LR: usize = 14;
/// Register index of the program counter.
pub const PC: usize = 15;

/// General-purpose register file with per-mode shadow storage.
///
/// Exactly one 16-register set is live at a time, selected by the mode field
/// of the current status register. FIQ shadows R8-R14; Supervisor, Abort,
/// IRQ, and Undefined each shadow R13-R14; User and System share the
/// unbanked set. Mode switches copy the outgoing subset into its shadow and
/// the incoming shadow into the live file, never partially.
///
/// The bank also tracks whether the program counter was redirected (written
/// through [`RegisterBank::write`] rather than advanced sequentially): any
/// redirect makes the driver's compact-encoding prefetch cache stale.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterBank {
    active: [u32; 16],
    mode: Mode,
    cpsr: Psr,
    /// R8-R14 for User/System; R8-R12 here are also the live values for
    /// Supervisor/Abort/IRQ/Undefined, which only shadow R13-R14.
    shadow_usr: [u32; 7],
    shadow_fiq: [u32; 7],
    shadow_svc: [u32; 2],
    shadow_abt: [u32; 2],
    shadow_irq: [u32; 2],
    shadow_und: [u32; 2],
    spsr_fiq: Psr,
    spsr_svc: Psr,
    spsr_abt: Psr,
    spsr_irq: Psr,
    spsr_und: Psr,
    pc_redirected: bool,
}

impl RegisterBank {
    /// Creates a power-on register bank: Supervisor mode, interrupts masked,
    /// every register zero.
    #[must_use]
    pub fn new() -> Self {
        let cpsr = Psr::reset(Mode::Supervisor);
        Self {
            active: [0; 16],
            mode: Mode::Supervisor,
            cpsr,
            shadow_usr: [0; 7],
            shadow_fiq: [0; 7],
            shadow_svc: [0; 2],
            shadow_abt: [0; 2],
            shadow_irq: [0; 2],
            shadow_und: [0; 2],
            spsr_fiq: cpsr,
            spsr_svc: cpsr,
            spsr_abt: cpsr,
            spsr_irq: cpsr,
            spsr_und: cpsr,
            pc_redirected: false,
        }
    }

    /// Reads a live general-purpose register.
    #[must_use]
    pub const fn read(&self, index: usize) -> u32 {
        self.active[index]
    }

    /// Writes a live general-purpose register.
    ///
    /// Writing the program counter marks it as redirected, which invalidates
    /// any pending compact-encoding prefetch state in the driver.
    pub const fn write(&mut self, index: usize, value: u32) {
        if index == PC {
            self.pc_redirected = true;
        }
        self.active[index] = value;
    }

    /// Driver-only sequential PC advance; does not count as a redirect.
    pub(crate) const fn set_pc_sequential(&mut self, value: u32) {
        self.active[PC] = value;
    }

    /// Consumes the PC-redirect marker.
    pub(crate) const fn take_pc_redirect(&mut self) -> bool {
        let redirected = self.pc_redirected;
        self.pc_redirected = false;
        redirected
    }

    /// Current status register.
    #[must_use]
    pub const fn cpsr(&self) -> Psr {
        self.cpsr
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Installs a full status-register word, switching the live register set
    /// when the mode field changed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalMode`] when the word carries one of the
    /// 25 reserved mode encodings; the bank is left untouched in that case.
    pub fn set_cpsr(&mut self, psr: Psr) -> Result<(), CoreError> {
        let new_mode = psr.checked_mode()?;
        if new_mode != self.mode {
            self.stash_active();
            self.load_shadow(new_mode);
            self.mode = new_mode;
        }
        self.cpsr = psr;
        Ok(())
    }

    /// Flag-only status update. The mode field of `psr` must match the
    /// current mode; use [`RegisterBank::set_cpsr`] for anything that can
    /// switch modes.
    pub(crate) const fn set_cpsr_flags(&mut self, psr: Psr) {
        self.cpsr = psr;
    }

    /// Reads the current mode's saved status register.
    ///
    /// User and System own no SPSR; reading it yields the current status
    /// register itself.
    #[must_use]
    pub const fn spsr(&self) -> Psr {
        match self.mode {
            Mode::User | Mode::System => self.cpsr,
            Mode::Fiq => self.spsr_fiq,
            Mode::Supervisor => self.spsr_svc,
            Mode::Abort => self.spsr_abt,
            Mode::Irq => self.spsr_irq,
            Mode::Undefined => self.spsr_und,
        }
    }

    /// Writes the current mode's saved status register; no-op in User/System.
    pub const fn set_spsr(&mut self, psr: Psr) {
        match self.mode {
            Mode::User | Mode::System => {}
            Mode::Fiq => self.spsr_fiq = psr,
            Mode::Supervisor => self.spsr_svc = psr,
            Mode::Abort => self.spsr_abt = psr,
            Mode::Irq => self.spsr_irq = psr,
            Mode::Undefined => self.spsr_und = psr,
        }
    }

    /// Reads a register through the unprivileged (User-bank) view,
    /// regardless of the current mode.
    #[must_use]
    pub const fn read_user(&self, index: usize) -> u32 {
        match self.user_bank_slot(index) {
            Some(slot) => self.shadow_usr[slot],
            None => self.active[index],
        }
    }

    /// Writes a register through the unprivileged (User-bank) view.
    pub const fn write_user(&mut self, index: usize, value: u32) {
        match self.user_bank_slot(index) {
            Some(slot) => self.shadow_usr[slot] = value,
            None => self.write(index, value),
        }
    }

    /// Returns the `shadow_usr` slot backing `index` in the current mode, or
    /// `None` when the live register already is the User-bank one.
    const fn user_bank_slot(&self, index: usize) -> Option<usize> {
        match (index, self.mode) {
            (8..=14, Mode::Fiq) => Some(index - 8),
            (13 | 14, Mode::Supervisor | Mode::Abort | Mode::Irq | Mode::Undefined) => {
                Some(index - 8)
            }
            _ => None,
        }
    }

    /// Copies the outgoing mode's banked subset from the live file into its
    /// shadow storage.
    fn stash_active(&mut self) {
        match self.mode {
            Mode::User | Mode::System => {
                self.shadow_usr.copy_from_slice(&self.active[8..15]);
            }
            Mode::Fiq => {
                self.shadow_fiq.copy_from_slice(&self.active[8..15]);
            }
            Mode::Supervisor => {
                self.shadow_usr[..5].copy_from_slice(&self.active[8..13]);
                self.shadow_svc.copy_from_slice(&self.active[13..15]);
            }
            Mode::Abort => {
                self.shadow_usr[..5].copy_from_slice(&self.active[8..13]);
                self.shadow_abt.copy_from_slice(&self.active[13..15]);
            }
            Mode::Irq => {
                self.shadow_usr[..5].copy_from_slice(&self.active[8..13]);
                self.shadow_irq.copy_from_slice(&self.active[13..15]);
            }
            Mode::Undefined => {
                self.shadow_usr[..5].copy_from_slice(&self.active[8..13]);
                self.shadow_und.copy_from_slice(&self.active[13..15]);
            }
        }
    }

    /// Copies the incoming mode's shadow storage into the live file.
    fn load_shadow(&mut self, mode: Mode) {
        match mode {
            Mode::User | Mode::System => {
                self.active[8..15].copy_from_slice(&self.shadow_usr);
            }
            Mode::Fiq => {
                self.active[8..15].copy_from_slice(&self.shadow_fiq);
            }
            Mode::Supervisor => {
                self.active[8..13].copy_from_slice(&self.shadow_usr[..5]);
                self.active[13..15].copy_from_slice(&self.shadow_svc);
            }
            Mode::Abort => {
                self.active[8..13].copy_from_slice(&self.shadow_usr[..5]);
                self.active[13..15].copy_from_slice(&self.shadow_abt);
            }
            Mode::Irq => {
                self.active[8..13].copy_from_slice(&self.shadow_usr[..5]);
                self.active[13..15].copy_from_slice(&self.shadow_irq);
            }
            Mode::Undefined => {
                self.active[8..13].copy_from_slice(&self.shadow_usr[..5]);
                self.active[13..15].copy_from_slice(&self.shadow_und);
            }
        }
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{RegisterBank, LR, PC, SP};
    use crate::state::psr::{Mode, Psr};

    fn bank_in(mode: Mode) -> RegisterBank {
        let mut bank = RegisterBank::new();
        bank.set_cpsr(Psr::reset(mode)).expect("legal mode");
        bank
    }

    fn switch(bank: &mut RegisterBank, mode: Mode) {
        let mut psr = bank.cpsr();
        psr.set_mode(mode);
        bank.set_cpsr(psr).expect("legal mode");
    }

    #[test]
    fn unbanked_registers_survive_every_mode_switch() {
        let mut bank = bank_in(Mode::User);
        for (i, value) in (0..8).zip(0x100..) {
            bank.write(i, value);
        }
        for mode in Mode::ALL {
            switch(&mut bank, mode);
            for i in 0..8 {
                assert_eq!(bank.read(i), 0x100 + i as u32, "r{i} in {mode:?}");
            }
        }
    }

    #[test]
    fn fiq_shadows_r8_to_r14() {
        let mut bank = bank_in(Mode::User);
        for i in 8..15 {
            bank.write(i, 0xAA00 + i as u32);
        }
        switch(&mut bank, Mode::Fiq);
        for i in 8..15 {
            bank.write(i, 0xFF00 + i as u32);
        }
        switch(&mut bank, Mode::User);
        for i in 8..15 {
            assert_eq!(bank.read(i), 0xAA00 + i as u32);
        }
        switch(&mut bank, Mode::Fiq);
        for i in 8..15 {
            assert_eq!(bank.read(i), 0xFF00 + i as u32);
        }
    }

    #[test]
    fn exception_modes_shadow_only_sp_and_lr() {
        let mut bank = bank_in(Mode::User);
        bank.write(12, 0x1212);
        bank.write(SP, 0x1313);
        bank.write(LR, 0x1414);

        switch(&mut bank, Mode::Supervisor);
        assert_eq!(bank.read(12), 0x1212, "r12 is not banked for svc");
        bank.write(SP, 0x2313);
        bank.write(LR, 0x2414);

        switch(&mut bank, Mode::User);
        assert_eq!(bank.read(SP), 0x1313);
        assert_eq!(bank.read(LR), 0x1414);
    }

    #[test]
    fn mode_switch_round_trip_restores_all_shadowed_state() {
        for a in Mode::ALL {
            for b in Mode::ALL {
                let mut bank = bank_in(a);
                for i in 0..16 {
                    bank.write(i, 0xB000 + i as u32);
                }
                let spsr = Psr::from_bits(Psr::reset(Mode::Irq).bits() | 0x8000_0000);
                bank.set_spsr(spsr);
                let saved_spsr = bank.spsr();

                switch(&mut bank, b);
                for i in 0..16 {
                    bank.write(i, 0xC000 + i as u32);
                }
                switch(&mut bank, a);

                for i in 0..8 {
                    assert_eq!(bank.read(i), 0xC000 + i as u32, "r{i} unbanked {a:?}->{b:?}");
                }
                assert_eq!(bank.read(PC), 0xC000 + 15, "pc unbanked {a:?}->{b:?}");
                if a != b {
                    for i in 8..15 {
                        let expected = if bank_shares(a, b, i) {
                            0xC000 + i as u32
                        } else {
                            0xB000 + i as u32
                        };
                        assert_eq!(bank.read(i), expected, "r{i} {a:?}->{b:?}");
                    }
                }
                assert_eq!(bank.spsr(), saved_spsr, "spsr {a:?}->{b:?}");
            }
        }
    }

    /// Whether register `index` is the same physical storage in modes `a` and `b`.
    fn bank_shares(a: Mode, b: Mode, index: usize) -> bool {
        let group = |mode: Mode| match (mode, index) {
            (Mode::Fiq, 8..=14) => 1_u32,
            (Mode::Supervisor, 13 | 14) => 2,
            (Mode::Abort, 13 | 14) => 3,
            (Mode::Irq, 13 | 14) => 4,
            (Mode::Undefined, 13 | 14) => 5,
            _ => 0,
        };
        group(a) == group(b)
    }

    #[test]
    fn spsr_in_user_and_system_aliases_the_current_status_register() {
        for mode in [Mode::User, Mode::System] {
            let mut bank = bank_in(mode);
            assert_eq!(bank.spsr(), bank.cpsr());

            let before = bank.cpsr();
            bank.set_spsr(Psr::from_bits(0xF000_0000 | mode.bits()));
            assert_eq!(bank.cpsr(), before, "spsr write is a no-op in {mode:?}");
        }
    }

    #[test]
    fn illegal_mode_write_is_rejected_and_leaves_bank_untouched() {
        let mut bank = bank_in(Mode::User);
        bank.write(SP, 0x7777);
        let err = bank.set_cpsr(Psr::from_bits(0b00000));
        assert!(err.is_err());
        assert_eq!(bank.mode(), Mode::User);
        assert_eq!(bank.read(SP), 0x7777);
    }

    #[test]
    fn pc_write_marks_redirect_and_sequential_advance_does_not() {
        let mut bank = RegisterBank::new();
        assert!(!bank.take_pc_redirect());

        bank.set_pc_sequential(4);
        assert!(!bank.take_pc_redirect());

        bank.write(PC, 0x8000);
        assert!(bank.take_pc_redirect());
        assert!(!bank.take_pc_redirect(), "marker is consumed");
    }

    #[test]
    fn user_bank_view_reaches_user_registers_from_privileged_modes() {
        let mut bank = bank_in(Mode::User);
        bank.write(SP, 0x1000);
        bank.write(8, 0x88);

        switch(&mut bank, Mode::Irq);
        bank.write(SP, 0x2000);
        assert_eq!(bank.read_user(SP), 0x1000);
        assert_eq!(bank.read_user(8), 0x88, "r8 is live user storage in irq");

        bank.write_user(SP, 0x1234);
        switch(&mut bank, Mode::User);
        assert_eq!(bank.read(SP), 0x1234);
    }
}
