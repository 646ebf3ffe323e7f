//! System-control coprocessor for the privileged core.
//!
//! Models the register file reachable through coprocessor moves: main ID,
//! cache type, the control register, the protection-unit region arrays,
//! cache lockdowns, and the two tightly-coupled memory banks. Cache
//! maintenance writes are accepted and discarded; the interpreter has no
//! cache to maintain.

/// Address window claimed by a tightly-coupled memory bank.
///
/// An address `a` falls inside the window when `a & mask == base`. The
/// disabled window has an all-ones base and a zero mask, which no address
/// can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TcmWindow {
    /// Base address the masked bits must equal.
    pub base: u32,
    /// Mask selecting the address bits compared against the base.
    pub mask: u32,
}

impl TcmWindow {
    /// A window no address matches.
    pub const DISABLED: Self = Self {
        base: 0xFFFF_FFFF,
        mask: 0,
    };

    /// Whether `address` falls inside this window.
    #[must_use]
    pub const fn contains(self, address: u32) -> bool {
        address & self.mask == self.base
    }
}

/// Main ID register: ARM-family part in the 946 line, revision 1.
const MAIN_ID: u32 = 0x4105_9461;
/// Cache type register: 4KiB data / 8KiB instruction, 4-way, 32-byte lines.
const CACHE_TYPE: u32 = 0x0F0D_2112;
/// Control register value after reset: high exception vectors enabled,
/// caches and TCM disabled.
const CONTROL_RESET: u32 = 0x0000_2078;

const CONTROL_HIGH_VECTORS: u32 = 1 << 13;
const CONTROL_DTCM_ENABLE: u32 = 1 << 16;
const CONTROL_ITCM_ENABLE: u32 = 1 << 18;

/// System-control coprocessor state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cp15 {
    control: u32,
    dtcm_reg: u32,
    itcm_reg: u32,
    dcache_lockdown: u32,
    icache_lockdown: u32,
    protection_data: [u32; 8],
    protection_instr: [u32; 8],
    dtcm: TcmWindow,
    itcm: TcmWindow,
}

impl Cp15 {
    /// Creates the coprocessor in its power-on state, with both TCM
    /// windows disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            control: CONTROL_RESET,
            dtcm_reg: 0,
            itcm_reg: 0,
            dcache_lockdown: 0,
            icache_lockdown: 0,
            protection_data: [0; 8],
            protection_instr: [0; 8],
            dtcm: TcmWindow::DISABLED,
            itcm: TcmWindow::DISABLED,
        }
    }

    /// Reads the register selected by the `(cn, cm, op)` triplet.
    ///
    /// Unknown triplets read as zero and leave a diagnostic in the log.
    #[must_use]
    pub fn read(&self, cn: u32, cm: u32, op: u32) -> u32 {
        match (cn, cm, op) {
            (0, 0, 0) => MAIN_ID,
            (0, 0, 1) => CACHE_TYPE,
            (1, 0, 0) => self.control,
            (6, region, 0) if region < 8 => self.protection_data[region as usize],
            (6, region, 1) if region < 8 => self.protection_instr[region as usize],
            (9, 0, 0) => self.dcache_lockdown,
            (9, 0, 1) => self.icache_lockdown,
            (9, 1, 0) => self.dtcm_reg,
            (9, 1, 1) => self.itcm_reg,
            _ => {
                log::warn!("cp15 read of unknown register c{cn},c{cm},{op}");
                0
            }
        }
    }

    /// Writes the register selected by the `(cn, cm, op)` triplet.
    ///
    /// Writes to the control register or a TCM register recompute the
    /// corresponding address windows. Cache maintenance operations (`c7`)
    /// are accepted silently; other unknown triplets are ignored with a
    /// diagnostic.
    pub fn write(&mut self, cn: u32, cm: u32, op: u32, value: u32) {
        match (cn, cm, op) {
            (0, 0, _) => {} // identification registers are read-only
            (1, 0, 0) => {
                self.control = value;
                self.recompute_windows();
            }
            (6, region, 0) if region < 8 => self.protection_data[region as usize] = value,
            (6, region, 1) if region < 8 => self.protection_instr[region as usize] = value,
            (7, _, _) => {} // cache maintenance, nothing to maintain
            (9, 0, 0) => self.dcache_lockdown = value,
            (9, 0, 1) => self.icache_lockdown = value,
            (9, 1, 0) => {
                self.dtcm_reg = value;
                self.recompute_windows();
            }
            (9, 1, 1) => {
                self.itcm_reg = value;
                self.recompute_windows();
            }
            _ => {
                log::warn!("cp15 write of unknown register c{cn},c{cm},{op} = {value:#010x}");
            }
        }
    }

    /// Whether exception vectors sit at the high base.
    #[must_use]
    pub const fn high_vectors(&self) -> bool {
        self.control & CONTROL_HIGH_VECTORS != 0
    }

    /// The data TCM window, disabled when the control register has the
    /// bank switched off.
    #[must_use]
    pub const fn dtcm(&self) -> TcmWindow {
        self.dtcm
    }

    /// The instruction TCM window. Its base is fixed at zero; only the
    /// size field of the register participates.
    #[must_use]
    pub const fn itcm(&self) -> TcmWindow {
        self.itcm
    }

    fn recompute_windows(&mut self) {
        self.dtcm = if self.control & CONTROL_DTCM_ENABLE != 0 {
            window_of(self.dtcm_reg & 0xFFFF_F000, self.dtcm_reg)
        } else {
            TcmWindow::DISABLED
        };
        self.itcm = if self.control & CONTROL_ITCM_ENABLE != 0 {
            window_of(0, self.itcm_reg)
        } else {
            TcmWindow::DISABLED
        };
    }
}

impl Default for Cp15 {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a window from a base and the size field of a TCM register:
/// bits 5:1 select `0x200 << n` bytes, clamped to the architectural
/// 4KiB..=4GiB range.
fn window_of(base: u32, reg: u32) -> TcmWindow {
    let size_field = (reg >> 1) & 0x1F;
    let size_field = size_field.clamp(3, 23);
    let size = 0x200_u64 << size_field;
    let mask = !(size - 1) as u32;
    TcmWindow {
        base: base & mask,
        mask,
    }
}

#[cfg(test)]
mod tests {
    use super::{Cp15, TcmWindow, CACHE_TYPE, CONTROL_RESET, MAIN_ID};

    #[test]
    fn identification_registers_are_fixed_and_read_only() {
        let mut cp = Cp15::new();
        assert_eq!(cp.read(0, 0, 0), MAIN_ID);
        assert_eq!(cp.read(0, 0, 1), CACHE_TYPE);

        cp.write(0, 0, 0, 0xDEAD_BEEF);
        assert_eq!(cp.read(0, 0, 0), MAIN_ID);
    }

    #[test]
    fn reset_control_has_high_vectors_and_no_tcm() {
        let cp = Cp15::new();
        assert_eq!(cp.read(1, 0, 0), CONTROL_RESET);
        assert!(cp.high_vectors());
        assert_eq!(cp.dtcm(), TcmWindow::DISABLED);
        assert_eq!(cp.itcm(), TcmWindow::DISABLED);
        assert!(!cp.dtcm().contains(0));
        assert!(!cp.dtcm().contains(0xFFFF_FFFF));
    }

    #[test]
    fn dtcm_window_follows_the_register_and_enable_bit() {
        let mut cp = Cp15::new();
        // 16KiB bank at 0x0300_0000: size field 5 in bits 5:1.
        cp.write(9, 1, 0, 0x0300_0000 | 5 << 1);
        assert_eq!(cp.dtcm(), TcmWindow::DISABLED, "disabled until bit 16");

        cp.write(1, 0, 0, CONTROL_RESET | 1 << 16);
        let window = cp.dtcm();
        assert_eq!(window.base, 0x0300_0000);
        assert_eq!(window.mask, !(0x4000 - 1));
        assert!(window.contains(0x0300_0000));
        assert!(window.contains(0x0300_3FFF));
        assert!(!window.contains(0x0300_4000));

        cp.write(1, 0, 0, CONTROL_RESET);
        assert_eq!(cp.dtcm(), TcmWindow::DISABLED);
    }

    #[test]
    fn itcm_base_is_pinned_at_zero() {
        let mut cp = Cp15::new();
        cp.write(9, 1, 1, 0x0800_0000 | 7 << 1);
        cp.write(1, 0, 0, CONTROL_RESET | 1 << 18);
        let window = cp.itcm();
        assert_eq!(window.base, 0);
        assert!(window.contains(0x0000_7FFF));
        assert!(!window.contains(0x0001_0000));
    }

    #[test]
    fn tcm_size_field_is_clamped_to_the_architectural_range() {
        let mut cp = Cp15::new();
        cp.write(1, 0, 0, CONTROL_RESET | 1 << 16);

        cp.write(9, 1, 0, 0x0300_0000); // size field 0, below minimum
        assert_eq!(cp.dtcm().mask, !(0x1000 - 1), "clamped up to 4KiB");

        cp.write(9, 1, 0, 0x0300_0000 | 0x1F << 1); // size field 31, above maximum
        assert_eq!(cp.dtcm().mask, 0, "clamped down to the 4GiB window");
    }

    #[test]
    fn protection_regions_and_lockdowns_hold_their_values() {
        let mut cp = Cp15::new();
        for region in 0..8 {
            cp.write(6, region, 0, 0xD000 + region);
            cp.write(6, region, 1, 0xE000 + region);
        }
        for region in 0..8 {
            assert_eq!(cp.read(6, region, 0), 0xD000 + region);
            assert_eq!(cp.read(6, region, 1), 0xE000 + region);
        }

        cp.write(9, 0, 0, 0xA);
        cp.write(9, 0, 1, 0xB);
        assert_eq!(cp.read(9, 0, 0), 0xA);
        assert_eq!(cp.read(9, 0, 1), 0xB);
    }

    #[test]
    fn unknown_triplets_read_zero_and_ignore_writes() {
        let mut cp = Cp15::new();
        let before = cp.clone();
        cp.write(13, 0, 3, 0x1234_5678);
        cp.write(7, 5, 0, 0); // cache maintenance is a silent no-op
        assert_eq!(cp, before);
        assert_eq!(cp.read(13, 0, 3), 0);
    }
}
