//! Execution of the wide 32-bit encoding.

use crate::alu::{self, AluResult};
use crate::bus::{AccessKind, Bus};
use crate::cpu::{CoreVariant, Cpu};
use crate::decode::arm::{
    AluOp, ArmInstr, HalfwordMulKind, HalfwordOffset, HalfwordOp, Operand2, RegisterShift,
    ShiftBy, TransferOffset,
};
use crate::exception::Exception;
use crate::exec;
use crate::fault::CoreError;
use crate::state::{LR, PC};

/// Executes one decoded wide instruction whose condition already passed.
///
/// The PC holds the instruction address plus eight throughout.
pub(crate) fn execute(cpu: &mut Cpu, bus: &mut dyn Bus, instr: &ArmInstr) -> Result<(), CoreError> {
    match *instr {
        ArmInstr::DataProcessing {
            op,
            set_flags,
            rn,
            rd,
            operand,
        } => data_processing(cpu, op, set_flags, rn, rd, operand),
        ArmInstr::Mrs { spsr, rd } => {
            let value = if spsr {
                cpu.regs.spsr()
            } else {
                cpu.regs.cpsr()
            };
            cpu.regs.write(rd, value.bits());
            Ok(())
        }
        ArmInstr::Msr {
            spsr,
            mask,
            operand,
        } => msr(cpu, spsr, mask, operand),
        ArmInstr::Multiply {
            accumulate,
            set_flags,
            rd,
            rn,
            rs,
            rm,
        } => {
            let mut value = cpu.regs.read(rm).wrapping_mul(cpu.regs.read(rs));
            if accumulate {
                value = value.wrapping_add(cpu.regs.read(rn));
                cpu.add_delay(1);
            }
            cpu.regs.write(rd, value);
            if set_flags {
                multiply_flags(cpu, value >> 31 != 0, value == 0);
            }
            Ok(())
        }
        ArmInstr::MultiplyLong {
            signed,
            accumulate,
            set_flags,
            rd_hi,
            rd_lo,
            rs,
            rm,
        } => {
            let a = cpu.regs.read(rm);
            let b = cpu.regs.read(rs);
            let mut value = if signed {
                (i64::from(a as i32)).wrapping_mul(i64::from(b as i32)) as u64
            } else {
                u64::from(a) * u64::from(b)
            };
            if accumulate {
                let acc = u64::from(cpu.regs.read(rd_hi)) << 32 | u64::from(cpu.regs.read(rd_lo));
                value = value.wrapping_add(acc);
            }
            cpu.regs.write(rd_lo, value as u32);
            cpu.regs.write(rd_hi, (value >> 32) as u32);
            if set_flags {
                multiply_flags(cpu, value >> 63 != 0, value == 0);
            }
            cpu.add_delay(if accumulate { 3 } else { 1 });
            Ok(())
        }
        ArmInstr::HalfwordMultiply {
            kind,
            rd,
            rn,
            rs,
            rm,
            x,
            y,
        } => halfword_multiply(cpu, kind, rd, rn, rs, rm, x, y),
        ArmInstr::Swap { byte, rn, rd, rm } => {
            let addr = cpu.regs.read(rn);
            let new = cpu.regs.read(rm);
            let old = if byte {
                let old = bus.read8(addr, AccessKind::DataNonSequential);
                bus.write8(addr, new as u8, AccessKind::DataNonSequential);
                u32::from(old)
            } else {
                let old = exec::read_word_rotated(bus, addr, AccessKind::DataNonSequential);
                bus.write32(addr & !3, new, AccessKind::DataNonSequential);
                old
            };
            cpu.regs.write(rd, old);
            Ok(())
        }
        ArmInstr::SingleTransfer {
            load,
            byte,
            pre,
            add,
            writeback,
            translate: _,
            rn,
            rd,
            offset,
        } => single_transfer(cpu, bus, load, byte, pre, add, writeback, rn, rd, offset),
        ArmInstr::HalfwordTransfer {
            op,
            pre,
            add,
            writeback,
            rn,
            rd,
            offset,
        } => halfword_transfer(cpu, bus, op, pre, add, writeback, rn, rd, offset),
        ArmInstr::BlockTransfer {
            load,
            pre,
            add,
            writeback,
            user_bank,
            rn,
            list,
        } => block_transfer(cpu, bus, load, pre, add, writeback, user_bank, rn, list),
        ArmInstr::Branch { link, offset } => {
            let pipeline = cpu.regs.read(PC);
            if link {
                cpu.regs.write(LR, pipeline.wrapping_sub(4));
            }
            cpu.regs.write(PC, pipeline.wrapping_add_signed(offset));
            Ok(())
        }
        ArmInstr::BranchExchange { link, rm } => {
            if link && cpu.variant == CoreVariant::Arm7 {
                return undefined(cpu, instr);
            }
            let target = cpu.regs.read(rm);
            if link {
                let pipeline = cpu.regs.read(PC);
                cpu.regs.write(LR, pipeline.wrapping_sub(4));
            }
            branch_exchange(cpu, target)
        }
        ArmInstr::BranchLinkExchangeImm { offset } => {
            if cpu.variant == CoreVariant::Arm7 {
                return undefined(cpu, instr);
            }
            let pipeline = cpu.regs.read(PC);
            cpu.regs.write(LR, pipeline.wrapping_sub(4));
            let mut psr = cpu.regs.cpsr();
            psr.set_thumb(true);
            cpu.regs.set_cpsr_flags(psr);
            cpu.regs.write(PC, pipeline.wrapping_add_signed(offset));
            Ok(())
        }
        ArmInstr::CoprocessorTransfer {
            load,
            cp,
            op1,
            rd,
            cn,
            cm,
            op2,
        } => coprocessor_transfer(cpu, load, cp, op1, rd, cn, cm, op2),
        ArmInstr::SoftwareInterrupt { comment } => {
            let pipeline = cpu.regs.read(PC);
            log::trace!("swi {comment:#x}");
            cpu.enter_exception(Exception::SoftwareInterrupt, pipeline.wrapping_sub(4))
        }
        ArmInstr::Undefined { .. } => undefined(cpu, instr),
        ArmInstr::Unimplemented { word, kind } => Err(CoreError::Unimplemented { word, kind }),
    }
}

/// Undefined encodings are diagnosed and stepped over rather than vectored.
fn undefined(cpu: &Cpu, instr: &ArmInstr) -> Result<(), CoreError> {
    let at = cpu.regs.read(PC).wrapping_sub(8);
    log::warn!("undefined instruction {instr:02x?} at {at:#010x}");
    Ok(())
}

/// Second-operand evaluation: value plus the shifter's carry-out.
fn operand2_value(cpu: &Cpu, operand: Operand2, carry_in: bool) -> (u32, bool) {
    match operand {
        Operand2::Immediate { value, rotate } => alu::rotated_immediate(value, rotate, carry_in),
        Operand2::Shifted(shift) => register_shift_value(cpu, shift, carry_in),
    }
}

fn register_shift_value(cpu: &Cpu, shift: RegisterShift, carry_in: bool) -> (u32, bool) {
    let mut value = cpu.regs.read(shift.reg);
    match shift.by {
        ShiftBy::Immediate(amount) => {
            alu::shift_by_immediate(shift.kind, value, amount, carry_in)
        }
        ShiftBy::Register(rs) => {
            // With a register-specified amount the prefetch sits one word
            // further on.
            if shift.reg == PC {
                value = value.wrapping_add(4);
            }
            let amount = cpu.regs.read(rs);
            alu::shift_by_register(shift.kind, value, amount, carry_in)
        }
    }
}

fn data_processing(
    cpu: &mut Cpu,
    op: AluOp,
    set_flags: bool,
    rn: usize,
    rd: usize,
    operand: Operand2,
) -> Result<(), CoreError> {
    let cpsr = cpu.regs.cpsr();
    let carry_in = cpsr.carry();
    let register_amount = matches!(
        operand,
        Operand2::Shifted(RegisterShift {
            by: ShiftBy::Register(_),
            ..
        })
    );
    let (op2, shifter_carry) = operand2_value(cpu, operand, carry_in);
    let mut a = cpu.regs.read(rn);
    if rn == PC && register_amount {
        a = a.wrapping_add(4);
    }

    let logical = |value| AluResult {
        value,
        carry: shifter_carry,
        overflow: cpsr.overflow(),
    };
    let (result, write_result) = match op {
        AluOp::And => (logical(a & op2), true),
        AluOp::Eor => (logical(a ^ op2), true),
        AluOp::Sub => (alu::sub(a, op2), true),
        AluOp::Rsb => (alu::sub(op2, a), true),
        AluOp::Add => (alu::add(a, op2), true),
        AluOp::Adc => (alu::adc(a, op2, carry_in), true),
        AluOp::Sbc => (alu::sbc(a, op2, carry_in), true),
        AluOp::Rsc => (alu::sbc(op2, a, carry_in), true),
        AluOp::Tst => (logical(a & op2), false),
        AluOp::Teq => (logical(a ^ op2), false),
        AluOp::Cmp => (alu::sub(a, op2), false),
        AluOp::Cmn => (alu::add(a, op2), false),
        AluOp::Orr => (logical(a | op2), true),
        AluOp::Mov => (logical(op2), true),
        AluOp::Bic => (logical(a & !op2), true),
        AluOp::Mvn => (logical(!op2), true),
    };

    if write_result {
        cpu.regs.write(rd, result.value);
    }
    if set_flags {
        if rd == PC && write_result {
            // The exception-return idiom: the banked status word comes
            // back wholesale, mode switch included.
            let spsr = cpu.regs.spsr();
            cpu.regs.set_cpsr(spsr)?;
        } else {
            exec::set_nzcv(cpu, result);
        }
    }
    Ok(())
}

fn msr(cpu: &mut Cpu, spsr: bool, mask: u8, operand: Operand2) -> Result<(), CoreError> {
    let cpsr = cpu.regs.cpsr();
    let (value, _) = operand2_value(cpu, operand, cpsr.carry());
    let mut write_mask = 0_u32;
    for (bit, byte_mask) in [
        (0b1000, 0xFF00_0000),
        (0b0100, 0x00FF_0000),
        (0b0010, 0x0000_FF00),
        (0b0001, 0x0000_00FF),
    ] {
        if mask & bit != 0 {
            write_mask |= byte_mask;
        }
    }
    if spsr {
        let old = cpu.regs.spsr();
        let new = crate::state::Psr::from_bits(old.bits() & !write_mask | value & write_mask);
        cpu.regs.set_spsr(new);
        Ok(())
    } else {
        if !cpu.regs.mode().is_privileged() {
            // Unprivileged code may only touch the flags byte.
            write_mask &= 0xFF00_0000;
        }
        let new = crate::state::Psr::from_bits(cpsr.bits() & !write_mask | value & write_mask);
        cpu.regs.set_cpsr(new)
    }
}

fn multiply_flags(cpu: &mut Cpu, negative: bool, zero: bool) {
    let mut psr = cpu.regs.cpsr();
    psr.set_negative(negative);
    psr.set_zero(zero);
    // The older core leaves a cleared carry behind a flag-setting
    // multiply; the newer one preserves it.
    if cpu.variant == CoreVariant::Arm7 {
        psr.set_carry(false);
    }
    cpu.regs.set_cpsr_flags(psr);
}

#[allow(clippy::too_many_arguments)]
fn halfword_multiply(
    cpu: &mut Cpu,
    kind: HalfwordMulKind,
    rd: usize,
    rn: usize,
    rs: usize,
    rm: usize,
    x: bool,
    y: bool,
) -> Result<(), CoreError> {
    if cpu.variant == CoreVariant::Arm7 {
        let at = cpu.regs.read(PC).wrapping_sub(8);
        log::warn!("halfword multiply on the restricted core at {at:#010x}");
        return Ok(());
    }
    let half = |value: u32, top: bool| {
        i32::from(if top {
            (value >> 16) as i16
        } else {
            value as i16
        })
    };
    let rm_value = cpu.regs.read(rm);
    let rs_value = cpu.regs.read(rs);
    let value = match kind {
        HalfwordMulKind::Smla => {
            let product = half(rm_value, x).wrapping_mul(half(rs_value, y));
            cpu.add_delay(1);
            accumulate_q(cpu, product, rn)
        }
        HalfwordMulKind::Smlaw => {
            let product =
                ((i64::from(rm_value as i32) * i64::from(half(rs_value, y))) >> 16) as i32;
            cpu.add_delay(1);
            accumulate_q(cpu, product, rn)
        }
        HalfwordMulKind::Smulw => {
            ((i64::from(rm_value as i32) * i64::from(half(rs_value, y))) >> 16) as u32
        }
        HalfwordMulKind::Smul => half(rm_value, x).wrapping_mul(half(rs_value, y)) as u32,
    };
    cpu.regs.write(rd, value);
    Ok(())
}

/// Adds `rn` to a halfword product, raising the sticky saturation flag on
/// signed overflow. The result itself wraps.
fn accumulate_q(cpu: &mut Cpu, product: i32, rn: usize) -> u32 {
    let accumulator = cpu.regs.read(rn) as i32;
    let (sum, overflowed) = product.overflowing_add(accumulator);
    if overflowed {
        let mut psr = cpu.regs.cpsr();
        psr.set_saturation(true);
        cpu.regs.set_cpsr_flags(psr);
    }
    sum as u32
}

/// The translated (user-view) access qualifier decoded from LDRT/STRT is
/// dropped here: [`Bus`] carries no privilege channel, so both access
/// flavors reach memory identically.
#[allow(clippy::too_many_arguments)]
fn single_transfer(
    cpu: &mut Cpu,
    bus: &mut dyn Bus,
    load: bool,
    byte: bool,
    pre: bool,
    add: bool,
    writeback: bool,
    rn: usize,
    rd: usize,
    offset: TransferOffset,
) -> Result<(), CoreError> {
    let base = cpu.regs.read(rn);
    let offset_value = match offset {
        TransferOffset::Immediate(imm) => u32::from(imm),
        TransferOffset::Register(shift) => {
            register_shift_value(cpu, shift, cpu.regs.cpsr().carry()).0
        }
    };
    let stepped = if add {
        base.wrapping_add(offset_value)
    } else {
        base.wrapping_sub(offset_value)
    };
    let address = if pre { stepped } else { base };

    if load {
        let value = if byte {
            u32::from(bus.read8(address, AccessKind::DataNonSequential))
        } else {
            exec::read_word_rotated(bus, address, AccessKind::DataNonSequential)
        };
        // Writeback lands first so a load into the base register wins.
        if writeback {
            cpu.regs.write(rn, stepped);
        }
        if rd == PC {
            load_to_pc(cpu, value)?;
        } else {
            cpu.regs.write(rd, value);
        }
    } else {
        let mut value = cpu.regs.read(rd);
        if rd == PC {
            // A stored PC reads one word beyond the prefetch.
            value = value.wrapping_add(4);
        }
        if byte {
            bus.write8(address, value as u8, AccessKind::DataNonSequential);
        } else {
            bus.write32(address & !3, value, AccessKind::DataNonSequential);
        }
        if writeback {
            cpu.regs.write(rn, stepped);
        }
    }
    Ok(())
}

/// Loads into the PC, honoring the newer core's encoding interworking.
fn load_to_pc(cpu: &mut Cpu, value: u32) -> Result<(), CoreError> {
    if cpu.variant == CoreVariant::Arm9 && value & 1 != 0 {
        let mut psr = cpu.regs.cpsr();
        psr.set_thumb(true);
        cpu.regs.set_cpsr_flags(psr);
        cpu.regs.write(PC, value & !1);
    } else {
        cpu.regs.write(PC, value & !3);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn halfword_transfer(
    cpu: &mut Cpu,
    bus: &mut dyn Bus,
    op: HalfwordOp,
    pre: bool,
    add: bool,
    writeback: bool,
    rn: usize,
    rd: usize,
    offset: HalfwordOffset,
) -> Result<(), CoreError> {
    let base = cpu.regs.read(rn);
    let offset_value = match offset {
        HalfwordOffset::Immediate(imm) => u32::from(imm),
        HalfwordOffset::Register(ro) => cpu.regs.read(ro),
    };
    let stepped = if add {
        base.wrapping_add(offset_value)
    } else {
        base.wrapping_sub(offset_value)
    };
    let address = if pre { stepped } else { base };

    match op {
        HalfwordOp::StoreHalf => {
            let mut value = cpu.regs.read(rd);
            if rd == PC {
                value = value.wrapping_add(4);
            }
            bus.write16(address & !1, value as u16, AccessKind::DataNonSequential);
            if writeback {
                cpu.regs.write(rn, stepped);
            }
        }
        HalfwordOp::LoadHalf | HalfwordOp::LoadSignedByte | HalfwordOp::LoadSignedHalf => {
            let value = match op {
                HalfwordOp::LoadHalf => {
                    u32::from(bus.read16(address & !1, AccessKind::DataNonSequential))
                }
                HalfwordOp::LoadSignedByte => {
                    bus.read8(address, AccessKind::DataNonSequential) as i8 as u32
                }
                _ => bus.read16(address & !1, AccessKind::DataNonSequential) as i16 as u32,
            };
            if writeback {
                cpu.regs.write(rn, stepped);
            }
            if rd == PC {
                load_to_pc(cpu, value)?;
            } else {
                cpu.regs.write(rd, value);
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn block_transfer(
    cpu: &mut Cpu,
    bus: &mut dyn Bus,
    load: bool,
    pre: bool,
    add: bool,
    writeback: bool,
    user_bank: bool,
    rn: usize,
    list: u16,
) -> Result<(), CoreError> {
    let base = cpu.regs.read(rn);
    let count = list.count_ones();
    if list == 0 {
        log::warn!("block transfer with an empty register list");
    }
    let span = count * 4;
    let start = if add {
        base.wrapping_add(if pre { 4 } else { 0 })
    } else {
        base.wrapping_sub(span).wrapping_add(if pre { 0 } else { 4 })
    };
    let final_base = if add {
        base.wrapping_add(span)
    } else {
        base.wrapping_sub(span)
    };
    // User-bank access applies to stores always, and to loads without the
    // PC; a load with the PC instead restores the banked status word.
    let pc_in_list = list & 1 << PC != 0;
    let user_transfer = user_bank && (!load || !pc_in_list);

    let mut address = start;
    let mut kind = AccessKind::DataNonSequential;
    if load {
        let mut pc_value = None;
        for index in 0..16 {
            if list & 1 << index == 0 {
                continue;
            }
            let value = bus.read32(address & !3, kind);
            kind = AccessKind::DataSequential;
            address = address.wrapping_add(4);
            if index == PC {
                pc_value = Some(value);
            } else if user_transfer {
                cpu.regs.write_user(index, value);
            } else {
                cpu.regs.write(index, value);
            }
        }
        // A reloaded base keeps its loaded value; user-bank transfers do
        // not write back at all.
        if writeback && list & 1 << rn == 0 && !user_transfer {
            cpu.regs.write(rn, final_base);
        }
        if let Some(value) = pc_value {
            if user_bank {
                let spsr = cpu.regs.spsr();
                cpu.regs.set_cpsr(spsr)?;
                let mask = if cpu.regs.cpsr().thumb() { !1 } else { !3 };
                cpu.regs.write(PC, value & mask);
            } else {
                load_to_pc(cpu, value)?;
            }
        }
    } else {
        for index in 0..16 {
            if list & 1 << index == 0 {
                continue;
            }
            let mut value = if user_transfer {
                cpu.regs.read_user(index)
            } else {
                cpu.regs.read(index)
            };
            if index == PC {
                value = value.wrapping_add(4);
            }
            bus.write32(address & !3, value, kind);
            kind = AccessKind::DataSequential;
            address = address.wrapping_add(4);
        }
        if writeback && !user_transfer {
            cpu.regs.write(rn, final_base);
        }
    }
    Ok(())
}

/// Shared by the register branch-exchange and loads into the PC on the
/// newer core: bit 0 selects the compact encoding.
fn branch_exchange(cpu: &mut Cpu, target: u32) -> Result<(), CoreError> {
    let mut psr = cpu.regs.cpsr();
    if target & 1 != 0 {
        psr.set_thumb(true);
        cpu.regs.set_cpsr_flags(psr);
        cpu.regs.write(PC, target & !1);
    } else {
        psr.set_thumb(false);
        cpu.regs.set_cpsr_flags(psr);
        cpu.regs.write(PC, target & !3);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn coprocessor_transfer(
    cpu: &mut Cpu,
    load: bool,
    cp: u8,
    op1: u8,
    rd: usize,
    cn: u32,
    cm: u32,
    op2: u32,
) -> Result<(), CoreError> {
    if cp != 15 || cpu.cp15.is_none() {
        return Err(CoreError::CoprocessorMismatch { coprocessor: cp });
    }
    if !cpu.regs.mode().is_privileged() {
        log::warn!("unprivileged coprocessor access to c{cn},c{cm},{op2} ignored");
        return Ok(());
    }
    if op1 != 0 {
        log::warn!("coprocessor access with opcode {op1}, treating as 0");
    }
    if load {
        let value = cpu.cp15.as_ref().map_or(0, |cp15| cp15.read(cn, cm, op2));
        if rd == PC {
            // Reads into the PC slot land in the top status flags instead.
            let mut psr = cpu.regs.cpsr();
            psr.set_negative(value & 1 << 31 != 0);
            psr.set_zero(value & 1 << 30 != 0);
            psr.set_carry(value & 1 << 29 != 0);
            psr.set_overflow(value & 1 << 28 != 0);
            cpu.regs.set_cpsr_flags(psr);
        } else {
            cpu.regs.write(rd, value);
        }
    } else {
        let value = cpu.regs.read(rd);
        if let Some(cp15) = cpu.cp15.as_mut() {
            cp15.write(cn, cm, op2, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::bus::{AccessKind, Bus};
    use crate::cpu::{CoreVariant, Cpu, StepOutcome};
    use crate::state::{Mode, Psr, LR, PC, SP};
    use rstest::rstest;

    struct RamBus {
        mem: Vec<u8>,
    }

    impl RamBus {
        fn new(size: usize) -> Self {
            Self { mem: vec![0; size] }
        }

        fn load_words(&mut self, base: u32, words: &[u32]) {
            for (i, word) in words.iter().enumerate() {
                let addr = base as usize + i * 4;
                self.mem[addr..addr + 4].copy_from_slice(&word.to_le_bytes());
            }
        }

        fn word(&self, addr: u32) -> u32 {
            let addr = addr as usize;
            u32::from_le_bytes([
                self.mem[addr],
                self.mem[addr + 1],
                self.mem[addr + 2],
                self.mem[addr + 3],
            ])
        }
    }

    impl Bus for RamBus {
        fn read8(&mut self, addr: u32, _kind: AccessKind) -> u8 {
            self.mem[addr as usize]
        }

        fn read16(&mut self, addr: u32, _kind: AccessKind) -> u16 {
            let addr = addr as usize;
            u16::from_le_bytes([self.mem[addr], self.mem[addr + 1]])
        }

        fn read32(&mut self, addr: u32, _kind: AccessKind) -> u32 {
            self.word(addr)
        }

        fn write8(&mut self, addr: u32, value: u8, _kind: AccessKind) {
            self.mem[addr as usize] = value;
        }

        fn write16(&mut self, addr: u32, value: u16, _kind: AccessKind) {
            self.mem[addr as usize..addr as usize + 2].copy_from_slice(&value.to_le_bytes());
        }

        fn write32(&mut self, addr: u32, value: u32, _kind: AccessKind) {
            self.mem[addr as usize..addr as usize + 4].copy_from_slice(&value.to_le_bytes());
        }

        fn pending_interrupt(&self) -> bool {
            false
        }
    }

    fn run(cpu: &mut Cpu, bus: &mut RamBus, steps: usize) {
        for _ in 0..steps {
            while cpu.step(bus).unwrap() == StepOutcome::Stalled {}
        }
    }

    fn cpu_with(words: &[u32]) -> (Cpu, RamBus) {
        let mut bus = RamBus::new(0x1000);
        bus.load_words(0, words);
        (Cpu::new(CoreVariant::Arm7), bus)
    }

    #[test]
    fn adds_sets_all_four_flags_at_the_signed_boundary() {
        // mov r0, #0x7F000000 ; adds r0, r0, r0
        let (mut cpu, mut bus) = cpu_with(&[0xE3A0_047F, 0xE090_0000]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.reg(0), 0xFE00_0000);
        let psr = cpu.cpsr();
        assert!(psr.negative());
        assert!(!psr.zero());
        assert!(!psr.carry());
        assert!(psr.overflow(), "positive plus positive went negative");
    }

    #[test]
    fn logical_ops_take_carry_from_the_shifter() {
        // movs r0, #0x80000000 (0x02 ror 2): carry from bit 31
        let (mut cpu, mut bus) = cpu_with(&[0xE3B0_0102]);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(0), 0x8000_0000);
        assert!(cpu.cpsr().carry());
        assert!(cpu.cpsr().negative());
    }

    #[test]
    fn exception_return_restores_the_banked_status_word() {
        let (mut cpu, mut bus) = cpu_with(&[0xE1B0_F00E]); // movs pc, lr
        let mut spsr = Psr::reset(Mode::User);
        spsr.set_irq_disabled(false);
        spsr.set_fiq_disabled(false);
        cpu.regs.set_spsr(spsr);
        cpu.set_reg(LR, 0x80);
        cpu.set_reg(PC, 0);

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.cpsr().mode(), Some(Mode::User));
        assert!(!cpu.cpsr().irq_disabled());
        assert_eq!(cpu.reg(PC), 0x80);
    }

    #[rstest]
    #[case(0, 0xAABB_CCDD)]
    #[case(1, 0xDDAA_BBCC)]
    #[case(2, 0xCCDD_AABB)]
    #[case(3, 0xBBCC_DDAA)]
    fn word_load_rotates_by_each_alignment(#[case] offset: u32, #[case] expected: u32) {
        // ldr r0, [r1] with r1 = 0x100 + offset
        let (mut cpu, mut bus) = cpu_with(&[0xE591_0000]);
        bus.load_words(0x100, &[0xAABB_CCDD]);
        cpu.set_reg(1, 0x100 + offset);
        cpu.set_reg(PC, 0);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(0), expected);
    }

    #[test]
    fn load_into_the_base_beats_writeback() {
        // ldr r1, [r1], #4
        let (mut cpu, mut bus) = cpu_with(&[0xE491_1004]);
        bus.load_words(0x200, &[0x1234_5678]);
        cpu.set_reg(1, 0x200);
        cpu.set_reg(PC, 0);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(1), 0x1234_5678);
    }

    #[test]
    fn store_of_the_pc_reads_twelve_ahead() {
        // str pc, [r1]
        let (mut cpu, mut bus) = cpu_with(&[0xE581_F000]);
        cpu.set_reg(1, 0x300);
        cpu.set_reg(PC, 0);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(bus.word(0x300), 12);
    }

    #[test]
    fn block_load_of_the_base_suppresses_writeback() {
        // ldmia r0!, {r0, r1}
        let (mut cpu, mut bus) = cpu_with(&[0xE8B0_0003]);
        bus.load_words(0x400, &[0x1111, 0x2222]);
        cpu.set_reg(0, 0x400);
        cpu.set_reg(PC, 0);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(0), 0x1111, "loaded value wins over writeback");
        assert_eq!(cpu.reg(1), 0x2222);
    }

    #[test]
    fn descending_store_lays_registers_out_ascending() {
        // stmfd sp!, {r0, r1, lr}
        let (mut cpu, mut bus) = cpu_with(&[0xE92D_4003]);
        cpu.set_reg(0, 0xA);
        cpu.set_reg(1, 0xB);
        cpu.set_reg(LR, 0xC);
        cpu.set_reg(SP, 0x500);
        cpu.set_reg(PC, 0);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(SP), 0x500 - 12);
        assert_eq!(bus.word(0x4F4), 0xA);
        assert_eq!(bus.word(0x4F8), 0xB);
        assert_eq!(bus.word(0x4FC), 0xC);
    }

    #[test]
    fn user_bank_store_reaches_user_registers_from_supervisor() {
        // Write a recognizable user SP, then stmia r0, {sp}^ from
        // supervisor mode.
        let (mut cpu, mut bus) = cpu_with(&[0xE8C0_2000]);
        let mut psr = cpu.cpsr();
        psr.set_mode(Mode::User);
        cpu.set_cpsr(psr).unwrap();
        cpu.set_reg(SP, 0xBEEF);
        let mut psr = cpu.cpsr();
        psr.set_mode(Mode::Supervisor);
        cpu.set_cpsr(psr).unwrap();
        cpu.set_reg(SP, 0x1000);
        cpu.set_reg(0, 0x600);
        cpu.set_reg(PC, 0);

        run(&mut cpu, &mut bus, 1);
        assert_eq!(bus.word(0x600), 0xBEEF);
    }

    #[test]
    fn branch_link_records_the_following_instruction() {
        let (mut cpu, mut bus) = cpu_with(&[0xEB00_0010]); // bl +0x40
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(LR), 4);
        assert_eq!(cpu.reg(PC), 8 + 0x40);
    }

    #[test]
    fn swap_is_a_paired_read_and_write() {
        // swp r0, r2, [r1]
        let (mut cpu, mut bus) = cpu_with(&[0xE101_0092]);
        bus.load_words(0x700, &[0xAAAA]);
        cpu.set_reg(1, 0x700);
        cpu.set_reg(2, 0xBBBB);
        cpu.set_reg(PC, 0);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(0), 0xAAAA);
        assert_eq!(bus.word(0x700), 0xBBBB);
    }

    #[test]
    fn msr_from_user_mode_only_reaches_the_flags() {
        // msr cpsr_fc, r0 attempting to re-enter supervisor
        let (mut cpu, mut bus) = cpu_with(&[0xE129_F000]);
        let mut psr = cpu.cpsr();
        psr.set_mode(Mode::User);
        cpu.set_cpsr(psr).unwrap();
        let target = Psr::reset(Mode::Supervisor).bits() | 0xF000_0000;
        cpu.set_reg(0, target);
        cpu.set_reg(PC, 0);

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.cpsr().mode(), Some(Mode::User), "mode field was ignored");
        assert!(cpu.cpsr().negative(), "flag byte went through");
    }

    #[test]
    fn coprocessor_access_fails_on_the_restricted_core() {
        // mrc p15, 0, r0, c0, c0, 0
        let (mut cpu, mut bus) = cpu_with(&[0xEE10_0F10]);
        let err = cpu.step(&mut bus).unwrap_err();
        assert!(matches!(
            err,
            crate::fault::CoreError::CoprocessorMismatch { coprocessor: 15 }
        ));
    }

    #[test]
    fn coprocessor_roundtrip_on_the_privileged_core() {
        let mut bus = RamBus::new(0x1000);
        // mcr p15, 0, r0, c6, c2, 0 ; mrc p15, 0, r1, c6, c2, 0
        bus.load_words(0, &[0xEE06_0F12, 0xEE16_1F12]);
        let mut cpu = Cpu::new(CoreVariant::Arm9);
        cpu.set_reg(0, 0x1234_5678);
        cpu.set_reg(PC, 0);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.reg(1), 0x1234_5678);
    }

    #[test]
    fn undefined_encodings_advance_without_error() {
        let (mut cpu, mut bus) = cpu_with(&[0xE7F0_00F0, 0xE3A0_0001]);
        assert_eq!(cpu.step(&mut bus).unwrap(), StepOutcome::Executed);
        assert_eq!(cpu.reg(PC), 4);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.reg(0), 1);
    }

    #[test]
    fn out_of_scope_encodings_surface_as_errors() {
        let (mut cpu, mut bus) = cpu_with(&[0xEC10_0F10]); // ldc
        let err = cpu.step(&mut bus).unwrap_err();
        assert!(matches!(
            err,
            crate::fault::CoreError::Unimplemented { .. }
        ));
    }
}
