//! Execution of the compact 16-bit encoding.

use crate::alu;
use crate::bus::{AccessKind, Bus};
use crate::cpu::{CoreVariant, Cpu};
use crate::decode::arm::HalfwordOp;
use crate::decode::thumb::{
    AddSubOperand, HiRegisterKind, ImmediateOp, ThumbAluOp, ThumbInstr,
};
use crate::exception::Exception;
use crate::exec;
use crate::fault::CoreError;
use crate::state::{LR, PC, SP};

/// Executes one decoded compact instruction (conditional branches arrive
/// here only when their condition passed).
///
/// The PC holds the instruction address plus four throughout.
pub(crate) fn execute(
    cpu: &mut Cpu,
    bus: &mut dyn Bus,
    instr: &ThumbInstr,
) -> Result<(), CoreError> {
    match *instr {
        ThumbInstr::MoveShifted {
            kind,
            amount,
            rs,
            rd,
        } => {
            let carry_in = cpu.regs.cpsr().carry();
            let (value, carry) =
                alu::shift_by_immediate(kind, cpu.regs.read(rs), amount, carry_in);
            cpu.regs.write(rd, value);
            exec::set_nzc(cpu, value, carry);
            Ok(())
        }
        ThumbInstr::AddSub {
            sub,
            operand,
            rs,
            rd,
        } => {
            let a = cpu.regs.read(rs);
            let b = match operand {
                AddSubOperand::Register(ro) => cpu.regs.read(ro),
                AddSubOperand::Immediate(imm) => u32::from(imm),
            };
            let result = if sub { alu::sub(a, b) } else { alu::add(a, b) };
            cpu.regs.write(rd, result.value);
            exec::set_nzcv(cpu, result);
            Ok(())
        }
        ThumbInstr::AluImmediate { op, rd, imm } => {
            let a = cpu.regs.read(rd);
            let b = u32::from(imm);
            match op {
                ImmediateOp::Mov => {
                    cpu.regs.write(rd, b);
                    exec::set_nz(cpu, b);
                }
                ImmediateOp::Cmp => exec::set_nzcv(cpu, alu::sub(a, b)),
                ImmediateOp::Add => {
                    let result = alu::add(a, b);
                    cpu.regs.write(rd, result.value);
                    exec::set_nzcv(cpu, result);
                }
                ImmediateOp::Sub => {
                    let result = alu::sub(a, b);
                    cpu.regs.write(rd, result.value);
                    exec::set_nzcv(cpu, result);
                }
            }
            Ok(())
        }
        ThumbInstr::AluRegister { op, rs, rd } => {
            alu_register(cpu, op, rs, rd);
            Ok(())
        }
        ThumbInstr::HiRegister { op, rs, rd } => hi_register(cpu, op, rs, rd, instr),
        ThumbInstr::PcRelativeLoad { rd, offset } => {
            let address = (cpu.regs.read(PC) & !3).wrapping_add(u32::from(offset));
            let value = bus.read32(address, AccessKind::DataNonSequential);
            cpu.regs.write(rd, value);
            Ok(())
        }
        ThumbInstr::RegOffsetTransfer {
            load,
            byte,
            ro,
            rb,
            rd,
        } => {
            let address = cpu.regs.read(rb).wrapping_add(cpu.regs.read(ro));
            transfer(cpu, bus, load, byte, address, rd);
            Ok(())
        }
        ThumbInstr::SignExtendedTransfer { op, ro, rb, rd } => {
            let address = cpu.regs.read(rb).wrapping_add(cpu.regs.read(ro));
            match op {
                HalfwordOp::StoreHalf => {
                    let value = cpu.regs.read(rd) as u16;
                    bus.write16(address & !1, value, AccessKind::DataNonSequential);
                }
                HalfwordOp::LoadHalf => {
                    let value = bus.read16(address & !1, AccessKind::DataNonSequential);
                    cpu.regs.write(rd, u32::from(value));
                }
                HalfwordOp::LoadSignedByte => {
                    let value = bus.read8(address, AccessKind::DataNonSequential) as i8;
                    cpu.regs.write(rd, value as u32);
                }
                HalfwordOp::LoadSignedHalf => {
                    let value = bus.read16(address & !1, AccessKind::DataNonSequential) as i16;
                    cpu.regs.write(rd, value as u32);
                }
            }
            Ok(())
        }
        ThumbInstr::ImmOffsetTransfer {
            load,
            byte,
            offset,
            rb,
            rd,
        } => {
            let address = cpu.regs.read(rb).wrapping_add(u32::from(offset));
            transfer(cpu, bus, load, byte, address, rd);
            Ok(())
        }
        ThumbInstr::HalfwordTransfer {
            load,
            offset,
            rb,
            rd,
        } => {
            let address = cpu.regs.read(rb).wrapping_add(u32::from(offset)) & !1;
            if load {
                let value = bus.read16(address, AccessKind::DataNonSequential);
                cpu.regs.write(rd, u32::from(value));
            } else {
                bus.write16(address, cpu.regs.read(rd) as u16, AccessKind::DataNonSequential);
            }
            Ok(())
        }
        ThumbInstr::SpRelativeTransfer { load, rd, offset } => {
            let address = cpu.regs.read(SP).wrapping_add(u32::from(offset));
            transfer(cpu, bus, load, false, address, rd);
            Ok(())
        }
        ThumbInstr::LoadAddress { sp, rd, offset } => {
            let base = if sp {
                cpu.regs.read(SP)
            } else {
                cpu.regs.read(PC) & !3
            };
            cpu.regs.write(rd, base.wrapping_add(u32::from(offset)));
            Ok(())
        }
        ThumbInstr::AdjustStackPointer { offset } => {
            let sp = cpu.regs.read(SP).wrapping_add_signed(i32::from(offset));
            cpu.regs.write(SP, sp);
            Ok(())
        }
        ThumbInstr::PushPop { pop, link, list } => push_pop(cpu, bus, pop, link, list),
        ThumbInstr::MultipleTransfer { load, rb, list } => {
            multiple_transfer(cpu, bus, load, rb, list);
            Ok(())
        }
        ThumbInstr::ConditionalBranch { offset, .. } | ThumbInstr::Branch { offset } => {
            let target = cpu.regs.read(PC).wrapping_add_signed(offset);
            cpu.regs.write(PC, target);
            Ok(())
        }
        ThumbInstr::SoftwareInterrupt { comment } => {
            let pipeline = cpu.regs.read(PC);
            log::trace!("swi {comment:#x}");
            cpu.enter_exception(Exception::SoftwareInterrupt, pipeline.wrapping_sub(2))
        }
        ThumbInstr::LongBranchPrefix { offset } => {
            let pipeline = cpu.regs.read(PC);
            cpu.regs.write(LR, pipeline.wrapping_add_signed(offset));
            // The pair executes back to back; stage the suffix halfword so
            // the next fetch cannot observe a stale bus.
            let suffix_addr = pipeline.wrapping_sub(2);
            cpu.prefetched = Some(bus.read16(suffix_addr & !1, AccessKind::InstructionSequential));
            Ok(())
        }
        ThumbInstr::LongBranchSuffix { offset, exchange } => {
            if exchange && cpu.variant == CoreVariant::Arm7 {
                return undefined(cpu, instr);
            }
            let pipeline = cpu.regs.read(PC);
            let target = cpu.regs.read(LR).wrapping_add(u32::from(offset));
            cpu.regs.write(LR, pipeline.wrapping_sub(2) | 1);
            if exchange {
                let mut psr = cpu.regs.cpsr();
                psr.set_thumb(false);
                cpu.regs.set_cpsr_flags(psr);
                cpu.regs.write(PC, target & !3);
            } else {
                cpu.regs.write(PC, target & !1);
            }
            Ok(())
        }
        ThumbInstr::Undefined { .. } => undefined(cpu, instr),
    }
}

fn undefined(cpu: &Cpu, instr: &ThumbInstr) -> Result<(), CoreError> {
    let at = cpu.regs.read(PC).wrapping_sub(4);
    log::warn!("undefined instruction {instr:02x?} at {at:#010x}");
    Ok(())
}

/// Word or byte load/store shared by several formats. Word loads honor the
/// misaligned rotation rule.
fn transfer(cpu: &mut Cpu, bus: &mut dyn Bus, load: bool, byte: bool, address: u32, rd: usize) {
    if load {
        let value = if byte {
            u32::from(bus.read8(address, AccessKind::DataNonSequential))
        } else {
            exec::read_word_rotated(bus, address, AccessKind::DataNonSequential)
        };
        cpu.regs.write(rd, value);
    } else {
        let value = cpu.regs.read(rd);
        if byte {
            bus.write8(address, value as u8, AccessKind::DataNonSequential);
        } else {
            bus.write32(address & !3, value, AccessKind::DataNonSequential);
        }
    }
}

fn alu_register(cpu: &mut Cpu, op: ThumbAluOp, rs: usize, rd: usize) {
    let a = cpu.regs.read(rd);
    let b = cpu.regs.read(rs);
    let carry_in = cpu.regs.cpsr().carry();
    match op {
        ThumbAluOp::And => write_logical(cpu, rd, a & b),
        ThumbAluOp::Eor => write_logical(cpu, rd, a ^ b),
        ThumbAluOp::Orr => write_logical(cpu, rd, a | b),
        ThumbAluOp::Bic => write_logical(cpu, rd, a & !b),
        ThumbAluOp::Mvn => write_logical(cpu, rd, !b),
        ThumbAluOp::Lsl | ThumbAluOp::Lsr | ThumbAluOp::Asr | ThumbAluOp::Ror => {
            let kind = match op {
                ThumbAluOp::Lsl => alu::ShiftKind::Lsl,
                ThumbAluOp::Lsr => alu::ShiftKind::Lsr,
                ThumbAluOp::Asr => alu::ShiftKind::Asr,
                _ => alu::ShiftKind::Ror,
            };
            let (value, carry) = alu::shift_by_register(kind, a, b, carry_in);
            cpu.regs.write(rd, value);
            exec::set_nzc(cpu, value, carry);
        }
        ThumbAluOp::Adc => {
            let result = alu::adc(a, b, carry_in);
            cpu.regs.write(rd, result.value);
            exec::set_nzcv(cpu, result);
        }
        ThumbAluOp::Sbc => {
            let result = alu::sbc(a, b, carry_in);
            cpu.regs.write(rd, result.value);
            exec::set_nzcv(cpu, result);
        }
        ThumbAluOp::Tst => exec::set_nz(cpu, a & b),
        ThumbAluOp::Neg => {
            let result = alu::sub(0, b);
            cpu.regs.write(rd, result.value);
            exec::set_nzcv(cpu, result);
        }
        ThumbAluOp::Cmp => exec::set_nzcv(cpu, alu::sub(a, b)),
        ThumbAluOp::Cmn => exec::set_nzcv(cpu, alu::add(a, b)),
        ThumbAluOp::Mul => {
            let value = a.wrapping_mul(b);
            cpu.regs.write(rd, value);
            let mut psr = cpu.regs.cpsr();
            psr.set_nz(value);
            if cpu.variant == CoreVariant::Arm7 {
                psr.set_carry(false);
            }
            cpu.regs.set_cpsr_flags(psr);
        }
    }
}

fn write_logical(cpu: &mut Cpu, rd: usize, value: u32) {
    cpu.regs.write(rd, value);
    exec::set_nz(cpu, value);
}

fn hi_register(
    cpu: &mut Cpu,
    op: HiRegisterKind,
    rs: usize,
    rd: usize,
    instr: &ThumbInstr,
) -> Result<(), CoreError> {
    let b = cpu.regs.read(rs);
    match op {
        HiRegisterKind::Add => {
            let value = cpu.regs.read(rd).wrapping_add(b);
            // High-register adds and moves leave the flags alone.
            if rd == PC {
                cpu.regs.write(PC, value & !1);
            } else {
                cpu.regs.write(rd, value);
            }
        }
        HiRegisterKind::Cmp => exec::set_nzcv(cpu, alu::sub(cpu.regs.read(rd), b)),
        HiRegisterKind::Mov => {
            if rd == PC {
                cpu.regs.write(PC, b & !1);
            } else {
                cpu.regs.write(rd, b);
            }
        }
        HiRegisterKind::Bx => exchange(cpu, b),
        HiRegisterKind::Blx => {
            if cpu.variant == CoreVariant::Arm7 {
                return undefined(cpu, instr);
            }
            let pipeline = cpu.regs.read(PC);
            cpu.regs.write(LR, pipeline.wrapping_sub(2) | 1);
            exchange(cpu, b);
        }
    }
    Ok(())
}

/// Register branch: bit 0 of the target selects the encoding.
fn exchange(cpu: &mut Cpu, target: u32) {
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
}

fn push_pop(
    cpu: &mut Cpu,
    bus: &mut dyn Bus,
    pop: bool,
    link: bool,
    list: u8,
) -> Result<(), CoreError> {
    let count = u32::from(list.count_ones()) + u32::from(link);
    let mut kind = AccessKind::DataNonSequential;
    if pop {
        let mut address = cpu.regs.read(SP);
        for index in 0..8 {
            if list & 1 << index == 0 {
                continue;
            }
            let value = bus.read32(address & !3, kind);
            kind = AccessKind::DataSequential;
            cpu.regs.write(index, value);
            address = address.wrapping_add(4);
        }
        cpu.regs.write(SP, cpu.regs.read(SP).wrapping_add(count * 4));
        if link {
            let value = bus.read32(address & !3, kind);
            // The newer core interworks on a popped PC; the older one
            // stays in the compact encoding.
            if cpu.variant == CoreVariant::Arm9 && value & 1 == 0 {
                exchange(cpu, value);
            } else {
                cpu.regs.write(PC, value & !1);
            }
        }
    } else {
        let mut address = cpu.regs.read(SP).wrapping_sub(count * 4);
        cpu.regs.write(SP, address);
        for index in 0..8 {
            if list & 1 << index == 0 {
                continue;
            }
            bus.write32(address & !3, cpu.regs.read(index), kind);
            kind = AccessKind::DataSequential;
            address = address.wrapping_add(4);
        }
        if link {
            bus.write32(address & !3, cpu.regs.read(LR), kind);
        }
    }
    Ok(())
}

fn multiple_transfer(cpu: &mut Cpu, bus: &mut dyn Bus, load: bool, rb: usize, list: u8) {
    let base = cpu.regs.read(rb);
    let count = u32::from(list.count_ones());
    let mut address = base;
    let mut kind = AccessKind::DataNonSequential;
    for index in 0..8 {
        if list & 1 << index == 0 {
            continue;
        }
        if load {
            let value = bus.read32(address & !3, kind);
            cpu.regs.write(index, value);
        } else {
            bus.write32(address & !3, cpu.regs.read(index), kind);
        }
        kind = AccessKind::DataSequential;
        address = address.wrapping_add(4);
    }
    // A base reloaded by the list keeps its loaded value.
    if !(load && list & 1 << rb != 0) {
        cpu.regs.write(rb, base.wrapping_add(count * 4));
    }
}
