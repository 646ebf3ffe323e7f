//! Instruction execution.
//!
//! Executors run with the program counter already holding its
//! pipeline-adjusted value (instruction address plus eight in the wide
//! encoding, plus four in the compact one). Any write to the PC or the
//! status register's execution state is picked up by the driver afterwards;
//! executors never advance the PC themselves.

pub(crate) mod arm;
pub(crate) mod thumb;

use crate::alu::AluResult;
use crate::bus::{AccessKind, Bus};
use crate::cpu::Cpu;

/// Word load honoring the misaligned-address rule: the aligned word is
/// fetched and rotated right by eight bits per low address bit.
pub(crate) fn read_word_rotated(bus: &mut dyn Bus, addr: u32, kind: AccessKind) -> u32 {
    bus.read32(addr & !3, kind).rotate_right((addr & 3) * 8)
}

pub(crate) fn set_nz(cpu: &mut Cpu, value: u32) {
    let mut psr = cpu.regs.cpsr();
    psr.set_nz(value);
    cpu.regs.set_cpsr_flags(psr);
}

pub(crate) fn set_nzc(cpu: &mut Cpu, value: u32, carry: bool) {
    let mut psr = cpu.regs.cpsr();
    psr.set_nz(value);
    psr.set_carry(carry);
    cpu.regs.set_cpsr_flags(psr);
}

pub(crate) fn set_nzcv(cpu: &mut Cpu, result: AluResult) {
    let mut psr = cpu.regs.cpsr();
    psr.set_nz(result.value);
    psr.set_carry(result.carry);
    psr.set_overflow(result.overflow);
    cpu.regs.set_cpsr_flags(psr);
}
