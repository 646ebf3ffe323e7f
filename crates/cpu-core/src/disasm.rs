//! Diagnostic disassembly.
//!
//! Pure text rendering on top of the decoders: no CPU or bus state is
//! consulted, so the same word always prints the same way. The `address`
//! parameter only resolves PC-relative targets into absolute ones.

use std::fmt::Write;

use crate::alu::ShiftKind;
use crate::condition::Condition;
use crate::decode::arm::{
    self, ArmInstr, HalfwordMulKind, HalfwordOffset, HalfwordOp, Operand2, RegisterShift,
    ShiftBy, TransferOffset,
};
use crate::decode::thumb::{
    self, AddSubOperand, HiRegisterKind, ImmediateOp, ThumbInstr,
};
use crate::state::{LR, PC, SP};

fn reg(index: usize) -> &'static str {
    const NAMES: [&str; 16] = [
        "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp",
        "lr", "pc",
    ];
    NAMES[index & 0xF]
}

fn shifted(shift: RegisterShift) -> String {
    match (shift.kind, shift.by) {
        (ShiftKind::Lsl, ShiftBy::Immediate(0)) => reg(shift.reg).to_owned(),
        (ShiftKind::Ror, ShiftBy::Immediate(0)) => format!("{}, rrx", reg(shift.reg)),
        (kind, ShiftBy::Immediate(amount)) => {
            // LSR/ASR encode a 32-bit shift as zero.
            let amount = if amount == 0 { 32 } else { u32::from(amount) };
            format!("{}, {} #{amount}", reg(shift.reg), kind.mnemonic())
        }
        (kind, ShiftBy::Register(rs)) => {
            format!("{}, {} {}", reg(shift.reg), kind.mnemonic(), reg(rs))
        }
    }
}

fn operand2(operand: Operand2) -> String {
    match operand {
        Operand2::Immediate { value, rotate } => {
            format!("#{:#x}", (u32::from(value)).rotate_right(u32::from(rotate) * 2))
        }
        Operand2::Shifted(shift) => shifted(shift),
    }
}

fn list_of(list: u16) -> String {
    let mut out = String::from("{");
    let mut first = true;
    for index in 0..16 {
        if list & 1 << index != 0 {
            if !first {
                out.push_str(", ");
            }
            out.push_str(reg(index));
            first = false;
        }
    }
    out.push('}');
    out
}

fn psr_fields(spsr: bool, mask: u8) -> String {
    let mut out = String::from(if spsr { "spsr" } else { "cpsr" });
    if mask != 0b1111 {
        out.push('_');
        for (bit, name) in [(0b1000, 'f'), (0b0100, 's'), (0b0010, 'x'), (0b0001, 'c')] {
            if mask & bit != 0 {
                out.push(name);
            }
        }
    }
    out
}

/// Renders one wide instruction fetched from `address`.
#[must_use]
pub fn arm(word: u32, address: u32) -> String {
    let (cond, instr) = arm::decode(word);
    let c = cond.suffix();
    let pipeline = address.wrapping_add(8);
    match instr {
        ArmInstr::DataProcessing {
            op,
            set_flags,
            rn,
            rd,
            operand,
        } => {
            let s = if set_flags && !op.is_comparison() { "s" } else { "" };
            let m = op.mnemonic();
            let op2 = operand2(operand);
            if op.is_comparison() {
                format!("{m}{c} {}, {op2}", reg(rn))
            } else if op.uses_rn() {
                format!("{m}{c}{s} {}, {}, {op2}", reg(rd), reg(rn))
            } else {
                format!("{m}{c}{s} {}, {op2}", reg(rd))
            }
        }
        ArmInstr::Mrs { spsr, rd } => {
            format!("mrs{c} {}, {}", reg(rd), if spsr { "spsr" } else { "cpsr" })
        }
        ArmInstr::Msr {
            spsr,
            mask,
            operand,
        } => format!("msr{c} {}, {}", psr_fields(spsr, mask), operand2(operand)),
        ArmInstr::Multiply {
            accumulate,
            set_flags,
            rd,
            rn,
            rs,
            rm,
        } => {
            let s = if set_flags { "s" } else { "" };
            if accumulate {
                format!("mla{c}{s} {}, {}, {}, {}", reg(rd), reg(rm), reg(rs), reg(rn))
            } else {
                format!("mul{c}{s} {}, {}, {}", reg(rd), reg(rm), reg(rs))
            }
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
            let prefix = if signed { "s" } else { "u" };
            let base = if accumulate { "mlal" } else { "mull" };
            let s = if set_flags { "s" } else { "" };
            format!(
                "{prefix}{base}{c}{s} {}, {}, {}, {}",
                reg(rd_lo),
                reg(rd_hi),
                reg(rm),
                reg(rs)
            )
        }
        ArmInstr::HalfwordMultiply {
            kind,
            rd,
            rn,
            rs,
            rm,
            x,
            y,
        } => {
            let xs = if x { "t" } else { "b" };
            let ys = if y { "t" } else { "b" };
            match kind {
                HalfwordMulKind::Smla => format!(
                    "smla{xs}{ys}{c} {}, {}, {}, {}",
                    reg(rd),
                    reg(rm),
                    reg(rs),
                    reg(rn)
                ),
                HalfwordMulKind::Smlaw => format!(
                    "smlaw{ys}{c} {}, {}, {}, {}",
                    reg(rd),
                    reg(rm),
                    reg(rs),
                    reg(rn)
                ),
                HalfwordMulKind::Smulw => {
                    format!("smulw{ys}{c} {}, {}, {}", reg(rd), reg(rm), reg(rs))
                }
                HalfwordMulKind::Smul => {
                    format!("smul{xs}{ys}{c} {}, {}, {}", reg(rd), reg(rm), reg(rs))
                }
            }
        }
        ArmInstr::Swap { byte, rn, rd, rm } => {
            let b = if byte { "b" } else { "" };
            format!("swp{c}{b} {}, {}, [{}]", reg(rd), reg(rm), reg(rn))
        }
        ArmInstr::SingleTransfer {
            load,
            byte,
            pre,
            add,
            writeback,
            translate,
            rn,
            rd,
            offset,
        } => {
            let m = if load { "ldr" } else { "str" };
            let b = if byte { "b" } else { "" };
            let t = if translate { "t" } else { "" };
            let sign = if add { "" } else { "-" };
            let offset = match offset {
                TransferOffset::Immediate(0) => String::new(),
                TransferOffset::Immediate(imm) => format!("#{sign}{imm:#x}"),
                TransferOffset::Register(shift) => format!("{sign}{}", shifted(shift)),
            };
            format_indexed(
                &format!("{m}{c}{b}{t}"),
                rd,
                rn,
                &offset,
                pre,
                pre && writeback,
            )
        }
        ArmInstr::HalfwordTransfer {
            op,
            pre,
            add,
            writeback,
            rn,
            rd,
            offset,
        } => {
            let m = match op {
                HalfwordOp::LoadHalf => "ldrh",
                HalfwordOp::StoreHalf => "strh",
                HalfwordOp::LoadSignedByte => "ldrsb",
                HalfwordOp::LoadSignedHalf => "ldrsh",
            };
            let sign = if add { "" } else { "-" };
            let offset = match offset {
                HalfwordOffset::Immediate(0) => String::new(),
                HalfwordOffset::Immediate(imm) => format!("#{sign}{imm:#x}"),
                HalfwordOffset::Register(ro) => format!("{sign}{}", reg(ro)),
            };
            let (base, suffix) = m.split_at(3);
            format_indexed(
                &format!("{base}{c}{suffix}"),
                rd,
                rn,
                &offset,
                pre,
                pre && writeback,
            )
        }
        ArmInstr::BlockTransfer {
            load,
            pre,
            add,
            writeback,
            user_bank,
            rn,
            list,
        } => {
            let m = if load { "ldm" } else { "stm" };
            let dir = match (add, pre) {
                (true, false) => "ia",
                (true, true) => "ib",
                (false, false) => "da",
                (false, true) => "db",
            };
            let wb = if writeback { "!" } else { "" };
            let hat = if user_bank { "^" } else { "" };
            format!("{m}{c}{dir} {}{wb}, {}{hat}", reg(rn), list_of(list))
        }
        ArmInstr::Branch { link, offset } => {
            let l = if link { "l" } else { "" };
            format!("b{l}{c} {:#010x}", pipeline.wrapping_add_signed(offset))
        }
        ArmInstr::BranchExchange { link, rm } => {
            let l = if link { "l" } else { "" };
            format!("b{l}x{c} {}", reg(rm))
        }
        ArmInstr::BranchLinkExchangeImm { offset } => {
            format!("blx {:#010x}", pipeline.wrapping_add_signed(offset))
        }
        ArmInstr::CoprocessorTransfer {
            load,
            cp,
            op1,
            rd,
            cn,
            cm,
            op2,
        } => {
            let m = if load { "mrc" } else { "mcr" };
            format!(
                "{m}{c} p{cp}, {op1}, {}, c{cn}, c{cm}, {op2}",
                reg(rd)
            )
        }
        ArmInstr::SoftwareInterrupt { comment } => format!("swi{c} {comment:#x}"),
        ArmInstr::Undefined { word } | ArmInstr::Unimplemented { word, .. } => {
            format!("undefined {word:#010x}")
        }
    }
}

fn format_indexed(
    mnemonic: &str,
    rd: usize,
    rn: usize,
    offset: &str,
    pre: bool,
    writeback: bool,
) -> String {
    let mut out = format!("{mnemonic} {}, [{}", reg(rd), reg(rn));
    if pre {
        if !offset.is_empty() {
            let _ = write!(out, ", {offset}");
        }
        out.push(']');
        if writeback {
            out.push('!');
        }
    } else {
        out.push(']');
        if !offset.is_empty() {
            let _ = write!(out, ", {offset}");
        }
    }
    out
}

/// Renders one compact instruction fetched from `address`.
#[must_use]
pub fn thumb(half: u16, address: u32) -> String {
    let instr = thumb::decode(half);
    let pipeline = address.wrapping_add(4);
    match instr {
        ThumbInstr::MoveShifted {
            kind,
            amount,
            rs,
            rd,
        } => format!("{} {}, {}, #{amount}", kind.mnemonic(), reg(rd), reg(rs)),
        ThumbInstr::AddSub {
            sub,
            operand,
            rs,
            rd,
        } => {
            let m = if sub { "sub" } else { "add" };
            match operand {
                AddSubOperand::Register(ro) => {
                    format!("{m} {}, {}, {}", reg(rd), reg(rs), reg(ro))
                }
                AddSubOperand::Immediate(imm) => {
                    format!("{m} {}, {}, #{imm}", reg(rd), reg(rs))
                }
            }
        }
        ThumbInstr::AluImmediate { op, rd, imm } => {
            let m = match op {
                ImmediateOp::Mov => "mov",
                ImmediateOp::Cmp => "cmp",
                ImmediateOp::Add => "add",
                ImmediateOp::Sub => "sub",
            };
            format!("{m} {}, #{imm:#x}", reg(rd))
        }
        ThumbInstr::AluRegister { op, rs, rd } => {
            format!("{} {}, {}", op.mnemonic(), reg(rd), reg(rs))
        }
        ThumbInstr::HiRegister { op, rs, rd } => match op {
            HiRegisterKind::Add => format!("add {}, {}", reg(rd), reg(rs)),
            HiRegisterKind::Cmp => format!("cmp {}, {}", reg(rd), reg(rs)),
            HiRegisterKind::Mov => format!("mov {}, {}", reg(rd), reg(rs)),
            HiRegisterKind::Bx => format!("bx {}", reg(rs)),
            HiRegisterKind::Blx => format!("blx {}", reg(rs)),
        },
        ThumbInstr::PcRelativeLoad { rd, offset } => {
            let target = (pipeline & !3).wrapping_add(u32::from(offset));
            format!("ldr {}, [pc, #{offset:#x}] ; {target:#010x}", reg(rd))
        }
        ThumbInstr::RegOffsetTransfer {
            load,
            byte,
            ro,
            rb,
            rd,
        } => {
            let m = if load { "ldr" } else { "str" };
            let b = if byte { "b" } else { "" };
            format!("{m}{b} {}, [{}, {}]", reg(rd), reg(rb), reg(ro))
        }
        ThumbInstr::SignExtendedTransfer { op, ro, rb, rd } => {
            let m = match op {
                HalfwordOp::StoreHalf => "strh",
                HalfwordOp::LoadHalf => "ldrh",
                HalfwordOp::LoadSignedByte => "ldrsb",
                HalfwordOp::LoadSignedHalf => "ldrsh",
            };
            format!("{m} {}, [{}, {}]", reg(rd), reg(rb), reg(ro))
        }
        ThumbInstr::ImmOffsetTransfer {
            load,
            byte,
            offset,
            rb,
            rd,
        } => {
            let m = if load { "ldr" } else { "str" };
            let b = if byte { "b" } else { "" };
            format!("{m}{b} {}, [{}, #{offset:#x}]", reg(rd), reg(rb))
        }
        ThumbInstr::HalfwordTransfer {
            load,
            offset,
            rb,
            rd,
        } => {
            let m = if load { "ldrh" } else { "strh" };
            format!("{m} {}, [{}, #{offset:#x}]", reg(rd), reg(rb))
        }
        ThumbInstr::SpRelativeTransfer { load, rd, offset } => {
            let m = if load { "ldr" } else { "str" };
            format!("{m} {}, [sp, #{offset:#x}]", reg(rd))
        }
        ThumbInstr::LoadAddress { sp, rd, offset } => {
            let base = if sp { reg(SP) } else { reg(PC) };
            format!("add {}, {base}, #{offset:#x}", reg(rd))
        }
        ThumbInstr::AdjustStackPointer { offset } => format!("add sp, #{offset}"),
        ThumbInstr::PushPop { pop, link, list } => {
            let mut names = list_of(u16::from(list));
            if link {
                let extra = if pop { reg(PC) } else { reg(LR) };
                if list == 0 {
                    names = format!("{{{extra}}}");
                } else {
                    names.truncate(names.len() - 1);
                    let _ = write!(names, ", {extra}}}");
                }
            }
            format!("{} {names}", if pop { "pop" } else { "push" })
        }
        ThumbInstr::MultipleTransfer { load, rb, list } => {
            let m = if load { "ldmia" } else { "stmia" };
            format!("{m} {}!, {}", reg(rb), list_of(u16::from(list)))
        }
        ThumbInstr::ConditionalBranch { condition, offset } => {
            let suffix = if condition == Condition::Always {
                "al"
            } else {
                condition.suffix()
            };
            format!("b{suffix} {:#010x}", pipeline.wrapping_add_signed(offset))
        }
        ThumbInstr::SoftwareInterrupt { comment } => format!("swi {comment:#x}"),
        ThumbInstr::Branch { offset } => {
            format!("b {:#010x}", pipeline.wrapping_add_signed(offset))
        }
        ThumbInstr::LongBranchPrefix { offset } => {
            format!("bl.hi {:#010x}", pipeline.wrapping_add_signed(offset))
        }
        ThumbInstr::LongBranchSuffix { offset, exchange } => {
            let m = if exchange { "blx.lo" } else { "bl.lo" };
            format!("{m} lr+{offset:#x}")
        }
        ThumbInstr::Undefined { half } => format!("undefined {half:#06x}"),
    }
}
