//! Decoder for the compact 16-bit encoding.

#![allow(missing_docs)]

use crate::alu::ShiftKind;
use crate::condition::Condition;
use crate::decode::arm::HalfwordOp;

/// The sixteen register-to-register operations of the compact encoding's
/// ALU format, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ThumbAluOp {
    And,
    Eor,
    Lsl,
    Lsr,
    Asr,
    Adc,
    Sbc,
    Ror,
    Tst,
    Neg,
    Cmp,
    Cmn,
    Orr,
    Mul,
    Bic,
    Mvn,
}

impl ThumbAluOp {
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Lsl,
            0x3 => Self::Lsr,
            0x4 => Self::Asr,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Ror,
            0x8 => Self::Tst,
            0x9 => Self::Neg,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mul,
            0xE => Self::Bic,
            _ => Self::Mvn,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Eor => "eor",
            Self::Lsl => "lsl",
            Self::Lsr => "lsr",
            Self::Asr => "asr",
            Self::Adc => "adc",
            Self::Sbc => "sbc",
            Self::Ror => "ror",
            Self::Tst => "tst",
            Self::Neg => "neg",
            Self::Cmp => "cmp",
            Self::Cmn => "cmn",
            Self::Orr => "orr",
            Self::Mul => "mul",
            Self::Bic => "bic",
            Self::Mvn => "mvn",
        }
    }
}

/// Second operand of the three-register add/subtract format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddSubOperand {
    Register(usize),
    Immediate(u8),
}

/// Move/compare/add/subtract with an 8-bit immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ImmediateOp {
    Mov,
    Cmp,
    Add,
    Sub,
}

/// High-register operations and register branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HiRegisterKind {
    Add,
    Cmp,
    Mov,
    Bx,
    Blx,
}

/// A decoded compact instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ThumbInstr {
    /// Shift by immediate into a low register; always sets flags.
    MoveShifted {
        kind: ShiftKind,
        amount: u8,
        rs: usize,
        rd: usize,
    },
    /// Three-operand add/subtract; always sets flags.
    AddSub {
        sub: bool,
        operand: AddSubOperand,
        rs: usize,
        rd: usize,
    },
    /// 8-bit immediate move/compare/add/subtract; always sets flags.
    AluImmediate {
        op: ImmediateOp,
        rd: usize,
        imm: u8,
    },
    /// Two-register ALU operation; always sets flags.
    AluRegister {
        op: ThumbAluOp,
        rs: usize,
        rd: usize,
    },
    /// The only format reaching the high registers. Add and Mov here do
    /// not touch the flags.
    HiRegister {
        op: HiRegisterKind,
        rs: usize,
        rd: usize,
    },
    /// Word load relative to the word-aligned PC; `offset` is in bytes.
    PcRelativeLoad { rd: usize, offset: u16 },
    RegOffsetTransfer {
        load: bool,
        byte: bool,
        ro: usize,
        rb: usize,
        rd: usize,
    },
    SignExtendedTransfer {
        op: HalfwordOp,
        ro: usize,
        rb: usize,
        rd: usize,
    },
    /// Word/byte transfer with a scaled immediate; `offset` is in bytes.
    ImmOffsetTransfer {
        load: bool,
        byte: bool,
        offset: u8,
        rb: usize,
        rd: usize,
    },
    /// Halfword transfer; `offset` is in bytes.
    HalfwordTransfer {
        load: bool,
        offset: u8,
        rb: usize,
        rd: usize,
    },
    /// Word transfer relative to the stack pointer; `offset` is in bytes.
    SpRelativeTransfer {
        load: bool,
        rd: usize,
        offset: u16,
    },
    /// Address of a word offset from the word-aligned PC or the SP.
    LoadAddress {
        sp: bool,
        rd: usize,
        offset: u16,
    },
    /// Signed byte adjustment of the stack pointer.
    AdjustStackPointer { offset: i16 },
    /// Push with optional LR, pop with optional PC; low-register list.
    PushPop {
        pop: bool,
        link: bool,
        list: u8,
    },
    MultipleTransfer {
        load: bool,
        rb: usize,
        list: u8,
    },
    ConditionalBranch {
        condition: Condition,
        /// Byte offset relative to the pipeline-adjusted PC.
        offset: i32,
    },
    SoftwareInterrupt { comment: u8 },
    Branch { offset: i32 },
    /// First half of the long call idiom: stages the target's upper bits
    /// in LR.
    LongBranchPrefix { offset: i32 },
    /// Second half: completes the call, optionally switching to the wide
    /// encoding.
    LongBranchSuffix { offset: u16, exchange: bool },
    Undefined { half: u16 },
}

/// Decodes a fetched halfword. Total over all 16-bit values.
#[must_use]
pub fn decode(half: u16) -> ThumbInstr {
    let rd = (half & 0x7) as usize;
    let rs = (half >> 3 & 0x7) as usize;
    match half >> 13 {
        0b000 => {
            if half >> 11 & 0b11 == 0b11 {
                let operand = if half & 1 << 10 != 0 {
                    AddSubOperand::Immediate((half >> 6 & 0x7) as u8)
                } else {
                    AddSubOperand::Register((half >> 6 & 0x7) as usize)
                };
                ThumbInstr::AddSub {
                    sub: half & 1 << 9 != 0,
                    operand,
                    rs,
                    rd,
                }
            } else {
                ThumbInstr::MoveShifted {
                    kind: ShiftKind::from_bits(u32::from(half >> 11)),
                    amount: (half >> 6 & 0x1F) as u8,
                    rs,
                    rd,
                }
            }
        }
        0b001 => {
            let op = match half >> 11 & 0b11 {
                0b00 => ImmediateOp::Mov,
                0b01 => ImmediateOp::Cmp,
                0b10 => ImmediateOp::Add,
                _ => ImmediateOp::Sub,
            };
            ThumbInstr::AluImmediate {
                op,
                rd: (half >> 8 & 0x7) as usize,
                imm: half as u8,
            }
        }
        0b010 => decode_group_010(half, rs, rd),
        0b011 => {
            let byte = half & 1 << 12 != 0;
            let offset5 = (half >> 6 & 0x1F) as u8;
            ThumbInstr::ImmOffsetTransfer {
                load: half & 1 << 11 != 0,
                byte,
                offset: if byte { offset5 } else { offset5 << 2 },
                rb: rs,
                rd,
            }
        }
        0b100 => {
            if half & 1 << 12 == 0 {
                ThumbInstr::HalfwordTransfer {
                    load: half & 1 << 11 != 0,
                    offset: ((half >> 6 & 0x1F) << 1) as u8,
                    rb: rs,
                    rd,
                }
            } else {
                ThumbInstr::SpRelativeTransfer {
                    load: half & 1 << 11 != 0,
                    rd: (half >> 8 & 0x7) as usize,
                    offset: (half & 0xFF) << 2,
                }
            }
        }
        0b101 => {
            if half & 1 << 12 == 0 {
                ThumbInstr::LoadAddress {
                    sp: half & 1 << 11 != 0,
                    rd: (half >> 8 & 0x7) as usize,
                    offset: (half & 0xFF) << 2,
                }
            } else {
                decode_misc(half)
            }
        }
        0b110 => {
            if half & 1 << 12 == 0 {
                ThumbInstr::MultipleTransfer {
                    load: half & 1 << 11 != 0,
                    rb: (half >> 8 & 0x7) as usize,
                    list: half as u8,
                }
            } else {
                match half >> 8 & 0xF {
                    0xE => ThumbInstr::Undefined { half },
                    0xF => ThumbInstr::SoftwareInterrupt { comment: half as u8 },
                    bits => ThumbInstr::ConditionalBranch {
                        condition: Condition::from_bits(bits as u8),
                        offset: i32::from(half as u8 as i8) << 1,
                    },
                }
            }
        }
        _ => {
            let offset11 = sign_extend_11(half);
            match half >> 11 & 0b11 {
                0b00 => ThumbInstr::Branch {
                    offset: offset11 << 1,
                },
                0b01 => {
                    // Exchange suffix: bit 0 must read as zero.
                    if half & 1 == 0 {
                        ThumbInstr::LongBranchSuffix {
                            offset: (half & 0x7FF) << 1,
                            exchange: true,
                        }
                    } else {
                        ThumbInstr::Undefined { half }
                    }
                }
                0b10 => ThumbInstr::LongBranchPrefix {
                    offset: offset11 << 12,
                },
                _ => ThumbInstr::LongBranchSuffix {
                    offset: (half & 0x7FF) << 1,
                    exchange: false,
                },
            }
        }
    }
}

fn decode_group_010(half: u16, rs: usize, rd: usize) -> ThumbInstr {
    match half >> 10 & 0b111 {
        0b000 => ThumbInstr::AluRegister {
            op: ThumbAluOp::from_bits(half >> 6),
            rs,
            rd,
        },
        0b001 => {
            // Operands widen to four bits through the H flags.
            let rs_full = (half >> 3 & 0xF) as usize;
            let rd_full = rd | ((half >> 7 & 1) << 3) as usize;
            let op = match (half >> 8 & 0b11, half >> 7 & 1) {
                (0b00, _) => HiRegisterKind::Add,
                (0b01, _) => HiRegisterKind::Cmp,
                (0b10, _) => HiRegisterKind::Mov,
                (_, 0) => HiRegisterKind::Bx,
                _ => HiRegisterKind::Blx,
            };
            ThumbInstr::HiRegister {
                op,
                rs: rs_full,
                rd: rd_full,
            }
        }
        0b010 | 0b011 => ThumbInstr::PcRelativeLoad {
            rd: (half >> 8 & 0x7) as usize,
            offset: (half & 0xFF) << 2,
        },
        _ => {
            let ro = (half >> 6 & 0x7) as usize;
            if half & 1 << 9 == 0 {
                ThumbInstr::RegOffsetTransfer {
                    load: half & 1 << 11 != 0,
                    byte: half & 1 << 10 != 0,
                    ro,
                    rb: rs,
                    rd,
                }
            } else {
                let op = match half >> 10 & 0b11 {
                    0b00 => HalfwordOp::StoreHalf,
                    0b01 => HalfwordOp::LoadSignedByte,
                    0b10 => HalfwordOp::LoadHalf,
                    _ => HalfwordOp::LoadSignedHalf,
                };
                ThumbInstr::SignExtendedTransfer {
                    op,
                    ro,
                    rb: rs,
                    rd,
                }
            }
        }
    }
}

fn decode_misc(half: u16) -> ThumbInstr {
    match half >> 9 & 0b11 {
        0b00 if half >> 8 & 1 == 0 => {
            let magnitude = ((half & 0x7F) as i16) << 2;
            ThumbInstr::AdjustStackPointer {
                offset: if half & 1 << 7 != 0 {
                    -magnitude
                } else {
                    magnitude
                },
            }
        }
        0b10 => ThumbInstr::PushPop {
            pop: half & 1 << 11 != 0,
            link: half & 1 << 8 != 0,
            list: half as u8,
        },
        _ => ThumbInstr::Undefined { half },
    }
}

const fn sign_extend_11(half: u16) -> i32 {
    ((half as i32) << 21) >> 21
}
