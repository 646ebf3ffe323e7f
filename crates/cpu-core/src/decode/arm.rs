//! Decoder for the wide 32-bit encoding.

#![allow(missing_docs)]

use crate::condition::Condition;
use crate::alu::ShiftKind;
use crate::fault::UnimplementedKind;

/// The sixteen data-processing operations, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl AluOp {
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            _ => Self::Mvn,
        }
    }

    /// Comparison operations discard their result and always set flags.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }

    /// Whether the first source register participates.
    #[must_use]
    pub const fn uses_rn(self) -> bool {
        !matches!(self, Self::Mov | Self::Mvn)
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Eor => "eor",
            Self::Sub => "sub",
            Self::Rsb => "rsb",
            Self::Add => "add",
            Self::Adc => "adc",
            Self::Sbc => "sbc",
            Self::Rsc => "rsc",
            Self::Tst => "tst",
            Self::Teq => "teq",
            Self::Cmp => "cmp",
            Self::Cmn => "cmn",
            Self::Orr => "orr",
            Self::Mov => "mov",
            Self::Bic => "bic",
            Self::Mvn => "mvn",
        }
    }
}

/// Shift amount source inside a register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ShiftBy {
    /// Fixed amount 0..=31; zero selects the encoding's special case.
    Immediate(u8),
    /// Low byte of the named register.
    Register(usize),
}

/// A register operand run through the barrel shifter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterShift {
    pub reg: usize,
    pub kind: ShiftKind,
    pub by: ShiftBy,
}

/// Second operand of a data-processing or status-transfer instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operand2 {
    /// 8-bit immediate rotated right by twice the rotate field.
    Immediate { value: u8, rotate: u8 },
    Shifted(RegisterShift),
}

impl Operand2 {
    const fn from_word(word: u32) -> Self {
        if word & 1 << 25 != 0 {
            Self::Immediate {
                value: word as u8,
                rotate: (word >> 8 & 0xF) as u8,
            }
        } else {
            Self::Shifted(RegisterShift::from_word(word))
        }
    }
}

impl RegisterShift {
    const fn from_word(word: u32) -> Self {
        let kind = ShiftKind::from_bits(word >> 5);
        let by = if word & 1 << 4 != 0 {
            ShiftBy::Register((word >> 8 & 0xF) as usize)
        } else {
            ShiftBy::Immediate((word >> 7 & 0x1F) as u8)
        };
        Self {
            reg: (word & 0xF) as usize,
            kind,
            by,
        }
    }
}

/// Offset of a word/byte transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TransferOffset {
    Immediate(u16),
    Register(RegisterShift),
}

/// Offset of a halfword or signed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HalfwordOffset {
    Immediate(u8),
    Register(usize),
}

/// The four halfword/signed transfer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HalfwordOp {
    LoadHalf,
    StoreHalf,
    LoadSignedByte,
    LoadSignedHalf,
}

/// Halfword-operand multiply family of the newer core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HalfwordMulKind {
    /// 16 x 16 + 32 accumulate.
    Smla,
    /// 32 x 16 high half + 32 accumulate.
    Smlaw,
    /// 32 x 16 high half.
    Smulw,
    /// 16 x 16.
    Smul,
}

/// A decoded wide instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ArmInstr {
    DataProcessing {
        op: AluOp,
        set_flags: bool,
        rn: usize,
        rd: usize,
        operand: Operand2,
    },
    /// Status register to general register.
    Mrs { spsr: bool, rd: usize },
    /// General register or immediate to status register, under a field mask.
    Msr {
        spsr: bool,
        /// Field mask, bit 3 = flags byte down to bit 0 = control byte.
        mask: u8,
        operand: Operand2,
    },
    Multiply {
        accumulate: bool,
        set_flags: bool,
        rd: usize,
        rn: usize,
        rs: usize,
        rm: usize,
    },
    MultiplyLong {
        signed: bool,
        accumulate: bool,
        set_flags: bool,
        rd_hi: usize,
        rd_lo: usize,
        rs: usize,
        rm: usize,
    },
    HalfwordMultiply {
        kind: HalfwordMulKind,
        rd: usize,
        rn: usize,
        rs: usize,
        rm: usize,
        /// Low (false) or high (true) half of `rm`.
        x: bool,
        /// Low (false) or high (true) half of `rs`.
        y: bool,
    },
    /// Atomic register/memory exchange.
    Swap {
        byte: bool,
        rn: usize,
        rd: usize,
        rm: usize,
    },
    SingleTransfer {
        load: bool,
        byte: bool,
        /// Index before (true) or after (false) the access.
        pre: bool,
        add: bool,
        writeback: bool,
        /// Post-indexed form with the writeback bit: unprivileged access.
        translate: bool,
        rn: usize,
        rd: usize,
        offset: TransferOffset,
    },
    HalfwordTransfer {
        op: HalfwordOp,
        pre: bool,
        add: bool,
        writeback: bool,
        rn: usize,
        rd: usize,
        offset: HalfwordOffset,
    },
    BlockTransfer {
        load: bool,
        pre: bool,
        add: bool,
        writeback: bool,
        /// S bit: user-bank transfer or status restore on loads with PC.
        user_bank: bool,
        rn: usize,
        /// Register list, bit n = Rn.
        list: u16,
    },
    Branch {
        link: bool,
        /// Byte offset relative to the pipeline-adjusted PC.
        offset: i32,
    },
    BranchExchange { link: bool, rm: usize },
    /// The encoding-switching immediate call living in the unconditional
    /// space.
    BranchLinkExchangeImm {
        /// Byte offset relative to the pipeline-adjusted PC, halfword
        /// target bit already folded in.
        offset: i32,
    },
    /// Coprocessor register move in either direction.
    CoprocessorTransfer {
        load: bool,
        cp: u8,
        op1: u8,
        rd: usize,
        cn: u32,
        cm: u32,
        op2: u32,
    },
    SoftwareInterrupt { comment: u32 },
    /// Architecturally undefined or unpredictable encoding.
    Undefined { word: u32 },
    /// Recognized encoding outside the interpreter's scope.
    Unimplemented { word: u32, kind: UnimplementedKind },
}

/// Decodes a fetched word into its condition and instruction.
///
/// Total: every 32-bit word decodes to something, if only to
/// [`ArmInstr::Undefined`].
#[must_use]
pub fn decode(word: u32) -> (Condition, ArmInstr) {
    let cond_bits = (word >> 28) as u8;
    if cond_bits == 0xF {
        // The unconditional extension space. Only the immediate form of the
        // encoding-switching call is in scope.
        let instr = if word >> 25 & 0b111 == 0b101 {
            let mut offset = sign_extend_24(word) << 2;
            if word & 1 << 24 != 0 {
                offset += 2;
            }
            ArmInstr::BranchLinkExchangeImm { offset }
        } else {
            ArmInstr::Undefined { word }
        };
        return (Condition::Always, instr);
    }
    (Condition::from_bits(cond_bits), decode_conditional(word))
}

fn decode_conditional(word: u32) -> ArmInstr {
    match word >> 25 & 0b111 {
        0b000 => {
            if word & 0x90 == 0x90 {
                if word & 0x60 == 0 {
                    decode_multiply_or_swap(word)
                } else {
                    decode_halfword_transfer(word)
                }
            } else if word >> 23 & 0x1F == 0b00010 && word & 1 << 20 == 0 {
                decode_control(word)
            } else {
                data_processing(word)
            }
        }
        0b001 => {
            if word >> 23 & 3 == 0b10 && word & 1 << 20 == 0 {
                // Control space with an immediate operand: only the status
                // write exists here.
                if word & 1 << 21 != 0 && word >> 12 & 0xF == 0xF {
                    ArmInstr::Msr {
                        spsr: word & 1 << 22 != 0,
                        mask: (word >> 16 & 0xF) as u8,
                        operand: Operand2::from_word(word | 1 << 25),
                    }
                } else {
                    ArmInstr::Undefined { word }
                }
            } else {
                data_processing(word)
            }
        }
        0b010 | 0b011 => {
            if word & 1 << 25 != 0 && word & 1 << 4 != 0 {
                return ArmInstr::Undefined { word };
            }
            let pre = word & 1 << 24 != 0;
            let writeback_bit = word & 1 << 21 != 0;
            let offset = if word & 1 << 25 != 0 {
                TransferOffset::Register(RegisterShift::from_word(word))
            } else {
                TransferOffset::Immediate((word & 0xFFF) as u16)
            };
            ArmInstr::SingleTransfer {
                load: word & 1 << 20 != 0,
                byte: word & 1 << 22 != 0,
                pre,
                add: word & 1 << 23 != 0,
                writeback: !pre || writeback_bit,
                translate: !pre && writeback_bit,
                rn: (word >> 16 & 0xF) as usize,
                rd: (word >> 12 & 0xF) as usize,
                offset,
            }
        }
        0b100 => ArmInstr::BlockTransfer {
            load: word & 1 << 20 != 0,
            pre: word & 1 << 24 != 0,
            add: word & 1 << 23 != 0,
            writeback: word & 1 << 21 != 0,
            user_bank: word & 1 << 22 != 0,
            rn: (word >> 16 & 0xF) as usize,
            list: word as u16,
        },
        0b101 => ArmInstr::Branch {
            link: word & 1 << 24 != 0,
            offset: sign_extend_24(word) << 2,
        },
        0b110 => ArmInstr::Unimplemented {
            word,
            kind: UnimplementedKind::CoprocessorData,
        },
        _ => {
            if word & 1 << 24 != 0 {
                ArmInstr::SoftwareInterrupt {
                    comment: word & 0x00FF_FFFF,
                }
            } else if word & 1 << 4 != 0 {
                ArmInstr::CoprocessorTransfer {
                    load: word & 1 << 20 != 0,
                    cp: (word >> 8 & 0xF) as u8,
                    op1: (word >> 21 & 0x7) as u8,
                    rd: (word >> 12 & 0xF) as usize,
                    cn: word >> 16 & 0xF,
                    cm: word & 0xF,
                    op2: word >> 5 & 0x7,
                }
            } else {
                ArmInstr::Unimplemented {
                    word,
                    kind: UnimplementedKind::CoprocessorData,
                }
            }
        }
    }
}

const fn data_processing(word: u32) -> ArmInstr {
    ArmInstr::DataProcessing {
        op: AluOp::from_bits(word >> 21),
        set_flags: word & 1 << 20 != 0,
        rn: (word >> 16 & 0xF) as usize,
        rd: (word >> 12 & 0xF) as usize,
        operand: Operand2::from_word(word),
    }
}

fn decode_multiply_or_swap(word: u32) -> ArmInstr {
    let rd_or_hi = (word >> 16 & 0xF) as usize;
    let rn_or_lo = (word >> 12 & 0xF) as usize;
    let rs = (word >> 8 & 0xF) as usize;
    let rm = (word & 0xF) as usize;
    if word & 0x0FC0_0000 == 0 {
        ArmInstr::Multiply {
            accumulate: word & 1 << 21 != 0,
            set_flags: word & 1 << 20 != 0,
            rd: rd_or_hi,
            rn: rn_or_lo,
            rs,
            rm,
        }
    } else if word >> 23 & 0x1F == 0b00001 {
        ArmInstr::MultiplyLong {
            signed: word & 1 << 22 != 0,
            accumulate: word & 1 << 21 != 0,
            set_flags: word & 1 << 20 != 0,
            rd_hi: rd_or_hi,
            rd_lo: rn_or_lo,
            rs,
            rm,
        }
    } else if word & 0x0FB0_0F00 == 0x0100_0000 {
        ArmInstr::Swap {
            byte: word & 1 << 22 != 0,
            rn: rd_or_hi,
            rd: rn_or_lo,
            rm,
        }
    } else {
        ArmInstr::Undefined { word }
    }
}

fn decode_halfword_transfer(word: u32) -> ArmInstr {
    let load = word & 1 << 20 != 0;
    let op = match (load, word >> 5 & 0b11) {
        (false, 0b01) => HalfwordOp::StoreHalf,
        (true, 0b01) => HalfwordOp::LoadHalf,
        (true, 0b10) => HalfwordOp::LoadSignedByte,
        (true, 0b11) => HalfwordOp::LoadSignedHalf,
        // Stores with the sign bits are the doubleword pair transfers of
        // the newer core.
        _ => {
            return ArmInstr::Unimplemented {
                word,
                kind: UnimplementedKind::DoublewordTransfer,
            }
        }
    };
    let pre = word & 1 << 24 != 0;
    let offset = if word & 1 << 22 != 0 {
        HalfwordOffset::Immediate((word >> 4 & 0xF0 | word & 0xF) as u8)
    } else {
        HalfwordOffset::Register((word & 0xF) as usize)
    };
    ArmInstr::HalfwordTransfer {
        op,
        pre,
        add: word & 1 << 23 != 0,
        writeback: !pre || word & 1 << 21 != 0,
        rn: (word >> 16 & 0xF) as usize,
        rd: (word >> 12 & 0xF) as usize,
        offset,
    }
}

/// The data-processing hole where the comparison opcodes sit with the flag
/// bit clear: status moves, register branches, saturating arithmetic, and
/// the halfword multiplies.
fn decode_control(word: u32) -> ArmInstr {
    if word & 0x0FBF_0FFF == 0x010F_0000 {
        return ArmInstr::Mrs {
            spsr: word & 1 << 22 != 0,
            rd: (word >> 12 & 0xF) as usize,
        };
    }
    if word & 0x0FB0_FFF0 == 0x0120_F000 {
        return ArmInstr::Msr {
            spsr: word & 1 << 22 != 0,
            mask: (word >> 16 & 0xF) as u8,
            operand: Operand2::Shifted(RegisterShift {
                reg: (word & 0xF) as usize,
                kind: ShiftKind::Lsl,
                by: ShiftBy::Immediate(0),
            }),
        };
    }
    if word & 0x0FFF_FFD0 == 0x012F_FF10 {
        return ArmInstr::BranchExchange {
            link: word & 1 << 5 != 0,
            rm: (word & 0xF) as usize,
        };
    }
    if word & 0x0F90_0FF0 == 0x0100_0050 {
        return ArmInstr::Unimplemented {
            word,
            kind: UnimplementedKind::SaturatingArithmetic,
        };
    }
    if word & 0x0F90_0090 == 0x0100_0080 {
        let rd = (word >> 16 & 0xF) as usize;
        let rn = (word >> 12 & 0xF) as usize;
        let rs = (word >> 8 & 0xF) as usize;
        let rm = (word & 0xF) as usize;
        let x = word & 1 << 5 != 0;
        let y = word & 1 << 6 != 0;
        let kind = match word >> 21 & 0b11 {
            0b00 => HalfwordMulKind::Smla,
            0b01 if !x => HalfwordMulKind::Smlaw,
            0b01 => HalfwordMulKind::Smulw,
            0b10 => {
                return ArmInstr::Unimplemented {
                    word,
                    kind: UnimplementedKind::HalfwordMultiplyLong,
                }
            }
            _ => HalfwordMulKind::Smul,
        };
        return ArmInstr::HalfwordMultiply {
            kind,
            rd,
            rn,
            rs,
            rm,
            x,
            y,
        };
    }
    ArmInstr::Undefined { word }
}

const fn sign_extend_24(word: u32) -> i32 {
    (word << 8) as i32 >> 8
}
