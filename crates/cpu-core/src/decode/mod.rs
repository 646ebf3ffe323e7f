//! Pure instruction decoders.
//!
//! Decoding never touches CPU or bus state: a fetched word (or halfword)
//! goes in, a tagged instruction comes out. Encodings the hardware treats
//! as undefined decode to an explicit `Undefined` variant rather than an
//! error, because the core takes them as ordinary input; encodings outside
//! the interpreter's scope decode to `Unimplemented` and surface as a
//! [`crate::CoreError`] when executed.

pub mod arm;
pub mod thumb;

pub use arm::{
    AluOp, ArmInstr, HalfwordMulKind, HalfwordOffset, HalfwordOp, Operand2, RegisterShift,
    ShiftBy, TransferOffset,
};
pub use thumb::{AddSubOperand, HiRegisterKind, ImmediateOp, ThumbAluOp, ThumbInstr};
