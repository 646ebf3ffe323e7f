//! Cycle-stepped instruction interpreter for the two ARM-family CPU cores of
//! a dual-core embedded handheld.
//!
//! Both cores execute the same two instruction encodings (a wide 32-bit one
//! and a compact 16-bit one) but differ in privilege surface: the `Arm9`
//! variant carries a system-control coprocessor (CP15, TCM windows, high
//! exception vectors) while the `Arm7` variant does not. Everything outside
//! the interpreter (bus, interrupt controller, scheduler, peripherals) is
//! reached through the [`Bus`] trait and owned by the embedding host.

/// Host-level error taxonomy for invariant violations.
pub mod fault;
pub use fault::{CoreError, UnimplementedKind};

/// External bus and interrupt-line contract.
pub mod bus;
pub use bus::{AccessKind, Bus};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{Mode, Psr, RegisterBank, LR, PC, SP};

/// Condition-code evaluation over the status flags.
pub mod condition;
pub use condition::Condition;

/// Flag-exact ALU arithmetic and the barrel shifter.
pub mod alu;
pub use alu::{AluResult, ShiftKind};

/// System-control coprocessor register space (privileged core only).
pub mod cp15;
pub use cp15::{Cp15, TcmWindow};

/// Exception kinds, vectors, and entry modes.
pub mod exception;
pub use exception::Exception;

/// Pure instruction decoders for both encodings.
pub mod decode;

/// Instruction execution semantics for both encodings.
pub(crate) mod exec;

/// Diagnostic disassembly printers for both encodings.
pub mod disasm;

/// Per-cycle driver composing decode, execute, and exception entry.
pub mod cpu;
pub use cpu::{CoreVariant, Cpu, StepOutcome};
