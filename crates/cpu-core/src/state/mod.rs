//! Architectural CPU state model primitives.

/// Status-register word and the privilege/banking mode field.
pub mod psr;
/// Register bank with per-mode shadow storage.
pub mod registers;

pub use psr::{Mode, Psr};
pub use registers::{RegisterBank, LR, PC, SP};
