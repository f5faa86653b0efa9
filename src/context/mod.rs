//! Context module - what a handler sees about the caller.
//!
//! Provides:
//! - [`GasMeter`] - finite or infinite resource accounting
//! - [`ExecutionContext`] - the host's per-step context
//! - [`ControllerContext`] - background or active context passed to handlers
//! - [`ContextSlot`] / [`ContextGuard`] - scoped installation of the current context

mod execution;
mod meter;
mod slot;

pub use execution::{ControllerContext, ExecutionContext};
pub use meter::GasMeter;
pub use slot::{ContextGuard, ContextSlot};
