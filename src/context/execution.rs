//! Execution contexts handed to port handlers.

use std::cell::Cell;
use std::rc::Rc;

use super::GasMeter;
use crate::error::Result;

/// Context of one host processing step, supplied by the caller.
///
/// Cloning is cheap and clones share the gas meter and the cancellation
/// flag, so a handler charging gas through its copy is visible to the host.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    chain_id: String,
    block_height: u64,
    gas_meter: Rc<GasMeter>,
    cancelled: Rc<Cell<bool>>,
}

impl ExecutionContext {
    /// Create a context with an infinite gas meter.
    pub fn new(chain_id: impl Into<String>, block_height: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            block_height,
            gas_meter: Rc::new(GasMeter::infinite()),
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    /// Derive a context that charges `meter` instead of the current one.
    ///
    /// The cancellation flag stays shared with `self`.
    pub fn with_gas_meter(&self, meter: GasMeter) -> Self {
        Self {
            chain_id: self.chain_id.clone(),
            block_height: self.block_height,
            gas_meter: Rc::new(meter),
            cancelled: self.cancelled.clone(),
        }
    }

    #[inline]
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    #[inline]
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    #[inline]
    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas_meter
    }

    /// Ask handlers running under this context to stop early.
    ///
    /// Nothing enforces this; handlers poll [`is_cancelled`](Self::is_cancelled).
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// The context a handler receives for one call.
///
/// `Background` is the empty context used outside of any host step. It has
/// no gas meter, so charging gas against it is a no-op.
#[derive(Debug, Clone, Default)]
pub enum ControllerContext {
    #[default]
    Background,
    Active(ExecutionContext),
}

impl ControllerContext {
    /// The empty background context.
    pub fn background() -> Self {
        ControllerContext::Background
    }

    #[inline]
    pub fn is_background(&self) -> bool {
        matches!(self, ControllerContext::Background)
    }

    /// Get the caller's execution context, if one is active.
    pub fn execution(&self) -> Option<&ExecutionContext> {
        match self {
            ControllerContext::Background => None,
            ControllerContext::Active(exec) => Some(exec),
        }
    }

    /// Get the gas meter, if one is active.
    pub fn gas_meter(&self) -> Option<&GasMeter> {
        self.execution().map(ExecutionContext::gas_meter)
    }

    /// Charge gas against the active meter.
    pub fn consume_gas(&self, amount: u64, descriptor: &str) -> Result<()> {
        match self.gas_meter() {
            Some(meter) => meter.consume(amount, descriptor),
            None => Ok(()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.execution().is_some_and(ExecutionContext::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_has_no_meter() {
        let ctx = ControllerContext::background();

        assert!(ctx.is_background());
        assert!(ctx.execution().is_none());
        assert!(ctx.gas_meter().is_none());
        assert!(!ctx.is_cancelled());
        assert!(ctx.consume_gas(1_000, "noop").is_ok());
    }

    #[test]
    fn test_with_gas_meter_keeps_identity() {
        let exec = ExecutionContext::new("agoric-3", 42).with_gas_meter(GasMeter::finite(5));
        let unmetered = exec.with_gas_meter(GasMeter::infinite());

        assert_eq!(unmetered.chain_id(), "agoric-3");
        assert_eq!(unmetered.block_height(), 42);
        assert!(unmetered.gas_meter().is_infinite());
        assert_eq!(exec.gas_meter().limit(), Some(5));
    }

    #[test]
    fn test_clones_share_meter_and_cancellation() {
        let exec = ExecutionContext::new("test", 1).with_gas_meter(GasMeter::finite(100));
        let ctx = ControllerContext::Active(exec.clone());

        ctx.consume_gas(30, "store").unwrap();
        assert_eq!(exec.gas_meter().consumed(), 30);

        exec.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_derived_context_shares_cancellation() {
        let exec = ExecutionContext::new("test", 1);
        let derived = exec.with_gas_meter(GasMeter::finite(1));

        derived.cancel();
        assert!(exec.is_cancelled());
    }
}
