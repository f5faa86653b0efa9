//! Single-slot holder for the current controller context.
//!
//! The host installs its step context with [`ContextSlot::install`] and keeps
//! the returned [`ContextGuard`] alive for the whole step. Dropping the guard
//! (on any exit path, including `?` and unwinding) removes exactly the context
//! it installed. The current context is always the most recent install that
//! is still held, so releasing guards out of order never brings a released
//! context back.
//!
//! # Example
//!
//! ```
//! use vmport::context::{ContextSlot, ExecutionContext, GasMeter};
//!
//! let slot = ContextSlot::new();
//! let exec = ExecutionContext::new("agoric-3", 10).with_gas_meter(GasMeter::finite(1_000));
//!
//! {
//!     let _guard = slot.install(exec);
//!     // Handlers see an unmetered context while the guard lives.
//!     assert!(slot.current().gas_meter().unwrap().is_infinite());
//! }
//!
//! assert!(slot.current().is_background());
//! ```

use std::cell::{Cell, RefCell};

use super::{ControllerContext, ExecutionContext, GasMeter};

/// Holder for the context passed to handlers.
///
/// Backed by a `RefCell`, so it is `!Sync`: all access must come from the
/// single thread that drives the host's state machine.
#[derive(Debug, Default)]
pub struct ContextSlot {
    /// Held installs, oldest first, keyed by guard id.
    installed: RefCell<Vec<(u64, ControllerContext)>>,
    next_id: Cell<u64>,
}

impl ContextSlot {
    /// Create a slot holding the background context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the current context.
    pub fn current(&self) -> ControllerContext {
        self.installed
            .borrow()
            .last()
            .map(|(_, ctx)| ctx.clone())
            .unwrap_or_default()
    }

    /// True while some guard is installed.
    pub fn is_active(&self) -> bool {
        !self.installed.borrow().is_empty()
    }

    /// Number of guards currently held.
    pub fn depth(&self) -> usize {
        self.installed.borrow().len()
    }

    /// Install `exec` for the lifetime of the returned guard.
    ///
    /// The installed context carries an infinite gas meter: the caller bills
    /// its own usage, so handlers must not charge it a second time.
    pub fn install(&self, exec: ExecutionContext) -> ContextGuard<'_> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let active = ControllerContext::Active(exec.with_gas_meter(GasMeter::infinite()));
        let mut installed = self.installed.borrow_mut();
        installed.push((id, active));

        tracing::debug!(
            "Installed controller context at height {} (depth {})",
            exec.block_height(),
            installed.len()
        );

        ContextGuard { slot: self, id }
    }

    fn remove(&self, id: u64) {
        let mut installed = self.installed.borrow_mut();
        let Some(pos) = installed.iter().position(|(held, _)| *held == id) else {
            return;
        };

        if pos + 1 != installed.len() {
            tracing::warn!(
                "Controller context released out of order ({} newer install(s) still held)",
                installed.len() - pos - 1
            );
        }
        installed.remove(pos);
        tracing::debug!("Released controller context (depth {})", installed.len());
    }
}

/// Removes its context from the slot when dropped.
#[must_use = "the context is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard<'a> {
    slot: &'a ContextSlot,
    id: u64,
}

impl ContextGuard<'_> {
    /// Release the context now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.slot.remove(self.id);
    }
}
