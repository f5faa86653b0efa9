//! Gas metering for handler calls.
//!
//! A [`GasMeter`] is either finite (fails once consumption passes the limit)
//! or infinite (counts consumption but never fails). The controller installs
//! an infinite meter for the duration of a step because it bills its own
//! usage at a coarser granularity.

use std::cell::Cell;

use crate::error::{PortError, Result};

/// Resource accounting for one execution context.
///
/// Consumption is tracked through a `Cell`, so a shared `&GasMeter` can be
/// charged from inside a handler. Not `Sync`.
#[derive(Debug)]
pub struct GasMeter {
    /// `None` means no limit.
    limit: Option<u64>,
    consumed: Cell<u64>,
}

impl GasMeter {
    /// Create a meter that fails once `limit` is exceeded.
    pub fn finite(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: Cell::new(0),
        }
    }

    /// Create a meter without a limit.
    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: Cell::new(0),
        }
    }

    /// Get the limit, or `None` for an infinite meter.
    #[inline]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.limit.is_none()
    }

    /// Gas consumed so far.
    #[inline]
    pub fn consumed(&self) -> u64 {
        self.consumed.get()
    }

    /// Remaining gas, or `None` for an infinite meter.
    pub fn remaining(&self) -> Option<u64> {
        self.limit
            .map(|limit| limit.saturating_sub(self.consumed.get()))
    }

    /// Charge `amount` gas.
    ///
    /// Consumption is recorded even when it overflows the limit, so the
    /// error reports what the caller actually tried to spend.
    pub fn consume(&self, amount: u64, descriptor: &str) -> Result<()> {
        let consumed = self.consumed.get().saturating_add(amount);
        self.consumed.set(consumed);

        match self.limit {
            Some(limit) if consumed > limit => Err(PortError::OutOfGas {
                descriptor: descriptor.to_string(),
                limit,
                consumed,
            }),
            _ => Ok(()),
        }
    }
}
