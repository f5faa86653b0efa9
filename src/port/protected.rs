//! Panic isolation at the port boundary.
//!
//! A [`ProtectedHandler`] runs its inner handler under `catch_unwind` and
//! turns a panic into [`PortError::Panic`]. Only the panic message crosses
//! the boundary, truncated to a configured length; backtraces and payload
//! addresses never do, so the result of a call stays reproducible across
//! nodes.
//!
//! # Panic hook
//!
//! `catch_unwind` does not bypass the process panic hook: each recovered
//! panic still runs it, and with `RUST_BACKTRACE` set the default hook
//! prints a full backtrace to stderr. The hook belongs to the host. A host
//! that wants recovered panics quiet installs its own with
//! [`std::panic::set_hook`] (for example one that logs through `tracing`)
//! before it starts dispatching. This module never touches the hook.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::PortHandler;
use crate::context::ControllerContext;
use crate::error::{PortError, Result};

/// Default upper bound, in bytes, for a rendered panic message.
pub const DEFAULT_MAX_PANIC_MESSAGE_LEN: usize = 256;

/// Rendering used when the panic payload has no known rendering.
const OPAQUE_PANIC_MESSAGE: &str = "non-string panic payload";

/// A handler wrapped so that panics become ordinary errors.
///
/// On the non-panicking path the wrapper returns exactly what the inner
/// handler returned.
#[derive(Debug, Clone)]
pub struct ProtectedHandler<H> {
    inner: H,
    max_message_len: usize,
}

impl<H: PortHandler> ProtectedHandler<H> {
    /// Wrap `inner` with the default message limit.
    pub fn new(inner: H) -> Self {
        Self::with_max_message_len(inner, DEFAULT_MAX_PANIC_MESSAGE_LEN)
    }

    pub fn with_max_message_len(inner: H, max_message_len: usize) -> Self {
        Self {
            inner,
            max_message_len,
        }
    }

    /// Get the wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: PortHandler> PortHandler for ProtectedHandler<H> {
    fn receive(&self, ctx: &ControllerContext, request: &str) -> Result<String> {
        // Handler state is never inspected after a panic.
        match panic::catch_unwind(AssertUnwindSafe(|| self.inner.receive(ctx, request))) {
            Ok(result) => result,
            Err(payload) => {
                let message = render_panic(payload.as_ref(), self.max_message_len);
                tracing::warn!("Recovered panic in port handler: {}", message);
                Err(PortError::Panic(message))
            }
        }
    }
}

/// Render a panic payload as a short string.
///
/// `panic!` produces either a `&'static str` or a `String`. `panic_any`
/// payloads are rendered through `Display` when they are a [`PortError`], a
/// boxed error, or a primitive. Any other type gets a fixed placeholder,
/// never its `Debug` output.
fn render_panic(payload: &(dyn Any + Send), max_len: usize) -> String {
    let mut message =
        render_payload(payload).unwrap_or_else(|| OPAQUE_PANIC_MESSAGE.to_string());
    truncate_on_char_boundary(&mut message, max_len);
    message
}

macro_rules! render_display {
    ($payload:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Some(value) = $payload.downcast_ref::<$ty>() {
                return Some(value.to_string());
            }
        )+
    };
}

fn render_payload(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return Some((*s).to_string());
    }
    render_display!(
        payload,
        String,
        PortError,
        Box<dyn std::error::Error + Send + Sync>,
        Box<dyn std::error::Error + Send>,
        bool,
        char,
        i8,
        i16,
        i32,
        i64,
        i128,
        isize,
        u8,
        u16,
        u32,
        u64,
        u128,
        usize,
    );
    None
}

fn truncate_on_char_boundary(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }

    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
