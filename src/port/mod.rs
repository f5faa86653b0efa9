//! Port module - named handlers addressed by integer handles.
//!
//! Provides:
//! - [`PortHandler`] - the capability a subsystem exposes
//! - [`ProtectedHandler`] - converts handler panics into errors
//! - [`PortRegistry`] - maps names and handles to protected handlers
//!
//! # Example
//!
//! ```
//! use vmport::context::ControllerContext;
//! use vmport::port::{JsonHandler, PortRegistry};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct Get { key: String }
//!
//! #[derive(Serialize)]
//! struct Value { value: Option<String> }
//!
//! let mut registry = PortRegistry::new();
//! let storage = registry.register(
//!     "storage",
//!     JsonHandler::new(|_ctx: &ControllerContext, req: Get| {
//!         Ok(Value { value: (req.key == "height").then(|| "42".to_string()) })
//!     }),
//! );
//!
//! let ctx = ControllerContext::background();
//! let out = registry.dispatch(storage, &ctx, r#"{"key":"height"}"#).unwrap();
//! assert_eq!(out, r#"{"value":"42"}"#);
//! ```

mod handler;
mod protected;
mod registry;

pub use handler::{FnHandler, JsonHandler, PortHandler};
pub use protected::{ProtectedHandler, DEFAULT_MAX_PANIC_MESSAGE_LEN};
pub use registry::{PortHandle, PortRegistry, RegistryConfig};
