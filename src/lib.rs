//! # vmport
//!
//! Named string ports between a host runtime and an embedded VM co-process.
//!
//! Host subsystems register string-in/string-out handlers under a name; the
//! VM addresses them by small integer handles. Every handler runs behind a
//! panic guard, and receives the context of the host step that triggered
//! the call.
//!
//! ## Architecture
//!
//! - **Ports** ([`port`]): name/handle registry and protected handlers
//! - **Context** ([`context`]): gas-metered execution context and the
//!   scoped slot that carries it into handler calls
//! - **Controller** ([`Controller`]): composition root owning both
//!
//! Everything here is single-threaded. The registry and the context slot are
//! `!Sync` and expect the host to drive them from its one state-machine
//! thread.
//!
//! ## Example
//!
//! ```
//! use vmport::Controller;
//!
//! let controller = Controller::builder()
//!     .handle("echo", |_ctx, req| Ok(req.to_string()))
//!     .build();
//!
//! let port = controller.get_port("echo");
//! assert_eq!(controller.call(port, "hi").unwrap(), "hi");
//! ```

pub mod codec;
pub mod context;
pub mod error;
pub mod port;

mod controller;

pub use controller::{Controller, ControllerBuilder};
pub use error::PortError;
pub use port::{PortHandle, PortHandler, PortRegistry};
