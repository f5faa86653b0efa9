//! Controller builder and call surface.
//!
//! The [`Controller`] is the host's composition root for ports: it owns one
//! [`PortRegistry`] and one [`ContextSlot`]. The host wraps each processing
//! step in [`Controller::enter`], and calls coming in from the VM during that
//! step reach handlers with the step's context (unmetered).
//!
//! # Example
//!
//! ```
//! use vmport::context::{ExecutionContext, GasMeter};
//! use vmport::Controller;
//!
//! let mut controller = Controller::builder()
//!     .handle("echo", |_ctx, req| Ok(req.to_string()))
//!     .build();
//!
//! let echo = controller.get_port("echo");
//! assert_eq!(echo.get(), 1);
//!
//! let exec = ExecutionContext::new("agoric-3", 100).with_gas_meter(GasMeter::finite(10_000));
//! {
//!     let _step = controller.enter(exec);
//!     assert_eq!(controller.call(echo, "hi").unwrap(), "hi");
//! }
//!
//! controller.unregister_port(echo).unwrap();
//! assert!(!controller.get_port("echo").is_valid());
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::{ContextGuard, ContextSlot, ControllerContext, ExecutionContext};
use crate::error::{PortError, Result};
use crate::port::{FnHandler, JsonHandler, PortHandle, PortHandler, PortRegistry, RegistryConfig};

/// Builder for configuring and creating a [`Controller`].
///
/// Ports added here are registered in order when `build()` runs, so the
/// first one gets handle 1.
pub struct ControllerBuilder {
    config: RegistryConfig,
    ports: Vec<(String, Box<dyn PortHandler>)>,
}

impl ControllerBuilder {
    /// Create a new controller builder.
    pub fn new() -> Self {
        Self {
            config: RegistryConfig::default(),
            ports: Vec::new(),
        }
    }

    /// Add a port backed by any [`PortHandler`].
    pub fn port<H>(mut self, name: &str, handler: H) -> Self
    where
        H: PortHandler + 'static,
    {
        self.ports.push((name.to_string(), Box::new(handler)));
        self
    }

    /// Add a port backed by a closure over raw request strings.
    pub fn handle<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&ControllerContext, &str) -> Result<String> + 'static,
    {
        self.port(name, FnHandler::new(handler))
    }

    /// Add a port that speaks JSON on both sides.
    pub fn handle_json<F, Req, Resp>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&ControllerContext, Req) -> Result<Resp> + 'static,
        Req: DeserializeOwned + 'static,
        Resp: Serialize + 'static,
    {
        self.port(name, JsonHandler::new(handler))
    }

    /// Replace the whole registry configuration.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the longest panic message a handler may report.
    ///
    /// Default: 256 bytes
    pub fn max_panic_message_len(mut self, limit: usize) -> Self {
        self.config.max_panic_message_len = limit;
        self
    }

    /// Build the controller and register all ports.
    pub fn build(self) -> Controller {
        let mut registry = PortRegistry::with_config(self.config);
        for (name, handler) in self.ports {
            registry.register(&name, handler);
        }

        Controller {
            registry,
            context: ContextSlot::new(),
        }
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ports plus the context handed to them.
#[derive(Debug, Default)]
pub struct Controller {
    registry: PortRegistry,
    context: ContextSlot,
}

impl Controller {
    /// Create a new controller builder.
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    pub fn registry(&self) -> &PortRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PortRegistry {
        &mut self.registry
    }

    /// Register a port. See [`PortRegistry::register`].
    pub fn register_port<H>(&mut self, name: &str, handler: H) -> PortHandle
    where
        H: PortHandler + 'static,
    {
        self.registry.register(name, handler)
    }

    /// Unregister a port. See [`PortRegistry::unregister`].
    pub fn unregister_port(&mut self, handle: PortHandle) -> Result<()> {
        self.registry.unregister(handle)
    }

    /// Resolve a name, or [`PortHandle::INVALID`] if unknown.
    pub fn get_port(&self, name: &str) -> PortHandle {
        self.registry.get_port(name)
    }

    /// Install the context for one processing step.
    ///
    /// Keep the guard alive until the step ends; dropping it restores the
    /// context that was current before.
    pub fn enter(&self, exec: ExecutionContext) -> ContextGuard<'_> {
        self.context.install(exec)
    }

    /// Get a copy of the context handlers would see right now.
    pub fn current_context(&self) -> ControllerContext {
        self.context.current()
    }

    /// Call a port with the current context.
    pub fn call(&self, handle: PortHandle, request: &str) -> Result<String> {
        let ctx = self.context.current();
        self.registry.dispatch(handle, &ctx, request)
    }

    /// Resolve `name` and call its port with the current context.
    pub fn call_by_name(&self, name: &str, request: &str) -> Result<String> {
        let handle = self
            .registry
            .lookup(name)
            .ok_or_else(|| PortError::UnknownName(name.to_string()))?;

        self.call(handle, request)
    }
}
