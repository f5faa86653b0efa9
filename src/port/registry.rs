//! Port registry mapping names to handles and handles to handlers.
//!
//! Handles are assigned sequentially starting from 1 and are never reused,
//! even after a port is unregistered. Handle 0 is the invalid sentinel
//! returned by [`PortRegistry::get_port`] for unknown names.
//!
//! # Example
//!
//! ```
//! use vmport::context::ControllerContext;
//! use vmport::port::{PortHandle, PortRegistry};
//!
//! let mut registry = PortRegistry::new();
//!
//! let echo = registry.register_fn("echo", |_ctx, req| Ok(req.to_string()));
//! assert_eq!(echo, PortHandle::new(1));
//! assert_eq!(registry.get_port("echo"), echo);
//!
//! let ctx = ControllerContext::background();
//! assert_eq!(registry.dispatch(echo, &ctx, "hi").unwrap(), "hi");
//!
//! registry.unregister(echo).unwrap();
//! assert_eq!(registry.get_port("echo"), PortHandle::INVALID);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{FnHandler, PortHandler, ProtectedHandler, DEFAULT_MAX_PANIC_MESSAGE_LEN};
use crate::context::ControllerContext;
use crate::error::{PortError, Result};

/// Integer identifier the VM uses to address a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortHandle(u64);

impl PortHandle {
    /// Sentinel for "no such port".
    pub const INVALID: PortHandle = PortHandle(0);

    pub const fn new(value: u64) -> Self {
        PortHandle(value)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PortHandle> for u64 {
    fn from(handle: PortHandle) -> u64 {
        handle.0
    }
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Longest panic message, in bytes, a recovered handler may report.
    pub max_panic_message_len: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_panic_message_len: DEFAULT_MAX_PANIC_MESSAGE_LEN,
        }
    }
}

type RoutedHandler = ProtectedHandler<Box<dyn PortHandler>>;

/// Registry of named ports.
///
/// Keeps three maps consistent: handle to handler, handle to name, and
/// name to handle. Handle-keyed maps are ordered so iteration is
/// deterministic.
pub struct PortRegistry {
    /// Protected handlers by handle.
    handlers: BTreeMap<PortHandle, RoutedHandler>,
    /// Port name by handle.
    names: BTreeMap<PortHandle, String>,
    /// Handle currently bound to each name.
    ports: HashMap<String, PortHandle>,
    /// Last handle issued. Never decremented.
    last_port: u64,
    config: RegistryConfig,
}

impl PortRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            handlers: BTreeMap::new(),
            names: BTreeMap::new(),
            ports: HashMap::new(),
            last_port: 0,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a handler under `name` and return its new handle.
    ///
    /// Never fails. If `name` is already bound, the name now resolves to the
    /// new handle; the old handle stays registered and callable until it is
    /// unregistered. Use [`try_register`](Self::try_register) to reject
    /// duplicates instead.
    pub fn register<H>(&mut self, name: &str, handler: H) -> PortHandle
    where
        H: PortHandler + 'static,
    {
        self.last_port += 1;
        let handle = PortHandle(self.last_port);

        let protected = ProtectedHandler::with_max_message_len(
            Box::new(handler) as Box<dyn PortHandler>,
            self.config.max_panic_message_len,
        );
        self.handlers.insert(handle, protected);
        self.names.insert(handle, name.to_string());

        if let Some(shadowed) = self.ports.insert(name.to_string(), handle) {
            tracing::warn!(
                "Port name {:?} rebound from handle {} to {}",
                name,
                shadowed,
                handle
            );
        } else {
            tracing::debug!("Registered port {:?} as handle {}", name, handle);
        }

        handle
    }

    /// Register a closure handler.
    pub fn register_fn<F>(&mut self, name: &str, handler: F) -> PortHandle
    where
        F: Fn(&ControllerContext, &str) -> Result<String> + 'static,
    {
        self.register(name, FnHandler::new(handler))
    }

    /// Register a handler, failing if `name` is already bound.
    ///
    /// No handle is consumed on failure.
    pub fn try_register<H>(&mut self, name: &str, handler: H) -> Result<PortHandle>
    where
        H: PortHandler + 'static,
    {
        if self.ports.contains_key(name) {
            return Err(PortError::DuplicateName(name.to_string()));
        }
        Ok(self.register(name, handler))
    }

    /// Remove a port.
    ///
    /// Unregistering an unknown handle is a no-op and still succeeds. The
    /// name binding is dropped only if it still points at `handle`, so a
    /// newer port registered under the same name stays reachable.
    pub fn unregister(&mut self, handle: PortHandle) -> Result<()> {
        let removed = self.handlers.remove(&handle).is_some();

        if let Some(name) = self.names.remove(&handle) {
            if self.ports.get(&name) == Some(&handle) {
                self.ports.remove(&name);
            }
            tracing::debug!("Unregistered port {:?} (handle {})", name, handle);
        }

        if !removed {
            tracing::warn!("Unregister of unknown port handle {}", handle);
        }

        Ok(())
    }

    /// Get the handle bound to `name`, or [`PortHandle::INVALID`].
    pub fn get_port(&self, name: &str) -> PortHandle {
        self.lookup(name).unwrap_or(PortHandle::INVALID)
    }

    /// Get the handle bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<PortHandle> {
        self.ports.get(name).copied()
    }

    /// Get the name a handle was registered under.
    pub fn name(&self, handle: PortHandle) -> Option<&str> {
        self.names.get(&handle).map(|s| s.as_str())
    }

    /// Get the protected handler for a handle.
    pub fn handler(&self, handle: PortHandle) -> Option<&dyn PortHandler> {
        self.handlers
            .get(&handle)
            .map(|h| h as &dyn PortHandler)
    }

    pub fn contains(&self, handle: PortHandle) -> bool {
        self.handlers.contains_key(&handle)
    }

    /// Number of registered ports.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered ports in handle order.
    pub fn ports(&self) -> impl Iterator<Item = (PortHandle, &str)> {
        self.names.iter().map(|(handle, name)| (*handle, name.as_str()))
    }

    /// Call the handler for `handle`.
    ///
    /// Panics inside the handler come back as [`PortError::Panic`].
    pub fn dispatch(
        &self,
        handle: PortHandle,
        ctx: &ControllerContext,
        request: &str,
    ) -> Result<String> {
        let handler = self
            .handler(handle)
            .ok_or(PortError::PortNotFound(handle))?;

        handler.receive(ctx, request)
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PortRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortRegistry")
            .field("ports", &self.names)
            .field("last_port", &self.last_port)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(_ctx: &ControllerContext, req: &str) -> Result<String> {
        Ok(req.to_string())
    }

    fn background() -> ControllerContext {
        ControllerContext::background()
    }

    #[test]
    fn test_register_port() {
        let mut registry = PortRegistry::new();

        let handle = registry.register_fn("echo", echo);

        assert_eq!(handle, PortHandle::new(1));
        assert_eq!(registry.get_port("echo"), handle);
        assert_eq!(registry.name(handle), Some("echo"));
        assert!(registry.handler(handle).is_some());
    }

    #[test]
    fn test_handle_assignment_sequential() {
        let mut registry = PortRegistry::new();

        let a = registry.register_fn("a", echo);
        let b = registry.register_fn("b", echo);
        registry.unregister(b).unwrap();
        let c = registry.register_fn("c", echo);
        registry.unregister(a).unwrap();
        let d = registry.register_fn("a", echo);

        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(c.get(), 3);
        assert_eq!(d.get(), 4);
    }

    #[test]
    fn test_dispatch() {
        let mut registry = PortRegistry::new();
        let handle = registry.register_fn("echo", echo);

        assert_eq!(registry.dispatch(handle, &background(), "hi").unwrap(), "hi");
    }

    #[test]
    fn test_dispatch_unknown_handle() {
        let registry = PortRegistry::new();

        let err = registry
            .dispatch(PortHandle::new(99), &background(), "x")
            .unwrap_err();
        assert!(matches!(err, PortError::PortNotFound(h) if h.get() == 99));
    }

    #[test]
    fn test_dispatch_recovers_panic() {
        let mut registry = PortRegistry::new();
        let handle = registry.register_fn("boom", |_ctx, _req| -> Result<String> {
            panic!("vat exploded")
        });

        let err = registry.dispatch(handle, &background(), "x").unwrap_err();
        assert_eq!(err.to_string(), "panic: vat exploded");

        // Still registered and callable.
        assert!(registry.contains(handle));
    }

    #[test]
    fn test_config_limits_panic_message() {
        let mut registry = PortRegistry::with_config(RegistryConfig {
            max_panic_message_len: 4,
        });
        let handle = registry.register_fn("boom", |_ctx, _req| -> Result<String> {
            panic!("abcdefgh")
        });

        let err = registry.dispatch(handle, &background(), "").unwrap_err();
        assert_eq!(err.to_string(), "panic: abcd");
    }

    #[test]
    fn test_unregister() {
        let mut registry = PortRegistry::new();
        let handle = registry.register_fn("echo", echo);

        registry.unregister(handle).unwrap();

        assert_eq!(registry.get_port("echo"), PortHandle::INVALID);
        assert!(registry.lookup("echo").is_none());
        assert!(registry.name(handle).is_none());
        assert!(registry.handler(handle).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let mut registry = PortRegistry::new();
        let handle = registry.register_fn("", echo);

        assert!(registry.unregister(PortHandle::new(42)).is_ok());
        assert!(registry.unregister(PortHandle::INVALID).is_ok());

        // Even a port registered under the empty name is untouched.
        assert_eq!(registry.get_port(""), handle);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_twice() {
        let mut registry = PortRegistry::new();
        let handle = registry.register_fn("echo", echo);

        registry.unregister(handle).unwrap();
        assert!(registry.unregister(handle).is_ok());
    }

    #[test]
    fn test_duplicate_name_shadows() {
        let mut registry = PortRegistry::new();
        let old = registry.register_fn("bank", |_ctx, _req| Ok("old".to_string()));
        let new = registry.register_fn("bank", |_ctx, _req| Ok("new".to_string()));

        assert_eq!(registry.get_port("bank"), new);

        // The old handle is still resolvable directly.
        assert_eq!(registry.dispatch(old, &background(), "").unwrap(), "old");
        assert_eq!(registry.name(old), Some("bank"));
    }

    #[test]
    fn test_unregister_shadowed_keeps_newer_binding() {
        let mut registry = PortRegistry::new();
        let old = registry.register_fn("bank", echo);
        let new = registry.register_fn("bank", echo);

        registry.unregister(old).unwrap();

        assert_eq!(registry.get_port("bank"), new);
        assert!(registry.contains(new));
    }

    #[test]
    fn test_try_register_rejects_duplicate() {
        let mut registry = PortRegistry::new();
        let first = registry.try_register("bank", FnHandler::new(echo)).unwrap();

        let err = registry
            .try_register("bank", FnHandler::new(echo))
            .unwrap_err();
        assert!(matches!(err, PortError::DuplicateName(ref n) if n == "bank"));
        assert_eq!(registry.get_port("bank"), first);

        // The failed attempt did not consume a handle.
        let next = registry.register_fn("storage", echo);
        assert_eq!(next.get(), 2);
    }

    #[test]
    fn test_try_register_after_unregister() {
        let mut registry = PortRegistry::new();
        let first = registry.register_fn("bank", echo);
        registry.unregister(first).unwrap();

        let second = registry.try_register("bank", FnHandler::new(echo)).unwrap();
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn test_ports_in_handle_order() {
        let mut registry = PortRegistry::new();
        registry.register_fn("storage", echo);
        registry.register_fn("bank", echo);
        registry.register_fn("dibc", echo);

        let ports: Vec<_> = registry.ports().map(|(h, n)| (h.get(), n)).collect();
        assert_eq!(ports, vec![(1, "storage"), (2, "bank"), (3, "dibc")]);
    }

    #[test]
    fn test_handle_sentinel() {
        assert!(!PortHandle::INVALID.is_valid());
        assert!(PortHandle::new(1).is_valid());
        assert_eq!(PortHandle::default(), PortHandle::INVALID);
        assert_eq!(PortHandle::new(7).to_string(), "7");
    }

    #[test]
    fn test_handle_serializes_as_integer() {
        let json = serde_json::to_string(&PortHandle::new(3)).unwrap();
        assert_eq!(json, "3");

        let handle: PortHandle = serde_json::from_str("5").unwrap();
        assert_eq!(u64::from(handle), 5);
    }

    #[test]
    fn test_config_from_json() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"max_panic_message_len": 64}"#).unwrap();
        assert_eq!(config.max_panic_message_len, 64);

        let defaults: RegistryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, RegistryConfig::default());
    }
}
