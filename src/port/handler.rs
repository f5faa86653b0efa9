//! The port handler capability and its adapters.

use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::JsonCodec;
use crate::context::ControllerContext;
use crate::error::Result;

/// A subsystem's entry point, reachable from the VM through a port.
///
/// Takes the current controller context and an opaque request string and
/// produces a response string. The payload format is a private agreement
/// between the handler and its caller.
pub trait PortHandler {
    /// Handle one request.
    fn receive(&self, ctx: &ControllerContext, request: &str) -> Result<String>;
}

impl<H: PortHandler + ?Sized> PortHandler for Box<H> {
    fn receive(&self, ctx: &ControllerContext, request: &str) -> Result<String> {
        (**self).receive(ctx, request)
    }
}

/// Lets the owning subsystem keep its handler while the registry routes to it.
impl<H: PortHandler + ?Sized> PortHandler for Rc<H> {
    fn receive(&self, ctx: &ControllerContext, request: &str) -> Result<String> {
        (**self).receive(ctx, request)
    }
}

/// Adapter turning a closure into a [`PortHandler`].
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&ControllerContext, &str) -> Result<String>,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> PortHandler for FnHandler<F>
where
    F: Fn(&ControllerContext, &str) -> Result<String>,
{
    #[inline]
    fn receive(&self, ctx: &ControllerContext, request: &str) -> Result<String> {
        (self.handler)(ctx, request)
    }
}

/// Wrapper that decodes the request as JSON and encodes the response as JSON.
///
/// A request that does not decode as `Req` fails with
/// [`PortError::Json`](crate::PortError::Json) without calling the handler.
pub struct JsonHandler<F, Req, Resp>
where
    F: Fn(&ControllerContext, Req) -> Result<Resp>,
    Req: DeserializeOwned,
    Resp: Serialize,
{
    handler: F,
    _phantom: PhantomData<fn(Req) -> Resp>,
}

impl<F, Req, Resp> JsonHandler<F, Req, Resp>
where
    F: Fn(&ControllerContext, Req) -> Result<Resp>,
    Req: DeserializeOwned,
    Resp: Serialize,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Req, Resp> PortHandler for JsonHandler<F, Req, Resp>
where
    F: Fn(&ControllerContext, Req) -> Result<Resp>,
    Req: DeserializeOwned,
    Resp: Serialize,
{
    fn receive(&self, ctx: &ControllerContext, request: &str) -> Result<String> {
        let parsed: Req = JsonCodec::decode(request)?;
        let response = (self.handler)(ctx, parsed)?;
        JsonCodec::encode(&response)
    }
}
