//! Conversion between typed services and the encoded-string call shape.
//!
//! A side registers a typed service through a [`ServiceAdapter`], which wraps
//! it as an [`InboundService`]: a dispatcher from function name and encoded
//! arguments to an encoded result. The same adapter turns an
//! [`OutboundService`] handle into a typed proxy for the peer's service.
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{endpoint::OutboundService, error::BridgeError};

pub mod codec;
pub mod function_service;

pub use codec::{Codec, JsonCodec};
pub use function_service::{FunctionService, RawAdapter};

/// Eventual result of a suspending call.
pub type SuspendedResult = BoxFuture<'static, Result<Vec<String>, BridgeError>>;

/// A registered service as its endpoint sees it.
pub trait InboundService: Send + Sync {
    fn call(&self, fun_name: &str, encoded_arguments: Vec<String>) -> Result<Vec<String>, BridgeError>;

    /// Starts a suspending call. The returned future is driven on the
    /// endpoint's spawner, outside any registry or engine lock.
    fn call_suspending(
        &self,
        fun_name: &str,
        _encoded_arguments: Vec<String>,
    ) -> Result<SuspendedResult, BridgeError> {
        Err(BridgeError::unknown_method(fun_name))
    }

    /// Called once when the entry is replaced, disconnected or its endpoint
    /// closes.
    fn close(&self) {}
}

pub trait ServiceAdapter {
    type Service: ?Sized + Send + Sync + 'static;
    type Proxy;

    /// Identifies the service interface, for diagnostics.
    fn serial_name(&self) -> &str;

    fn inbound(&self, service: Arc<Self::Service>) -> Arc<dyn InboundService>;

    fn outbound(&self, handle: OutboundService) -> Self::Proxy;
}

#[cfg(test)]
mod function_service_test;
