//! Error types shared by the engine layer and the bridge.

use serde::{Deserialize, Serialize};

/// Failure reported by an [`EngineApi`](crate::engine::EngineApi) primitive.
///
/// An engine error is fatal to the call in progress only. Handles acquired
/// before the failure are still released by the owning arena.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine out of memory")]
    OutOfMemory,
    #[error("invalid or already released handle")]
    InvalidHandle,
    #[error("expected an object, found {0}")]
    NotAnObject(String),
    #[error("{0} is not a function")]
    NotAFunction(String),
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("uncaught exception: {0}")]
    Exception(String),
}

/// Error raised by a service's own logic, carried verbatim across the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApplicationError {
    /// Identity of the callee's error (its type name, usually).
    pub kind: String,
    pub message: String,
}

impl ApplicationError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The owning bridge was closed. Permanent.
    #[error("bridge is closed")]
    ChannelClosed,
    #[error("no service named {0:?} is registered")]
    UnknownService(String),
    #[error("service {service:?} has no method {method:?}")]
    UnknownMethod { service: String, method: String },
    #[error(transparent)]
    Application(#[from] ApplicationError),
    /// A suspending call's owner tore down before the callee completed.
    #[error("suspending call {0} was cancelled")]
    Cancelled(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("malformed payload: {0}")]
    Codec(String),
}

impl BridgeError {
    /// Unknown-method error raised by a service that does not yet know the
    /// name it is registered under. The dispatcher fills it in.
    pub fn unknown_method(method: impl Into<String>) -> Self {
        BridgeError::UnknownMethod {
            service: String::new(),
            method: method.into(),
        }
    }

    pub fn application(kind: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Application(ApplicationError::new(kind, message))
    }

    pub(crate) fn in_service(self, name: &str) -> Self {
        match self {
            BridgeError::UnknownMethod { service, method } if service.is_empty() => {
                BridgeError::UnknownMethod {
                    service: name.to_string(),
                    method,
                }
            }
            other => other,
        }
    }

    /// Protocol-level failures are mismatches between the two sides rather
    /// than failures of the callee's logic.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownService(_) | BridgeError::UnknownMethod { .. }
        )
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Codec(err.to_string())
    }
}
