//! Names and encodings shared by both sides of the bridge.
//!
//! Results cross the raw engine boundary as string arrays whose first element
//! is a tag. Protocol and application failures are therefore plain data on the
//! wire; only engine-level failures travel as engine exceptions.
use std::fmt;

use crate::error::{ApplicationError, BridgeError, EngineError};

/// Global under which the engine side exports its dispatcher.
pub const INBOUND_CHANNEL_NAME: &str = "flux_bridge_inbound";
/// Global under which the host exports its dispatcher.
pub const OUTBOUND_CHANNEL_NAME: &str = "flux_bridge_outbound";

pub const SERVICE_NAMES_ARRAY: &str = "serviceNamesArray";
pub const INVOKE: &str = "invoke";
pub const INVOKE_SUSPENDING: &str = "invokeSuspending";
pub const DISCONNECT: &str = "disconnect";

/// Method a completing callee invokes on a callback with the encoded result.
pub const CALLBACK_SUCCESS: &str = "call";
/// Method a completing callee invokes on a callback with an encoded error.
pub const CALLBACK_FAILURE: &str = "fail";

const TAG_OK: &str = "ok";
const TAG_UNKNOWN_SERVICE: &str = "unknown_service";
const TAG_UNKNOWN_METHOD: &str = "unknown_method";
const TAG_APPLICATION: &str = "error";
const TAG_CLOSED: &str = "closed";
const TAG_CANCELLED: &str = "cancelled";
const TAG_CODEC: &str = "codec";
const TAG_ENGINE: &str = "engine";

/// One call in flight across the boundary. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub instance_name: String,
    pub fun_name: String,
    pub encoded_arguments: Vec<String>,
    /// Set for suspending calls only.
    pub callback_name: Option<String>,
}

impl EncodedCall {
    pub fn new(instance_name: &str, fun_name: &str, encoded_arguments: &[String]) -> Self {
        Self {
            instance_name: instance_name.to_string(),
            fun_name: fun_name.to_string(),
            encoded_arguments: encoded_arguments.to_vec(),
            callback_name: None,
        }
    }

    pub fn suspending(
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
        callback_name: &str,
    ) -> Self {
        Self {
            callback_name: Some(callback_name.to_string()),
            ..Self::new(instance_name, fun_name, encoded_arguments)
        }
    }
}

impl fmt::Display for EncodedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({} args)",
            self.instance_name,
            self.fun_name,
            self.encoded_arguments.len()
        )?;
        if let Some(callback) = &self.callback_name {
            write!(f, " -> {}", callback)?;
        }
        Ok(())
    }
}

pub fn encode_outcome(outcome: &Result<Vec<String>, BridgeError>) -> Vec<String> {
    match outcome {
        Ok(payload) => {
            let mut encoded = Vec::with_capacity(payload.len() + 1);
            encoded.push(TAG_OK.to_string());
            encoded.extend(payload.iter().cloned());
            encoded
        }
        Err(err) => encode_error(err),
    }
}

pub fn decode_outcome(mut encoded: Vec<String>) -> Result<Vec<String>, BridgeError> {
    match encoded.first().map(String::as_str) {
        Some(TAG_OK) => {
            encoded.remove(0);
            Ok(encoded)
        }
        Some(_) => Err(decode_error(&encoded)),
        None => Err(BridgeError::Codec(String::from("empty outcome"))),
    }
}

pub fn encode_error(err: &BridgeError) -> Vec<String> {
    let parts: Vec<&str> = match err {
        BridgeError::ChannelClosed => vec![TAG_CLOSED],
        BridgeError::UnknownService(name) => vec![TAG_UNKNOWN_SERVICE, name.as_str()],
        BridgeError::UnknownMethod { service, method } => {
            vec![TAG_UNKNOWN_METHOD, service.as_str(), method.as_str()]
        }
        BridgeError::Application(app) => {
            vec![TAG_APPLICATION, app.kind.as_str(), app.message.as_str()]
        }
        BridgeError::Cancelled(callback) => vec![TAG_CANCELLED, callback.as_str()],
        BridgeError::Codec(message) => vec![TAG_CODEC, message.as_str()],
        BridgeError::Engine(engine) => return vec![TAG_ENGINE.to_string(), engine.to_string()],
    };
    parts.into_iter().map(String::from).collect()
}

/// Decodes an error produced by [`encode_error`]. Anything unrecognized
/// becomes a `Codec` error rather than failing the caller some other way.
pub fn decode_error(encoded: &[String]) -> BridgeError {
    let field = |index: usize| encoded.get(index).cloned().unwrap_or_default();
    match encoded.first().map(String::as_str) {
        Some(TAG_CLOSED) => BridgeError::ChannelClosed,
        Some(TAG_UNKNOWN_SERVICE) => BridgeError::UnknownService(field(1)),
        Some(TAG_UNKNOWN_METHOD) => BridgeError::UnknownMethod {
            service: field(1),
            method: field(2),
        },
        Some(TAG_APPLICATION) => BridgeError::Application(ApplicationError::new(field(1), field(2))),
        Some(TAG_CANCELLED) => BridgeError::Cancelled(field(1)),
        Some(TAG_CODEC) => BridgeError::Codec(field(1)),
        Some(TAG_ENGINE) => BridgeError::Engine(EngineError::Exception(field(1))),
        Some(tag) => BridgeError::Codec(format!("unknown outcome tag {:?}", tag)),
        None => BridgeError::Codec(String::from("empty error")),
    }
}
