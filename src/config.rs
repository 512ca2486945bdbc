use serde::{Deserialize, Serialize};

use crate::{
    error::BridgeError,
    protocol::{INBOUND_CHANNEL_NAME, OUTBOUND_CHANNEL_NAME},
};

/// Names and threads used when wiring a bridge to an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Global the engine side exports its dispatcher under.
    pub inbound_channel_name: String,
    /// Global the host exports its dispatcher under.
    pub outbound_channel_name: String,
    pub host_callback_prefix: String,
    pub guest_callback_prefix: String,
    /// Name prefix of the pool threads running suspending calls.
    pub worker_thread_name: String,
    /// Size of that pool, per side.
    pub worker_threads: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            inbound_channel_name: INBOUND_CHANNEL_NAME.to_string(),
            outbound_channel_name: OUTBOUND_CHANNEL_NAME.to_string(),
            host_callback_prefix: String::from("host"),
            guest_callback_prefix: String::from("guest"),
            worker_thread_name: String::from("flux-bridge-worker-"),
            worker_threads: 4,
        }
    }
}

impl BridgeOptions {
    /// Missing fields keep their defaults.
    pub fn from_json(source: &str) -> Result<Self, BridgeError> {
        let options: Self = serde_json::from_str(source)?;
        if options.inbound_channel_name == options.outbound_channel_name {
            return Err(BridgeError::Codec(format!(
                "inbound and outbound channels share the name {:?}",
                options.inbound_channel_name
            )));
        }
        if options.worker_threads == 0 {
            return Err(BridgeError::Codec(String::from("worker_threads must be at least 1")));
        }
        Ok(options)
    }
}
