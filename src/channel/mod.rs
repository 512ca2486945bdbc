//! The four-operation call contract both sides implement for each other.
//!
//! [`InboundCallChannel`] carries host calls into the engine side's exported
//! dispatcher; [`OutboundCallChannel`] carries engine-side calls into the
//! host's. Both reach their peer through a single well-known global and
//! marshal every value through a [`ValueArena`](crate::arena::ValueArena).
//! [`export_channel`] installs a local dispatcher as such a global.
use crate::error::BridgeError;

mod engine_call;
pub mod export;
pub mod inbound;
pub mod liveness;
pub mod outbound;

pub use export::export_channel;
pub use inbound::InboundCallChannel;
pub use liveness::Liveness;
pub use outbound::OutboundCallChannel;

pub trait CallChannel: Send + Sync {
    /// Names registered on the receiving side, in sorted order.
    fn service_names_array(&self) -> Result<Vec<String>, BridgeError>;

    /// Runs `fun_name` on `instance_name` and returns its encoded result.
    fn invoke(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
    ) -> Result<Vec<String>, BridgeError>;

    /// Starts `fun_name` on `instance_name` and returns once it is running.
    /// On completion the receiver invokes `callback_name` back across the
    /// bridge; the caller must have registered it beforehand.
    fn invoke_suspending(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
        callback_name: &str,
    ) -> Result<(), BridgeError>;

    /// Removes `instance_name` from the receiving side. Returns whether it was
    /// registered.
    fn disconnect(&self, instance_name: &str) -> Result<bool, BridgeError>;
}
