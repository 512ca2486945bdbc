use tracing::debug;

use crate::{
    channel::{CallChannel, Liveness, engine_call::EngineCall},
    engine::{EngineApi, SharedEngine},
    error::BridgeError,
};

/// Engine-side channel back to the host.
///
/// Calls made by services living in the engine are re-encoded here and
/// crossed into the dispatcher the host exported under the outbound global
/// name. Completion callbacks of suspending calls the host issued travel this
/// way as well.
pub struct OutboundCallChannel<E> {
    call: EngineCall<E>,
}

impl<E: EngineApi + Send> OutboundCallChannel<E> {
    pub fn new(engine: SharedEngine<E>, liveness: Liveness, global_name: &str) -> Self {
        Self {
            call: EngineCall::new(engine, liveness, global_name),
        }
    }
}

impl<E: EngineApi + Send> CallChannel for OutboundCallChannel<E> {
    fn service_names_array(&self) -> Result<Vec<String>, BridgeError> {
        self.call.service_names_array()
    }

    fn invoke(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
    ) -> Result<Vec<String>, BridgeError> {
        let result = self.call.invoke(instance_name, fun_name, encoded_arguments);
        if let Err(err) = &result {
            debug!(
                global = self.call.global_name(),
                instance_name, fun_name, %err, "outbound call failed"
            );
        }
        result
    }

    fn invoke_suspending(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
        callback_name: &str,
    ) -> Result<(), BridgeError> {
        self.call
            .invoke_suspending(instance_name, fun_name, encoded_arguments, callback_name)
    }

    fn disconnect(&self, instance_name: &str) -> Result<bool, BridgeError> {
        self.call.disconnect(instance_name)
    }
}
