use tracing::debug;

use crate::{
    channel::{CallChannel, Liveness, engine_call::EngineCall},
    engine::{EngineApi, SharedEngine},
    error::BridgeError,
};

/// Host-side channel into the engine.
///
/// Reaches the dispatcher the engine side exported under the inbound global
/// name (see [`protocol::INBOUND_CHANNEL_NAME`](crate::protocol::INBOUND_CHANNEL_NAME))
/// and holds the engine lock for the duration of every call, including the
/// issuing half of a suspending call.
pub struct InboundCallChannel<E> {
    call: EngineCall<E>,
}

impl<E: EngineApi + Send> InboundCallChannel<E> {
    pub fn new(engine: SharedEngine<E>, liveness: Liveness, global_name: &str) -> Self {
        Self {
            call: EngineCall::new(engine, liveness, global_name),
        }
    }
}

impl<E: EngineApi + Send> CallChannel for InboundCallChannel<E> {
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
                instance_name, fun_name, %err, "inbound call failed"
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
