//! Engine side of a bridge: the services that live inside the engine.
use std::sync::Arc;

use tracing::debug;

use crate::{
    bridge::attach_endpoint,
    channel::{Liveness, OutboundCallChannel},
    config::BridgeOptions,
    endpoint::Endpoint,
    engine::{NativeExports, SharedEngine},
    error::BridgeError,
};

/// Mirror image of [`Bridge`](crate::bridge::Bridge): exports its dispatcher
/// as the inbound global and reaches the host through the outbound one.
pub struct GuestRuntime<E: NativeExports + Send + 'static> {
    engine: SharedEngine<E>,
    endpoint: Endpoint,
    export_name: String,
}

impl<E: NativeExports + Send + 'static> GuestRuntime<E> {
    pub fn attach(engine: SharedEngine<E>, options: &BridgeOptions) -> Result<Self, BridgeError> {
        let liveness = Liveness::new();
        let outbound = OutboundCallChannel::new(
            engine.clone(),
            liveness.clone(),
            &options.outbound_channel_name,
        );
        let endpoint = attach_endpoint(
            &*engine.lock(),
            Arc::new(outbound),
            liveness,
            &options.guest_callback_prefix,
            &options.inbound_channel_name,
            options,
        )?;
        debug!(export = %options.inbound_channel_name, "guest runtime attached");
        Ok(Self {
            engine,
            endpoint,
            export_name: options.inbound_channel_name.clone(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn close(&self) -> bool {
        if !self.endpoint.close() {
            return false;
        }
        self.engine.lock().remove_global(&self.export_name);
        debug!("guest runtime closed");
        true
    }
}

impl<E: NativeExports + Send + 'static> Drop for GuestRuntime<E> {
    fn drop(&mut self) {
        self.close();
    }
}
