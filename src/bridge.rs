//! Host side of a bridge to one engine.
use std::sync::Arc;

use tracing::debug;

use crate::{
    channel::{CallChannel, InboundCallChannel, Liveness, export_channel},
    config::BridgeOptions,
    endpoint::{Endpoint, ThreadPoolSpawner},
    engine::{HandleStats, NativeExports, ScriptEngine, SharedEngine},
    error::BridgeError,
};

/// Creates an endpoint whose calls travel through `outbound` and exports its
/// dispatcher into the engine as `export_name`.
pub(crate) fn attach_endpoint<E: NativeExports + ?Sized>(
    engine: &E,
    outbound: Arc<dyn CallChannel>,
    liveness: Liveness,
    callback_prefix: &str,
    export_name: &str,
    options: &BridgeOptions,
) -> Result<Endpoint, BridgeError> {
    let spawner = ThreadPoolSpawner::new(&options.worker_thread_name, options.worker_threads)
        .map_err(|err| BridgeError::application("SpawnError", err.to_string()))?;
    let endpoint = Endpoint::new(callback_prefix, outbound, liveness, Arc::new(spawner));
    export_channel(engine, export_name, endpoint.dispatcher())?;
    Ok(endpoint)
}

/// Host services exposed to the engine and proxies for the engine's
/// services, over one shared engine.
///
/// The host's dispatcher is exported as the outbound global; host calls reach
/// the engine side's dispatcher under the inbound global. Closing (or
/// dropping) the bridge closes the endpoint and removes the exported global.
pub struct Bridge<E: NativeExports + Send + 'static> {
    engine: SharedEngine<E>,
    endpoint: Endpoint,
    options: BridgeOptions,
}

impl<E: NativeExports + Send + 'static> Bridge<E> {
    pub fn new(engine: SharedEngine<E>, options: BridgeOptions) -> Result<Self, BridgeError> {
        let liveness = Liveness::new();
        let inbound = InboundCallChannel::new(
            engine.clone(),
            liveness.clone(),
            &options.inbound_channel_name,
        );
        let endpoint = attach_endpoint(
            &*engine.lock(),
            Arc::new(inbound),
            liveness,
            &options.host_callback_prefix,
            &options.outbound_channel_name,
            &options,
        )?;
        debug!(
            export = %options.outbound_channel_name,
            peer = %options.inbound_channel_name,
            "host bridge attached"
        );
        Ok(Self {
            engine,
            endpoint,
            options,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn engine(&self) -> &SharedEngine<E> {
        &self.engine
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Returns `false` if the bridge was already closed.
    pub fn close(&self) -> bool {
        if !self.endpoint.close() {
            return false;
        }
        let removed = self
            .engine
            .lock()
            .remove_global(&self.options.outbound_channel_name);
        debug!(removed, "host bridge closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.endpoint.is_closed()
    }
}

impl Bridge<ScriptEngine> {
    pub fn handle_stats(&self) -> HandleStats {
        self.engine.lock().handle_stats()
    }
}

impl<E: NativeExports + Send + 'static> Drop for Bridge<E> {
    fn drop(&mut self) {
        self.close();
    }
}
