//! One side's registry of named services and its dispatcher.
//!
//! An [`Endpoint`] owns the services its side exposes, dispatches calls the
//! peer makes into them, hands out [`OutboundService`] handles for the peer's
//! services, and tracks the suspending calls its own side has in flight.
//! Its dispatcher is what a side exports to the engine as its bridge object.
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    adapter::{InboundService, ServiceAdapter},
    channel::{CallChannel, Liveness},
    error::BridgeError,
    protocol::{CALLBACK_FAILURE, CALLBACK_SUCCESS, EncodedCall, encode_error},
};

pub mod outbound_service;
mod registry;
pub mod spawn;
pub mod suspend;

pub use outbound_service::OutboundService;
pub use spawn::{Spawn, ThreadPoolSpawner};
pub use suspend::{PendingCall, Resolution, SuspendCoordinator, SuspensionState};

use registry::{ServiceEntry, ServiceRegistry};
use suspend::SuspendCallback;

/// Serial name recorded for callback registrations.
const CALLBACK_SERIAL_NAME: &str = "callback";

#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

pub(crate) struct EndpointInner {
    registry: Mutex<ServiceRegistry>,
    pub(crate) outbound: Arc<dyn CallChannel>,
    pub(crate) coordinator: SuspendCoordinator,
    spawner: Arc<dyn Spawn>,
    pub(crate) liveness: Liveness,
}

impl Endpoint {
    /// `outbound` reaches the peer's dispatcher and shares `liveness` with
    /// this endpoint, so closing either stops both. Callback names issued
    /// here start with `callback_prefix`.
    pub fn new(
        callback_prefix: &str,
        outbound: Arc<dyn CallChannel>,
        liveness: Liveness,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        Self {
            inner: Arc::new(EndpointInner {
                registry: Mutex::new(ServiceRegistry::default()),
                outbound,
                coordinator: SuspendCoordinator::new(callback_prefix),
                spawner,
                liveness,
            }),
        }
    }

    /// The dispatcher to export to the peer. Held weakly so the export does
    /// not keep this endpoint alive.
    pub fn dispatcher(&self) -> Weak<dyn CallChannel> {
        let dispatcher: Arc<dyn CallChannel> = self.inner.clone();
        Arc::downgrade(&dispatcher)
    }

    pub fn set<A: ServiceAdapter>(
        &self,
        name: &str,
        adapter: &A,
        service: Arc<A::Service>,
    ) -> Result<(), BridgeError> {
        self.set_service(name, adapter.serial_name(), adapter.inbound(service))
    }

    /// Registers `service` under `name`. A service already registered under
    /// that name is replaced, then closed.
    pub fn set_service(
        &self,
        name: &str,
        serial_name: &str,
        service: Arc<dyn InboundService>,
    ) -> Result<(), BridgeError> {
        self.inner.liveness.check_not_closed()?;
        let (previous, services) = {
            let mut registry = self.inner.registry.lock();
            let previous = registry.insert(ServiceEntry::new(name, serial_name, service))?;
            (previous, registry.len())
        };
        debug!(name, serial_name, services, "service registered");
        if let Some(previous) = previous {
            debug!(name, previous = %previous.serial_name, "replaced service closed");
            previous.service.close();
        }
        Ok(())
    }

    pub fn get<A: ServiceAdapter>(&self, name: &str, adapter: &A) -> Result<A::Proxy, BridgeError> {
        self.inner.liveness.check_not_closed()?;
        trace!(name, serial_name = adapter.serial_name(), "proxy created");
        Ok(adapter.outbound(OutboundService::new(name, self.inner.clone())))
    }

    /// Removes and closes `name`. `Ok(false)` if it was not registered.
    pub fn disconnect(&self, name: &str) -> Result<bool, BridgeError> {
        self.inner.liveness.check_not_closed()?;
        Ok(self.inner.remove_service(name))
    }

    /// Names registered on this side, sorted. Includes outstanding callback
    /// registrations.
    pub fn service_names(&self) -> Vec<String> {
        self.inner.registry.lock().names()
    }

    pub fn remote_service_names(&self) -> Result<Vec<String>, BridgeError> {
        self.inner.liveness.check_not_closed()?;
        self.inner.outbound.service_names_array()
    }

    /// Registers a caller-chosen callback name for a suspending call issued
    /// directly on [`Endpoint::outbound_channel`]. `Ok(None)` if the name is
    /// still outstanding.
    pub fn await_callback(
        &self,
        callback_name: &str,
        instance_name: &str,
    ) -> Result<Option<PendingCall>, BridgeError> {
        self.inner.liveness.check_not_closed()?;
        let Some(pending) = self.inner.coordinator.issue_named(callback_name, instance_name)? else {
            return Ok(None);
        };
        if let Err(err) = self.inner.register_callback(callback_name) {
            self.inner.coordinator.abandon(callback_name);
            return Err(err);
        }
        Ok(Some(pending))
    }

    /// The raw channel to the peer's dispatcher.
    pub fn outbound_channel(&self) -> Arc<dyn CallChannel> {
        self.inner.outbound.clone()
    }

    /// Closes this endpoint for good: every registered service is removed
    /// and closed and every outstanding suspension is cancelled. Returns
    /// `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.liveness.is_closed()
    }

    pub fn outstanding_suspensions(&self) -> usize {
        self.inner.coordinator.outstanding()
    }

    pub fn suspension_state(&self, callback_name: &str) -> Option<SuspensionState> {
        self.inner.coordinator.state(callback_name)
    }
}

impl EndpointInner {
    fn lookup(&self, name: &str) -> Result<Arc<dyn InboundService>, BridgeError> {
        self.registry
            .lock()
            .get(name)
            .ok_or_else(|| BridgeError::UnknownService(name.to_string()))
    }

    fn remove_service(&self, name: &str) -> bool {
        let removed = self.registry.lock().remove(name);
        match removed {
            Some(entry) => {
                debug!(name, serial_name = %entry.serial_name, "service disconnected");
                entry.service.close();
                true
            }
            None => false,
        }
    }

    /// Fails with `ChannelClosed` once the registry has been closed.
    pub(crate) fn register_callback(self: &Arc<Self>, callback_name: &str) -> Result<(), BridgeError> {
        let callback = SuspendCallback::new(callback_name, Arc::downgrade(self));
        let previous = self.registry.lock().insert(ServiceEntry::new(
            callback_name,
            CALLBACK_SERIAL_NAME,
            Arc::new(callback),
        ))?;
        if let Some(previous) = previous {
            previous.service.close();
        }
        Ok(())
    }

    /// Removes a callback registration without closing it.
    pub(crate) fn unregister_callback(&self, callback_name: &str) {
        self.registry.lock().remove(callback_name);
    }

    pub(crate) fn complete_suspension(
        &self,
        callback_name: &str,
        outcome: Result<Vec<String>, BridgeError>,
    ) -> Result<(), BridgeError> {
        self.unregister_callback(callback_name);
        self.coordinator
            .resume(callback_name, outcome)
            .map(|_| ())
            .ok_or_else(|| BridgeError::UnknownService(callback_name.to_string()))
    }

    fn close(&self) -> bool {
        if !self.liveness.close() {
            return false;
        }
        let entries = self.registry.lock().close();
        for entry in &entries {
            entry.service.close();
        }
        let cancelled = self.coordinator.cancel_all();
        debug!(
            services = entries.len(),
            cancelled = cancelled.len(),
            "endpoint closed"
        );
        true
    }
}

/// Sends a finished suspending call's outcome to its callback on the peer.
fn deliver(outbound: &dyn CallChannel, callback_name: &str, outcome: Result<Vec<String>, BridgeError>) {
    let (method, payload) = match outcome {
        Ok(payload) => (CALLBACK_SUCCESS, payload),
        Err(err) => (CALLBACK_FAILURE, encode_error(&err)),
    };
    match outbound.invoke(callback_name, method, &payload) {
        Ok(_) => trace!(callback = callback_name, method, "callback delivered"),
        Err(err @ (BridgeError::UnknownService(_) | BridgeError::ChannelClosed)) => {
            debug!(callback = callback_name, %err, "late callback ignored")
        }
        Err(err) => warn!(callback = callback_name, %err, "callback delivery failed"),
    }
}

impl CallChannel for EndpointInner {
    fn service_names_array(&self) -> Result<Vec<String>, BridgeError> {
        self.liveness.check_not_closed()?;
        Ok(self.registry.lock().names())
    }

    fn invoke(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
    ) -> Result<Vec<String>, BridgeError> {
        self.liveness.check_not_closed()?;
        let service = self.lookup(instance_name)?;
        trace!(
            call = %EncodedCall::new(instance_name, fun_name, encoded_arguments),
            "dispatching call"
        );
        service
            .call(fun_name, encoded_arguments.to_vec())
            .map_err(|err| err.in_service(instance_name))
    }

    fn invoke_suspending(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
        callback_name: &str,
    ) -> Result<(), BridgeError> {
        self.liveness.check_not_closed()?;
        let service = self.lookup(instance_name)?;
        let call = service
            .call_suspending(fun_name, encoded_arguments.to_vec())
            .map_err(|err| err.in_service(instance_name))?;

        let outbound = self.outbound.clone();
        let callback = callback_name.to_string();
        let task = async move {
            let outcome = call.await;
            deliver(&*outbound, &callback, outcome);
        };
        trace!(
            call = %EncodedCall::suspending(instance_name, fun_name, encoded_arguments, callback_name),
            "suspending call started"
        );
        self.spawner
            .spawn(task.boxed())
            .map_err(|err| BridgeError::application("SpawnError", err.to_string()))
    }

    fn disconnect(&self, instance_name: &str) -> Result<bool, BridgeError> {
        self.liveness.check_not_closed()?;
        Ok(self.remove_service(instance_name))
    }
}

#[cfg(test)]
mod endpoint_test;
#[cfg(test)]
mod suspend_test;
