use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, trace};

use crate::{
    endpoint::{EndpointInner, PendingCall},
    error::BridgeError,
};

/// Untyped handle to a service registered on the peer side.
///
/// Whether the peer actually has the service is checked lazily, against the
/// peer's service names, on the first call; a handle taken before the peer
/// registers starts working once it does.
#[derive(Clone)]
pub struct OutboundService {
    instance_name: Arc<str>,
    endpoint: Arc<EndpointInner>,
    verified: Arc<AtomicBool>,
}

impl OutboundService {
    pub(crate) fn new(instance_name: &str, endpoint: Arc<EndpointInner>) -> Self {
        Self {
            instance_name: Arc::from(instance_name),
            endpoint,
            verified: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn ensure_present(&self) -> Result<(), BridgeError> {
        if self.verified.load(Ordering::Acquire) {
            return Ok(());
        }
        let names = self.endpoint.outbound.service_names_array()?;
        if !names.iter().any(|name| **name == *self.instance_name) {
            return Err(BridgeError::UnknownService(self.instance_name.to_string()));
        }
        self.verified.store(true, Ordering::Release);
        Ok(())
    }

    fn forget_on_unknown<T>(&self, result: &Result<T, BridgeError>) {
        if let Err(BridgeError::UnknownService(_)) = result {
            self.verified.store(false, Ordering::Release);
        }
    }

    pub fn call(&self, fun_name: &str, encoded_arguments: &[String]) -> Result<Vec<String>, BridgeError> {
        self.endpoint.liveness.check_not_closed()?;
        self.ensure_present()?;
        let result = self
            .endpoint
            .outbound
            .invoke(&self.instance_name, fun_name, encoded_arguments);
        self.forget_on_unknown(&result);
        result
    }

    /// Issues a suspending call and returns its continuation once the peer has
    /// accepted it. If the peer refuses, the callback registration is undone
    /// and the refusal returned directly.
    pub fn call_suspending(
        &self,
        fun_name: &str,
        encoded_arguments: &[String],
    ) -> Result<PendingCall, BridgeError> {
        self.endpoint.liveness.check_not_closed()?;
        self.ensure_present()?;

        let pending = self.endpoint.coordinator.issue(&self.instance_name)?;
        let callback_name = pending.callback_name().to_string();
        if let Err(err) = self.endpoint.register_callback(&callback_name) {
            self.endpoint.coordinator.abandon(&callback_name);
            return Err(err);
        }

        let issued = self.endpoint.outbound.invoke_suspending(
            &self.instance_name,
            fun_name,
            encoded_arguments,
            &callback_name,
        );
        self.forget_on_unknown(&issued);
        match issued {
            Ok(()) => {
                self.endpoint.coordinator.mark_awaiting(&callback_name);
                trace!(callback = %callback_name, fun_name, "awaiting callback");
                Ok(pending)
            }
            Err(err) => {
                self.endpoint.unregister_callback(&callback_name);
                self.endpoint.coordinator.abandon(&callback_name);
                Err(err)
            }
        }
    }

    /// Disconnects the peer's service and cancels this side's suspensions
    /// targeting it. Returns whether the peer had the service.
    pub fn close(&self) -> bool {
        let removed = match self.endpoint.outbound.disconnect(&self.instance_name) {
            Ok(removed) => removed,
            Err(err) => {
                debug!(instance_name = %self.instance_name, %err, "remote disconnect failed");
                false
            }
        };
        for callback_name in self.endpoint.coordinator.cancel_instance(&self.instance_name) {
            self.endpoint.unregister_callback(&callback_name);
        }
        self.verified.store(false, Ordering::Release);
        removed
    }
}

impl std::fmt::Debug for OutboundService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OutboundService({})", self.instance_name)
    }
}
