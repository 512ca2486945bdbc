//! Correlation of suspending calls with their completion callbacks.
//!
//! Issuing a suspending call allocates a callback name and a one-shot
//! continuation. The callback name is registered on the issuing side as a
//! [`SuspendCallback`] service; the callee completes the call by invoking that
//! service with `call` or `fail`, which resumes the continuation exactly once
//! and removes the registration. Cancellation resumes with
//! [`BridgeError::Cancelled`] instead.
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        Weak,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};

use futures::{FutureExt, channel::oneshot};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    adapter::InboundService,
    endpoint::EndpointInner,
    error::BridgeError,
    protocol::{CALLBACK_FAILURE, CALLBACK_SUCCESS, decode_error},
};

type Outcome = Result<Vec<String>, BridgeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionState {
    /// Callback registered, call not yet accepted by the callee.
    Issued,
    AwaitingCallback,
}

/// How an outstanding suspension ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    Rejected,
    Cancelled,
}

struct Pending {
    instance_name: String,
    state: SuspensionState,
    sender: oneshot::Sender<Outcome>,
}

#[derive(Default)]
struct PendingTable {
    calls: HashMap<String, Pending>,
    /// Set by `cancel_all`; no suspension is issued afterwards.
    closed: bool,
}

pub struct SuspendCoordinator {
    prefix: String,
    counter: AtomicU64,
    pending: Mutex<PendingTable>,
}

impl SuspendCoordinator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: AtomicU64::new(0),
            pending: Mutex::new(PendingTable::default()),
        }
    }

    /// Issues a suspension with a fresh `<prefix>/<instance>/<counter>` name.
    /// Fails with `ChannelClosed` after [`SuspendCoordinator::cancel_all`].
    pub fn issue(&self, instance_name: &str) -> Result<PendingCall, BridgeError> {
        loop {
            let counter = self.counter.fetch_add(1, Ordering::Relaxed);
            let name = format!("{}/{}/{}", self.prefix, instance_name, counter);
            if let Some(call) = self.issue_named(&name, instance_name)? {
                return Ok(call);
            }
        }
    }

    /// Issues a suspension under a caller-chosen callback name. `Ok(None)`
    /// while that name is still outstanding.
    pub fn issue_named(
        &self,
        callback_name: &str,
        instance_name: &str,
    ) -> Result<Option<PendingCall>, BridgeError> {
        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(BridgeError::ChannelClosed);
        }
        if pending.calls.contains_key(callback_name) {
            return Ok(None);
        }
        let (sender, receiver) = oneshot::channel();
        pending.calls.insert(
            callback_name.to_string(),
            Pending {
                instance_name: instance_name.to_string(),
                state: SuspensionState::Issued,
                sender,
            },
        );
        trace!(callback = callback_name, instance_name, "suspension issued");
        Ok(Some(PendingCall {
            callback_name: callback_name.to_string(),
            receiver,
        }))
    }

    /// Records that the callee accepted the call. `false` if the suspension
    /// already ended.
    pub fn mark_awaiting(&self, callback_name: &str) -> bool {
        match self.pending.lock().calls.get_mut(callback_name) {
            Some(pending) => {
                pending.state = SuspensionState::AwaitingCallback;
                true
            }
            None => false,
        }
    }

    /// Completes the suspension with the callee's outcome. `None` if the name
    /// is not outstanding.
    pub fn resume(&self, callback_name: &str, outcome: Outcome) -> Option<Resolution> {
        let pending = self.pending.lock().calls.remove(callback_name)?;
        let resolution = if outcome.is_ok() {
            Resolution::Resolved
        } else {
            Resolution::Rejected
        };
        debug!(
            callback = callback_name,
            instance_name = %pending.instance_name,
            from = ?pending.state,
            ?resolution,
            "suspension completed"
        );
        // The caller may have stopped waiting.
        let _ = pending.sender.send(outcome);
        Some(resolution)
    }

    pub fn cancel(&self, callback_name: &str) -> bool {
        let Some(pending) = self.pending.lock().calls.remove(callback_name) else {
            return false;
        };
        Self::send_cancelled(callback_name, pending);
        true
    }

    /// Cancels every suspension targeting `instance_name` and returns their
    /// callback names.
    pub fn cancel_instance(&self, instance_name: &str) -> Vec<String> {
        let cancelled: Vec<(String, Pending)> = {
            let mut pending = self.pending.lock();
            let names: Vec<String> = pending
                .calls
                .iter()
                .filter(|(_, p)| p.instance_name == instance_name)
                .map(|(name, _)| name.clone())
                .collect();
            names
                .into_iter()
                .filter_map(|name| pending.calls.remove(&name).map(|p| (name, p)))
                .collect()
        };
        cancelled
            .into_iter()
            .map(|(name, pending)| {
                Self::send_cancelled(&name, pending);
                name
            })
            .collect()
    }

    /// Cancels every outstanding suspension and refuses new ones.
    pub fn cancel_all(&self) -> Vec<String> {
        let drained: Vec<(String, Pending)> = {
            let mut pending = self.pending.lock();
            pending.closed = true;
            pending.calls.drain().collect()
        };
        drained
            .into_iter()
            .map(|(name, pending)| {
                Self::send_cancelled(&name, pending);
                name
            })
            .collect()
    }

    /// Drops a suspension whose issuing call failed. The caller gets the
    /// issuing error instead of a resolution.
    pub fn abandon(&self, callback_name: &str) {
        if self.pending.lock().calls.remove(callback_name).is_some() {
            trace!(callback = callback_name, "suspension abandoned");
        }
    }

    pub fn state(&self, callback_name: &str) -> Option<SuspensionState> {
        self.pending.lock().calls.get(callback_name).map(|p| p.state)
    }

    pub fn outstanding(&self) -> usize {
        self.pending.lock().calls.len()
    }

    fn send_cancelled(callback_name: &str, pending: Pending) {
        debug!(
            callback = callback_name,
            instance_name = %pending.instance_name,
            from = ?pending.state,
            resolution = ?Resolution::Cancelled,
            "suspension cancelled"
        );
        let _ = pending
            .sender
            .send(Err(BridgeError::Cancelled(callback_name.to_string())));
    }
}

/// Continuation of one suspending call. Resolves with the callee's result,
/// its error, or [`BridgeError::Cancelled`].
#[derive(Debug)]
pub struct PendingCall {
    callback_name: String,
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingCall {
    pub fn callback_name(&self) -> &str {
        &self.callback_name
    }
}

impl Future for PendingCall {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sender dropped without an answer: the coordinator went away.
            Poll::Ready(Err(oneshot::Canceled)) => {
                Poll::Ready(Err(BridgeError::Cancelled(self.callback_name.clone())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// The one-shot service registered under a callback name.
pub(crate) struct SuspendCallback {
    callback_name: String,
    endpoint: Weak<EndpointInner>,
}

impl SuspendCallback {
    pub(crate) fn new(callback_name: &str, endpoint: Weak<EndpointInner>) -> Self {
        Self {
            callback_name: callback_name.to_string(),
            endpoint,
        }
    }
}

impl InboundService for SuspendCallback {
    fn call(&self, fun_name: &str, encoded_arguments: Vec<String>) -> Result<Vec<String>, BridgeError> {
        let outcome = match fun_name {
            CALLBACK_SUCCESS => Ok(encoded_arguments),
            CALLBACK_FAILURE => Err(decode_error(&encoded_arguments)),
            other => return Err(BridgeError::unknown_method(other)),
        };
        let endpoint = self.endpoint.upgrade().ok_or(BridgeError::ChannelClosed)?;
        endpoint.complete_suspension(&self.callback_name, outcome)?;
        Ok(Vec::new())
    }

    fn close(&self) {
        if let Some(endpoint) = self.endpoint.upgrade() {
            endpoint.coordinator.cancel(&self.callback_name);
        }
    }
}
