use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::BridgeError;

/// Shared closed flag of one side of the bridge.
///
/// The endpoint and the channels it issues calls through hold clones of the
/// same flag, so closing the endpoint stops its channels too. Closing is
/// permanent.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the side closed. Returns `true` only for the call that actually
    /// closed it.
    pub fn close(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check_not_closed(&self) -> Result<(), BridgeError> {
        if self.is_closed() {
            Err(BridgeError::ChannelClosed)
        } else {
            Ok(())
        }
    }
}
