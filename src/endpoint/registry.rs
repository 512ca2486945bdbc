use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{adapter::InboundService, error::BridgeError};

/// One registered service.
pub(crate) struct ServiceEntry {
    pub(crate) name: String,
    pub(crate) serial_name: String,
    pub(crate) service: Arc<dyn InboundService>,
}

impl ServiceEntry {
    pub(crate) fn new(name: &str, serial_name: &str, service: Arc<dyn InboundService>) -> Self {
        Self {
            name: name.to_string(),
            serial_name: serial_name.to_string(),
            service,
        }
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.serial_name)
    }
}

/// Name-keyed services of one side, iterated in name order. Once closed it
/// stays empty.
#[derive(Debug, Default)]
pub(crate) struct ServiceRegistry {
    entries: BTreeMap<String, ServiceEntry>,
    closed: bool,
}

impl ServiceRegistry {
    /// Inserts `entry`, returning the entry it replaced. The caller closes
    /// the replaced entry after releasing the registry.
    pub(crate) fn insert(&mut self, entry: ServiceEntry) -> Result<Option<ServiceEntry>, BridgeError> {
        if self.closed {
            return Err(BridgeError::ChannelClosed);
        }
        Ok(self.entries.insert(entry.name.clone(), entry))
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn InboundService>> {
        self.entries.get(name).map(|entry| entry.service.clone())
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<ServiceEntry> {
        self.entries.remove(name)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Empties the registry for good and returns what it held.
    pub(crate) fn close(&mut self) -> Vec<ServiceEntry> {
        self.closed = true;
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
