use std::fmt;

use crate::engine::{AtomHandle, ValueHandle};

/// Acquire/release counters for one engine instance.
///
/// Every handle the engine hands out must come back exactly once, so after
/// any complete call the acquired and released counts match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub values_acquired: usize,
    pub values_released: usize,
    pub atoms_acquired: usize,
    pub atoms_released: usize,
    /// Release calls on handles that were already released (or never valid).
    pub double_frees: usize,
}

impl HandleStats {
    pub fn live_values(&self) -> usize {
        self.values_acquired.saturating_sub(self.values_released)
    }

    pub fn live_atoms(&self) -> usize {
        self.atoms_acquired.saturating_sub(self.atoms_released)
    }

    /// No handle outstanding and none released twice.
    pub fn is_balanced(&self) -> bool {
        self.values_acquired == self.values_released
            && self.atoms_acquired == self.atoms_released
            && self.double_frees == 0
    }

    pub(crate) fn record_value_acquired(&mut self) {
        self.values_acquired += 1;
    }

    pub(crate) fn record_value_released(&mut self) {
        self.values_released += 1;
    }

    pub(crate) fn record_atom_acquired(&mut self) {
        self.atoms_acquired += 1;
    }

    pub(crate) fn record_atom_released(&mut self) {
        self.atoms_released += 1;
    }

    pub(crate) fn record_double_free(&mut self) {
        self.double_frees += 1;
    }
}

impl fmt::Display for HandleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "values {}/{} atoms {}/{} double frees {}",
            self.values_released,
            self.values_acquired,
            self.atoms_released,
            self.atoms_acquired,
            self.double_frees
        )
    }
}

/// One entry of the engine's optional handle trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleEvent {
    AcquireValue { handle: ValueHandle, origin: String },
    ReleaseValue(ValueHandle),
    AcquireAtom { handle: AtomHandle, name: String },
    ReleaseAtom(AtomHandle),
    Call(String),
    DoubleFree(String),
}

impl fmt::Display for HandleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleEvent::AcquireValue { handle, origin } => write!(f, "acquire {} {}", handle, origin),
            HandleEvent::ReleaseValue(handle) => write!(f, "release {}", handle),
            HandleEvent::AcquireAtom { handle, name } => write!(f, "acquire {} atom {}", handle, name),
            HandleEvent::ReleaseAtom(handle) => write!(f, "release {}", handle),
            HandleEvent::Call(name) => write!(f, "call {}", name),
            HandleEvent::DoubleFree(what) => write!(f, "double free {}", what),
        }
    }
}
