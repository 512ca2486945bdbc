use std::fmt;

/// Handle to a value owned by the engine.
///
/// A `ValueHandle` is a lightweight, copyable index into the engine's handle
/// table. The generation makes a released handle unusable even after its slot
/// has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ValueHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the raw slot index backing this handle.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.index)
    }
}

/// Handle to an interned property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl AtomHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for AtomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.index)
    }
}
