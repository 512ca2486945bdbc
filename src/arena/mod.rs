use crate::{
    engine::{AtomHandle, EngineApi, ValueHandle},
    error::EngineError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owned {
    Value(ValueHandle),
    Atom(AtomHandle),
}

/// Scoped owner of the engine handles acquired during one call.
///
/// Every handle obtained through the arena is tracked. When the arena is
/// dropped (normal return, `?` early return, or unwinding) the handles still
/// tracked are released in reverse order of acquisition, so a call releases
/// exactly what it acquired on every exit path. [`ValueArena::take`] hands a
/// handle's ownership to the caller instead.
pub struct ValueArena<'e, E: EngineApi + ?Sized> {
    engine: &'e E,
    owned: Vec<Owned>,
}

impl<'e, E: EngineApi + ?Sized> ValueArena<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self {
            engine,
            owned: Vec::with_capacity(8),
        }
    }

    pub fn engine(&self) -> &'e E {
        self.engine
    }

    pub fn global_object(&mut self) -> Result<ValueHandle, EngineError> {
        let handle = self.engine.global_object()?;
        Ok(self.track(handle))
    }

    pub fn get_property(&mut self, object: ValueHandle, name: &str) -> Result<ValueHandle, EngineError> {
        let handle = self.engine.get_property(object, name)?;
        Ok(self.track(handle))
    }

    pub fn new_atom(&mut self, name: &str) -> Result<AtomHandle, EngineError> {
        let atom = self.engine.new_atom(name)?;
        self.owned.push(Owned::Atom(atom));
        Ok(atom)
    }

    pub fn new_string(&mut self, value: &str) -> Result<ValueHandle, EngineError> {
        let handle = self.engine.new_string(value)?;
        Ok(self.track(handle))
    }

    pub fn new_string_array(&mut self, items: &[String]) -> Result<ValueHandle, EngineError> {
        let handle = self.engine.new_string_array(items)?;
        Ok(self.track(handle))
    }

    pub fn new_boolean(&mut self, value: bool) -> Result<ValueHandle, EngineError> {
        let handle = self.engine.new_boolean(value)?;
        Ok(self.track(handle))
    }

    /// Invokes `this[method](...args)`; the arguments stay tracked, the
    /// result joins them.
    pub fn invoke(
        &mut self,
        this: ValueHandle,
        method: AtomHandle,
        args: &[ValueHandle],
    ) -> Result<ValueHandle, EngineError> {
        let handle = self.engine.invoke(this, method, args)?;
        Ok(self.track(handle))
    }

    /// Starts tracking a handle acquired outside the arena.
    pub fn adopt(&mut self, handle: ValueHandle) -> ValueHandle {
        self.track(handle)
    }

    /// Stops tracking `handle` and transfers its ownership to the caller.
    /// Returns `None` when the arena does not own it.
    pub fn take(&mut self, handle: ValueHandle) -> Option<ValueHandle> {
        let position = self
            .owned
            .iter()
            .rposition(|owned| *owned == Owned::Value(handle))?;
        self.owned.remove(position);
        Some(handle)
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    /// Releases everything tracked so far, newest first.
    pub fn reset(&mut self) {
        while let Some(owned) = self.owned.pop() {
            match owned {
                Owned::Value(handle) => self.engine.free_value(handle),
                Owned::Atom(atom) => self.engine.free_atom(atom),
            }
        }
    }

    fn track(&mut self, handle: ValueHandle) -> ValueHandle {
        self.owned.push(Owned::Value(handle));
        handle
    }
}

impl<E: EngineApi + ?Sized> Drop for ValueArena<'_, E> {
    fn drop(&mut self) {
        self.reset();
    }
}
