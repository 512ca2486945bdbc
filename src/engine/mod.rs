//! Value-handle interface to the embedded script engine.
//!
//! The bridge talks to an engine only through [`EngineApi`]: seven
//! allocation/release primitives plus a few conversions between engine
//! values and host strings. Every handle returned by an allocating call must
//! be released exactly once, normally through a
//! [`ValueArena`](crate::arena::ValueArena).
//!
//! Entry into the engine is serialized by one reentrant lock
//! ([`SharedEngine`]): a call holds it for its whole duration, and an engine
//! callback that re-enters the host on the same thread may take it again.
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::error::EngineError;

pub mod handle;
pub mod handle_stats;
pub mod native_function;
pub mod script_engine;
pub mod value;

pub use handle::{AtomHandle, ValueHandle};
pub use handle_stats::{HandleEvent, HandleStats};
pub use native_function::{NativeFn, NativeFunction};
pub use script_engine::ScriptEngine;
pub use value::{EngineObject, EngineValue};

/// An engine behind its single-call lock.
pub type SharedEngine<E> = Arc<ReentrantMutex<E>>;

pub fn share<E>(engine: E) -> SharedEngine<E> {
    Arc::new(ReentrantMutex::new(engine))
}

pub trait EngineApi {
    /// New handle to the global object.
    fn global_object(&self) -> Result<ValueHandle, EngineError>;

    /// New handle to `object[name]`; `undefined` when the property is absent.
    fn get_property(&self, object: ValueHandle, name: &str) -> Result<ValueHandle, EngineError>;

    fn new_atom(&self, name: &str) -> Result<AtomHandle, EngineError>;

    fn free_atom(&self, atom: AtomHandle);

    fn new_string(&self, value: &str) -> Result<ValueHandle, EngineError>;

    /// Calls `this[method](...args)`. The arguments stay owned by the caller;
    /// the result is a new handle owned by the caller.
    fn invoke(
        &self,
        this: ValueHandle,
        method: AtomHandle,
        args: &[ValueHandle],
    ) -> Result<ValueHandle, EngineError>;

    fn free_value(&self, value: ValueHandle);

    // Conversions. None of the readers take ownership of their argument.

    fn new_string_array(&self, items: &[String]) -> Result<ValueHandle, EngineError>;

    fn new_boolean(&self, value: bool) -> Result<ValueHandle, EngineError>;

    fn read_string(&self, value: ValueHandle) -> Result<String, EngineError>;

    fn read_string_array(&self, value: ValueHandle) -> Result<Vec<String>, EngineError>;

    fn read_boolean(&self, value: ValueHandle) -> Result<bool, EngineError>;

    fn is_object(&self, value: ValueHandle) -> bool;

    /// Whether `object[method]` is callable. Used to fail before marshalling
    /// any argument.
    fn has_function(&self, object: ValueHandle, method: AtomHandle) -> bool;
}

/// Installing host functions into the engine's global scope.
pub trait NativeExports: EngineApi {
    /// Defines `globalThis[name]` as an object whose properties are
    /// `functions`, replacing any previous value.
    fn define_global_object(
        &self,
        name: &str,
        functions: Vec<NativeFunction>,
    ) -> Result<(), EngineError>;

    /// Removes `globalThis[name]`; returns whether it was present.
    fn remove_global(&self, name: &str) -> bool;
}

#[cfg(test)]
mod script_engine_test;
