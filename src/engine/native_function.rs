use std::{fmt, sync::Arc};

use crate::{
    engine::{EngineApi, ValueHandle},
    error::EngineError,
};

/// Host code callable from inside the engine.
///
/// Arguments are borrowed: the engine keeps ownership of them. The returned
/// handle is owned by whoever invoked the function.
pub type NativeFn =
    Arc<dyn Fn(&dyn EngineApi, &[ValueHandle]) -> Result<ValueHandle, EngineError> + Send + Sync>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: Arc<str>,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&dyn EngineApi, &[ValueHandle]) -> Result<ValueHandle, EngineError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}
