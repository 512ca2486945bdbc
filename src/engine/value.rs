use std::{collections::BTreeMap, fmt, sync::Arc};

use parking_lot::RwLock;

use crate::engine::native_function::NativeFunction;

/// Value living inside the [`ScriptEngine`](super::ScriptEngine).
///
/// Strings and arrays are immutable and shared through `Arc`; objects are the
/// only mutable values and are shared by reference, the way script objects
/// are.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    Undefined,
    Boolean(bool),
    String(Arc<str>),
    Array(Arc<Vec<EngineValue>>),
    Object(Arc<EngineObject>),
    Function(NativeFunction),
}

impl EngineValue {
    /// Returns the runtime type label used in engine errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            EngineValue::Undefined => "undefined",
            EngineValue::Boolean(_) => "boolean",
            EngineValue::String(_) => "string",
            EngineValue::Array(_) => "array",
            EngineValue::Object(_) => "object",
            EngineValue::Function(_) => "function",
        }
    }

    pub fn string_array(items: &[String]) -> Self {
        EngineValue::Array(Arc::new(
            items
                .iter()
                .map(|item| EngineValue::String(Arc::from(item.as_str())))
                .collect(),
        ))
    }
}

impl fmt::Display for EngineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineValue::Undefined => write!(f, "undefined"),
            EngineValue::Boolean(v) => write!(f, "{}", v),
            EngineValue::String(v) => write!(f, "{:?}", v),
            EngineValue::Array(items) => write!(f, "array [{}]", items.len()),
            EngineValue::Object(_) => write!(f, "object"),
            EngineValue::Function(func) => write!(f, "function {}", func.name),
        }
    }
}

/// Property bag backing `EngineValue::Object`, including the global object.
#[derive(Debug, Default)]
pub struct EngineObject {
    properties: RwLock<BTreeMap<String, EngineValue>>,
}

impl EngineObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(properties: impl IntoIterator<Item = (String, EngineValue)>) -> Self {
        Self {
            properties: RwLock::new(properties.into_iter().collect()),
        }
    }

    pub fn get(&self, name: &str) -> Option<EngineValue> {
        self.properties.read().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: EngineValue) -> Option<EngineValue> {
        self.properties.write().insert(name.to_string(), value)
    }

    pub fn remove(&self, name: &str) -> Option<EngineValue> {
        self.properties.write().remove(name)
    }

    pub fn keys(&self) -> Vec<String> {
        self.properties.read().keys().cloned().collect()
    }
}

impl PartialEq for EngineObject {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}
