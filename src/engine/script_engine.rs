use std::{cell::RefCell, sync::Arc};

use tracing::error;

use crate::{
    engine::{
        AtomHandle, EngineApi, HandleEvent, HandleStats, NativeExports, NativeFunction,
        ValueHandle,
        value::{EngineObject, EngineValue},
    },
    error::EngineError,
};

struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

/// Generational slot table. Freed slots are reused through the free list
/// before the storage vector grows.
struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T> HandleTable<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    fn insert(&mut self, item: T) -> (u32, u32) {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            (index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                item: Some(item),
            });
            (index, 0)
        }
    }

    fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.item.as_ref())
    }

    fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(index);
        Some(item)
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.item.is_some()).count()
    }
}

struct HandleHeap {
    values: HandleTable<EngineValue>,
    atoms: HandleTable<Arc<str>>,
    stats: HandleStats,
    fail_after: Option<usize>,
    trace: Option<Vec<HandleEvent>>,
}

impl HandleHeap {
    fn check_allocation(&mut self) -> Result<(), EngineError> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                Err(EngineError::OutOfMemory)
            }
            Some(n) => {
                self.fail_after = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn alloc_value(&mut self, value: EngineValue, origin: String) -> Result<ValueHandle, EngineError> {
        self.check_allocation()?;
        let (index, generation) = self.values.insert(value);
        let handle = ValueHandle::new(index, generation);
        self.stats.record_value_acquired();
        self.record(HandleEvent::AcquireValue { handle, origin });
        Ok(handle)
    }

    fn value(&self, handle: ValueHandle) -> Result<&EngineValue, EngineError> {
        self.values
            .get(handle.index, handle.generation)
            .ok_or(EngineError::InvalidHandle)
    }

    fn atom(&self, handle: AtomHandle) -> Result<&Arc<str>, EngineError> {
        self.atoms
            .get(handle.index, handle.generation)
            .ok_or(EngineError::InvalidHandle)
    }

    fn record(&mut self, event: HandleEvent) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(event);
        }
    }
}

/// Small handle-table script engine.
///
/// Values live in a generational table addressed by [`ValueHandle`]; the
/// global object and the objects reachable from it are shared `Arc`s that
/// outlive handles. The engine is single-threaded by construction (its heap
/// sits in a `RefCell`), so it is shared across threads only behind
/// [`SharedEngine`](super::SharedEngine).
///
/// Besides implementing [`EngineApi`] it keeps leak accounting, an optional
/// ordered trace of handle events, and one-shot allocation-failure injection.
pub struct ScriptEngine {
    global: Arc<EngineObject>,
    heap: RefCell<HandleHeap>,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self {
            global: Arc::new(EngineObject::new()),
            heap: RefCell::new(HandleHeap {
                values: HandleTable::new(),
                atoms: HandleTable::new(),
                stats: HandleStats::default(),
                fail_after: None,
                trace: None,
            }),
        }
    }

    /// Sets `globalThis[name]` directly, outside of any handle.
    pub fn set_global(&self, name: &str, value: EngineValue) {
        self.global.set(name, value);
    }

    pub fn global_names(&self) -> Vec<String> {
        self.global.keys()
    }

    pub fn handle_stats(&self) -> HandleStats {
        self.heap.borrow().stats
    }

    /// Number of value and atom slots currently occupied.
    pub fn live_handles(&self) -> usize {
        let heap = self.heap.borrow();
        heap.values.live_count() + heap.atoms.live_count()
    }

    /// Makes the allocation `n` allocations from now fail with
    /// `OutOfMemory` (`0` fails the very next one). The failure fires once.
    pub fn fail_allocation_after(&self, n: usize) {
        self.heap.borrow_mut().fail_after = Some(n);
    }

    pub fn clear_allocation_failure(&self) {
        self.heap.borrow_mut().fail_after = None;
    }

    /// Starts recording handle events, discarding any previous trace.
    pub fn start_trace(&self) {
        self.heap.borrow_mut().trace = Some(Vec::new());
    }

    /// Stops recording and returns the events collected so far.
    pub fn take_trace(&self) -> Vec<HandleEvent> {
        self.heap.borrow_mut().trace.take().unwrap_or_default()
    }

    fn function_for(&self, this: ValueHandle, method: AtomHandle) -> Result<NativeFunction, EngineError> {
        let heap = self.heap.borrow();
        let name = heap.atom(method)?;
        match heap.value(this)? {
            EngineValue::Object(object) => match object.get(name) {
                Some(EngineValue::Function(function)) => Ok(function),
                _ => Err(EngineError::NotAFunction(name.to_string())),
            },
            other => Err(EngineError::NotAnObject(other.type_name().to_string())),
        }
    }
}

impl EngineApi for ScriptEngine {
    fn global_object(&self) -> Result<ValueHandle, EngineError> {
        let global = EngineValue::Object(self.global.clone());
        self.heap
            .borrow_mut()
            .alloc_value(global, String::from("global"))
    }

    fn get_property(&self, object: ValueHandle, name: &str) -> Result<ValueHandle, EngineError> {
        let mut heap = self.heap.borrow_mut();
        let value = match heap.value(object)? {
            EngineValue::Object(object) => object.get(name).unwrap_or(EngineValue::Undefined),
            other => return Err(EngineError::NotAnObject(other.type_name().to_string())),
        };
        heap.alloc_value(value, format!("property {}", name))
    }

    fn new_atom(&self, name: &str) -> Result<AtomHandle, EngineError> {
        let mut heap = self.heap.borrow_mut();
        heap.check_allocation()?;
        let (index, generation) = heap.atoms.insert(Arc::from(name));
        let handle = AtomHandle::new(index, generation);
        heap.stats.record_atom_acquired();
        heap.record(HandleEvent::AcquireAtom {
            handle,
            name: name.to_string(),
        });
        Ok(handle)
    }

    fn free_atom(&self, atom: AtomHandle) {
        let mut heap = self.heap.borrow_mut();
        if heap.atoms.remove(atom.index, atom.generation).is_some() {
            heap.stats.record_atom_released();
            heap.record(HandleEvent::ReleaseAtom(atom));
        } else {
            error!(%atom, "atom released twice");
            heap.stats.record_double_free();
            heap.record(HandleEvent::DoubleFree(atom.to_string()));
        }
    }

    fn new_string(&self, value: &str) -> Result<ValueHandle, EngineError> {
        self.heap.borrow_mut().alloc_value(
            EngineValue::String(Arc::from(value)),
            format!("string {:?}", value),
        )
    }

    fn invoke(
        &self,
        this: ValueHandle,
        method: AtomHandle,
        args: &[ValueHandle],
    ) -> Result<ValueHandle, EngineError> {
        // The heap borrow ends here: the native function re-enters the engine.
        let function = self.function_for(this, method)?;
        self.heap
            .borrow_mut()
            .record(HandleEvent::Call(function.name.to_string()));
        (function.func)(self, args)
    }

    fn free_value(&self, value: ValueHandle) {
        let mut heap = self.heap.borrow_mut();
        if heap.values.remove(value.index, value.generation).is_some() {
            heap.stats.record_value_released();
            heap.record(HandleEvent::ReleaseValue(value));
        } else {
            error!(%value, "value released twice");
            heap.stats.record_double_free();
            heap.record(HandleEvent::DoubleFree(value.to_string()));
        }
    }

    fn new_string_array(&self, items: &[String]) -> Result<ValueHandle, EngineError> {
        self.heap.borrow_mut().alloc_value(
            EngineValue::string_array(items),
            format!("array [{}]", items.len()),
        )
    }

    fn new_boolean(&self, value: bool) -> Result<ValueHandle, EngineError> {
        self.heap
            .borrow_mut()
            .alloc_value(EngineValue::Boolean(value), format!("boolean {}", value))
    }

    fn read_string(&self, value: ValueHandle) -> Result<String, EngineError> {
        match self.heap.borrow().value(value)? {
            EngineValue::String(s) => Ok(s.to_string()),
            other => Err(EngineError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    fn read_string_array(&self, value: ValueHandle) -> Result<Vec<String>, EngineError> {
        let heap = self.heap.borrow();
        let EngineValue::Array(items) = heap.value(value)? else {
            return Err(EngineError::TypeMismatch {
                expected: "array",
                found: heap.value(value)?.type_name(),
            });
        };
        items
            .iter()
            .map(|item| match item {
                EngineValue::String(s) => Ok(s.to_string()),
                other => Err(EngineError::TypeMismatch {
                    expected: "string",
                    found: other.type_name(),
                }),
            })
            .collect()
    }

    fn read_boolean(&self, value: ValueHandle) -> Result<bool, EngineError> {
        match self.heap.borrow().value(value)? {
            EngineValue::Boolean(b) => Ok(*b),
            other => Err(EngineError::TypeMismatch {
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }

    fn is_object(&self, value: ValueHandle) -> bool {
        matches!(self.heap.borrow().value(value), Ok(EngineValue::Object(_)))
    }

    fn has_function(&self, object: ValueHandle, method: AtomHandle) -> bool {
        self.function_for(object, method).is_ok()
    }
}

impl NativeExports for ScriptEngine {
    fn define_global_object(
        &self,
        name: &str,
        functions: Vec<NativeFunction>,
    ) -> Result<(), EngineError> {
        let object = EngineObject::with_properties(
            functions
                .into_iter()
                .map(|function| (function.name.to_string(), EngineValue::Function(function))),
        );
        self.global.set(name, EngineValue::Object(Arc::new(object)));
        Ok(())
    }

    fn remove_global(&self, name: &str) -> bool {
        self.global.remove(name).is_some()
    }
}
