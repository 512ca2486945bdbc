use crate::{
    engine::{EngineApi, EngineValue, NativeExports, NativeFunction, ScriptEngine},
    error::EngineError,
};

fn engine_with_echo() -> ScriptEngine {
    let engine = ScriptEngine::new();
    engine
        .define_global_object(
            "tools",
            vec![NativeFunction::new("echo", |engine, args| {
                let text = engine.read_string(args[0])?;
                engine.new_string(&format!("{} echo", text))
            })],
        )
        .unwrap();
    engine
}

#[test]
fn allocation_and_release_are_counted() {
    let engine = ScriptEngine::new();
    let global = engine.global_object().unwrap();
    let atom = engine.new_atom("x").unwrap();
    let stats = engine.handle_stats();
    assert_eq!(stats.live_values(), 1);
    assert_eq!(stats.live_atoms(), 1);

    engine.free_atom(atom);
    engine.free_value(global);
    assert!(engine.handle_stats().is_balanced());
    assert_eq!(engine.live_handles(), 0);
}

#[test]
fn releasing_twice_is_recorded_not_applied() {
    let engine = ScriptEngine::new();
    let value = engine.new_string("hi").unwrap();
    engine.free_value(value);
    engine.free_value(value);

    let stats = engine.handle_stats();
    assert_eq!(stats.values_released, 1);
    assert_eq!(stats.double_frees, 1);
    assert!(!stats.is_balanced());
}

#[test]
fn stale_handle_does_not_alias_reused_slot() {
    let engine = ScriptEngine::new();
    let first = engine.new_string("first").unwrap();
    engine.free_value(first);
    let second = engine.new_string("second").unwrap();

    assert_eq!(first.index(), second.index());
    assert_eq!(engine.read_string(first), Err(EngineError::InvalidHandle));
    assert_eq!(engine.read_string(second).unwrap(), "second");
    engine.free_value(second);
}

#[test]
fn missing_property_reads_as_undefined() {
    let engine = ScriptEngine::new();
    let global = engine.global_object().unwrap();
    let missing = engine.get_property(global, "nothing").unwrap();
    assert!(!engine.is_object(missing));
    assert_eq!(
        engine.read_string(missing),
        Err(EngineError::TypeMismatch {
            expected: "string",
            found: "undefined",
        })
    );
    engine.free_value(missing);
    engine.free_value(global);
}

#[test]
fn invoke_calls_native_function_with_borrowed_args() {
    let engine = engine_with_echo();
    let global = engine.global_object().unwrap();
    let tools = engine.get_property(global, "tools").unwrap();
    let method = engine.new_atom("echo").unwrap();
    let arg = engine.new_string("hi").unwrap();

    assert!(engine.has_function(tools, method));
    let result = engine.invoke(tools, method, &[arg]).unwrap();
    assert_eq!(engine.read_string(result).unwrap(), "hi echo");
    assert_eq!(engine.read_string(arg).unwrap(), "hi");

    for value in [result, arg, tools, global] {
        engine.free_value(value);
    }
    engine.free_atom(method);
    assert!(engine.handle_stats().is_balanced());
}

#[test]
fn invoke_on_non_object_fails() {
    let engine = ScriptEngine::new();
    let text = engine.new_string("plain").unwrap();
    let method = engine.new_atom("anything").unwrap();
    assert_eq!(
        engine.invoke(text, method, &[]),
        Err(EngineError::NotAnObject(String::from("string")))
    );
    engine.free_atom(method);
    engine.free_value(text);
}

#[test]
fn invoke_missing_method_fails() {
    let engine = engine_with_echo();
    let global = engine.global_object().unwrap();
    let tools = engine.get_property(global, "tools").unwrap();
    let method = engine.new_atom("shout").unwrap();
    assert!(!engine.has_function(tools, method));
    assert_eq!(
        engine.invoke(tools, method, &[]),
        Err(EngineError::NotAFunction(String::from("shout")))
    );
    engine.free_atom(method);
    engine.free_value(tools);
    engine.free_value(global);
}

#[test]
fn allocation_failure_fires_once() {
    let engine = ScriptEngine::new();
    engine.fail_allocation_after(1);
    let first = engine.new_string("a").unwrap();
    assert_eq!(engine.new_string("b"), Err(EngineError::OutOfMemory));
    let third = engine.new_string("c").unwrap();
    engine.free_value(third);
    engine.free_value(first);
    assert!(engine.handle_stats().is_balanced());
}

#[test]
fn string_arrays_round_trip() {
    let engine = ScriptEngine::new();
    let items = vec![String::from("a"), String::from("b")];
    let array = engine.new_string_array(&items).unwrap();
    assert_eq!(engine.read_string_array(array).unwrap(), items);
    engine.free_value(array);
}

#[test]
fn trace_records_events_in_order() {
    let engine = ScriptEngine::new();
    engine.start_trace();
    let global = engine.global_object().unwrap();
    let flag = engine.new_boolean(true).unwrap();
    engine.free_value(flag);
    engine.free_value(global);

    let rendered: Vec<String> = engine.take_trace().iter().map(|e| e.to_string()).collect();
    assert_eq!(
        rendered,
        vec![
            "acquire v0 global",
            "acquire v1 boolean true",
            "release v1",
            "release v0",
        ]
    );
}

#[test]
fn removing_global_drops_exported_object() {
    let engine = engine_with_echo();
    assert_eq!(engine.global_names(), vec![String::from("tools")]);
    assert!(engine.remove_global("tools"));
    assert!(!engine.remove_global("tools"));

    engine.set_global("flag", EngineValue::Boolean(false));
    assert_eq!(engine.global_names(), vec![String::from("flag")]);
}
