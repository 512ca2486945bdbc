#![allow(dead_code)]

use std::sync::Arc;

use flux_bridge::{
    adapter::{FunctionService, RawAdapter},
    bridge::Bridge,
    config::BridgeOptions,
    engine::{HandleStats, ScriptEngine, SharedEngine, share},
    guest::GuestRuntime,
    services::{raw_echo_service, raw_suspending_echo_service},
};

/// A host bridge and a guest runtime attached to one fresh engine.
pub struct Attached {
    pub engine: SharedEngine<ScriptEngine>,
    pub guest: GuestRuntime<ScriptEngine>,
    pub bridge: Bridge<ScriptEngine>,
}

impl Attached {
    pub fn stats(&self) -> HandleStats {
        self.engine.lock().handle_stats()
    }
}

pub fn attach() -> Attached {
    let options = BridgeOptions::default();
    let engine = share(ScriptEngine::new());
    let guest = GuestRuntime::attach(engine.clone(), &options).unwrap();
    let bridge = Bridge::new(engine.clone(), options).unwrap();
    Attached {
        engine,
        guest,
        bridge,
    }
}

/// [`attach`] with the raw `echo` and `echoAsync` services registered on the
/// engine side.
pub fn attach_with_echo() -> Attached {
    let attached = attach();
    let guest = attached.guest.endpoint();
    guest
        .set("echo", &RawAdapter, Arc::new(raw_echo_service()))
        .unwrap();
    guest
        .set("echoAsync", &RawAdapter, Arc::new(raw_suspending_echo_service()))
        .unwrap();
    attached
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

pub fn failing_service(kind: &'static str, message: &'static str) -> Arc<FunctionService> {
    Arc::new(FunctionService::new().function("call", move |_| {
        Err(flux_bridge::error::BridgeError::application(kind, message))
    }))
}
