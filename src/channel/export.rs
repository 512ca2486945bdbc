use std::sync::{Arc, Weak};

use tracing::trace;

use crate::{
    channel::CallChannel,
    engine::{NativeExports, NativeFunction, ValueHandle},
    error::{BridgeError, EngineError},
    protocol::{
        DISCONNECT, INVOKE, INVOKE_SUSPENDING, SERVICE_NAMES_ARRAY, encode_outcome,
    },
};

/// Installs `channel` as `globalThis[global_name]`, an object with one native
/// function per call-channel operation.
///
/// The engine holds the channel weakly: once its owner is dropped the
/// exported functions answer as a closed channel.
pub fn export_channel<E: NativeExports + ?Sized>(
    engine: &E,
    global_name: &str,
    channel: Weak<dyn CallChannel>,
) -> Result<(), EngineError> {
    trace!(global_name, "exporting call channel");
    engine.define_global_object(
        global_name,
        vec![
            service_names_array(channel.clone()),
            invoke(channel.clone()),
            invoke_suspending(channel.clone()),
            disconnect(channel),
        ],
    )
}

fn upgrade(channel: &Weak<dyn CallChannel>) -> Result<Arc<dyn CallChannel>, BridgeError> {
    channel.upgrade().ok_or(BridgeError::ChannelClosed)
}

fn arg(args: &[ValueHandle], index: usize) -> Result<ValueHandle, EngineError> {
    args.get(index)
        .copied()
        .ok_or_else(|| EngineError::Exception(format!("missing argument {}", index)))
}

fn service_names_array(channel: Weak<dyn CallChannel>) -> NativeFunction {
    NativeFunction::new(SERVICE_NAMES_ARRAY, move |engine, _args| {
        let outcome = upgrade(&channel).and_then(|channel| channel.service_names_array());
        engine.new_string_array(&encode_outcome(&outcome))
    })
}

fn invoke(channel: Weak<dyn CallChannel>) -> NativeFunction {
    NativeFunction::new(INVOKE, move |engine, args| {
        let instance_name = engine.read_string(arg(args, 0)?)?;
        let fun_name = engine.read_string(arg(args, 1)?)?;
        let encoded_arguments = engine.read_string_array(arg(args, 2)?)?;

        let outcome = upgrade(&channel)
            .and_then(|channel| channel.invoke(&instance_name, &fun_name, &encoded_arguments));
        engine.new_string_array(&encode_outcome(&outcome))
    })
}

fn invoke_suspending(channel: Weak<dyn CallChannel>) -> NativeFunction {
    NativeFunction::new(INVOKE_SUSPENDING, move |engine, args| {
        let instance_name = engine.read_string(arg(args, 0)?)?;
        let fun_name = engine.read_string(arg(args, 1)?)?;
        let encoded_arguments = engine.read_string_array(arg(args, 2)?)?;
        let callback_name = engine.read_string(arg(args, 3)?)?;

        let outcome = upgrade(&channel)
            .and_then(|channel| {
                channel.invoke_suspending(
                    &instance_name,
                    &fun_name,
                    &encoded_arguments,
                    &callback_name,
                )
            })
            .map(|()| Vec::new());
        engine.new_string_array(&encode_outcome(&outcome))
    })
}

fn disconnect(channel: Weak<dyn CallChannel>) -> NativeFunction {
    NativeFunction::new(DISCONNECT, move |engine, args| {
        let instance_name = engine.read_string(arg(args, 0)?)?;
        let removed = match upgrade(&channel).and_then(|channel| channel.disconnect(&instance_name)) {
            Ok(removed) => removed,
            Err(err) => {
                trace!(instance_name = %instance_name, %err, "disconnect on a closed side");
                false
            }
        };
        engine.new_boolean(removed)
    })
}
