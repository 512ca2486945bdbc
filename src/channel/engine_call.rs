use tracing::trace;

use crate::{
    arena::ValueArena,
    channel::Liveness,
    engine::{EngineApi, SharedEngine, ValueHandle},
    error::{BridgeError, EngineError},
    protocol::{DISCONNECT, INVOKE, INVOKE_SUSPENDING, SERVICE_NAMES_ARRAY, decode_outcome},
};

/// Marshalling shared by the inbound and outbound channels: each crosses into
/// the object its peer exported under `global_name`.
pub(crate) struct EngineCall<E> {
    engine: SharedEngine<E>,
    liveness: Liveness,
    global_name: String,
}

impl<E: EngineApi + Send> EngineCall<E> {
    pub(crate) fn new(engine: SharedEngine<E>, liveness: Liveness, global_name: &str) -> Self {
        Self {
            engine,
            liveness,
            global_name: global_name.to_string(),
        }
    }

    pub(crate) fn global_name(&self) -> &str {
        &self.global_name
    }

    /// One crossing: liveness check, bridge object and method lookup, argument
    /// marshalling, invoke, conversion. Every handle acquired along the way
    /// belongs to the arena and is released newest-first when it drops,
    /// whichever step fails.
    fn call<R>(
        &self,
        method: &str,
        marshal: impl FnOnce(&mut ValueArena<'_, E>) -> Result<Vec<ValueHandle>, EngineError>,
        convert: impl FnOnce(&E, ValueHandle) -> Result<R, BridgeError>,
    ) -> Result<R, BridgeError> {
        self.liveness.check_not_closed()?;

        let engine = self.engine.lock();
        let mut arena = ValueArena::new(&*engine);
        let global = arena.global_object()?;
        let channel = arena.get_property(global, &self.global_name)?;
        if !engine.is_object(channel) {
            trace!(global = %self.global_name, "peer bridge object is gone");
            return Err(BridgeError::ChannelClosed);
        }
        let property = arena.new_atom(method)?;
        if !engine.has_function(channel, property) {
            return Err(EngineError::NotAFunction(method.to_string()).into());
        }

        let args = marshal(&mut arena)?;
        trace!(global = %self.global_name, method, args = args.len(), "crossing bridge");
        let result = arena.invoke(channel, property, &args)?;
        convert(&*engine, result)
    }

    pub(crate) fn service_names_array(&self) -> Result<Vec<String>, BridgeError> {
        self.call(
            SERVICE_NAMES_ARRAY,
            |_| Ok(Vec::new()),
            |engine, result| decode_outcome(engine.read_string_array(result)?),
        )
    }

    pub(crate) fn invoke(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
    ) -> Result<Vec<String>, BridgeError> {
        self.call(
            INVOKE,
            |arena| {
                Ok(vec![
                    arena.new_string(instance_name)?,
                    arena.new_string(fun_name)?,
                    arena.new_string_array(encoded_arguments)?,
                ])
            },
            |engine, result| decode_outcome(engine.read_string_array(result)?),
        )
    }

    pub(crate) fn invoke_suspending(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
        callback_name: &str,
    ) -> Result<(), BridgeError> {
        self.call(
            INVOKE_SUSPENDING,
            |arena| {
                Ok(vec![
                    arena.new_string(instance_name)?,
                    arena.new_string(fun_name)?,
                    arena.new_string_array(encoded_arguments)?,
                    arena.new_string(callback_name)?,
                ])
            },
            |engine, result| decode_outcome(engine.read_string_array(result)?).map(|_| ()),
        )
    }

    pub(crate) fn disconnect(&self, instance_name: &str) -> Result<bool, BridgeError> {
        self.call(
            DISCONNECT,
            |arena| Ok(vec![arena.new_string(instance_name)?]),
            |engine, result| Ok(engine.read_boolean(result)?),
        )
    }
}
