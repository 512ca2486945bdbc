use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize};

use crate::{
    adapter::{
        Codec, FunctionService, InboundService, JsonCodec, ServiceAdapter, SuspendedResult,
    },
    endpoint::OutboundService,
    error::BridgeError,
};

const ECHO: &str = "echo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
}

impl EchoRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

pub trait EchoService: Send + Sync {
    fn echo(&self, request: EchoRequest) -> Result<EchoResponse, BridgeError>;
}

pub trait SuspendingEchoService: Send + Sync {
    fn echo(&self, request: EchoRequest) -> BoxFuture<'static, Result<EchoResponse, BridgeError>>;
}

/// Encodes [`EchoService`] calls as one JSON request and one JSON response.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoAdapter;

struct EchoInbound(Arc<dyn EchoService>);

impl InboundService for EchoInbound {
    fn call(&self, fun_name: &str, encoded_arguments: Vec<String>) -> Result<Vec<String>, BridgeError> {
        if fun_name != ECHO {
            return Err(BridgeError::unknown_method(fun_name));
        }
        let request: EchoRequest = JsonCodec.decode(&encoded_arguments)?;
        JsonCodec.encode(&self.0.echo(request)?)
    }
}

impl ServiceAdapter for EchoAdapter {
    type Service = dyn EchoService;
    type Proxy = EchoProxy;

    fn serial_name(&self) -> &str {
        "EchoService"
    }

    fn inbound(&self, service: Arc<dyn EchoService>) -> Arc<dyn InboundService> {
        Arc::new(EchoInbound(service))
    }

    fn outbound(&self, handle: OutboundService) -> EchoProxy {
        EchoProxy { handle }
    }
}

#[derive(Debug, Clone)]
pub struct EchoProxy {
    handle: OutboundService,
}

impl EchoProxy {
    pub fn handle(&self) -> &OutboundService {
        &self.handle
    }
}

impl EchoService for EchoProxy {
    fn echo(&self, request: EchoRequest) -> Result<EchoResponse, BridgeError> {
        let encoded = self.handle.call(ECHO, &JsonCodec.encode(&request)?)?;
        JsonCodec.decode(&encoded)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SuspendingEchoAdapter;

struct SuspendingEchoInbound(Arc<dyn SuspendingEchoService>);

impl InboundService for SuspendingEchoInbound {
    fn call(&self, fun_name: &str, _encoded_arguments: Vec<String>) -> Result<Vec<String>, BridgeError> {
        Err(BridgeError::unknown_method(fun_name))
    }

    fn call_suspending(
        &self,
        fun_name: &str,
        encoded_arguments: Vec<String>,
    ) -> Result<SuspendedResult, BridgeError> {
        if fun_name != ECHO {
            return Err(BridgeError::unknown_method(fun_name));
        }
        let request: EchoRequest = JsonCodec.decode(&encoded_arguments)?;
        let response = self.0.echo(request);
        Ok(async move {
            let response: EchoResponse = response.await?;
            JsonCodec.encode(&response)
        }
        .boxed())
    }
}

impl ServiceAdapter for SuspendingEchoAdapter {
    type Service = dyn SuspendingEchoService;
    type Proxy = SuspendingEchoProxy;

    fn serial_name(&self) -> &str {
        "SuspendingEchoService"
    }

    fn inbound(&self, service: Arc<dyn SuspendingEchoService>) -> Arc<dyn InboundService> {
        Arc::new(SuspendingEchoInbound(service))
    }

    fn outbound(&self, handle: OutboundService) -> SuspendingEchoProxy {
        SuspendingEchoProxy { handle }
    }
}

#[derive(Debug, Clone)]
pub struct SuspendingEchoProxy {
    handle: OutboundService,
}

impl SuspendingEchoProxy {
    pub fn handle(&self) -> &OutboundService {
        &self.handle
    }
}

impl SuspendingEchoService for SuspendingEchoProxy {
    fn echo(&self, request: EchoRequest) -> BoxFuture<'static, Result<EchoResponse, BridgeError>> {
        let issued = JsonCodec
            .encode(&request)
            .and_then(|encoded| self.handle.call_suspending(ECHO, &encoded));
        async move {
            let encoded = issued?.await?;
            let response: EchoResponse = JsonCodec.decode(&encoded)?;
            Ok::<EchoResponse, BridgeError>(response)
        }
        .boxed()
    }
}

/// `call` appends `" echo"` to every argument.
pub fn raw_echo_service() -> FunctionService {
    FunctionService::new().function("call", |args| {
        Ok(args.into_iter().map(|arg| arg + " echo").collect())
    })
}

/// Suspending counterpart of [`raw_echo_service`].
pub fn raw_suspending_echo_service() -> FunctionService {
    FunctionService::new().suspending_function("call", |args: Vec<String>| async move {
        Ok::<Vec<String>, BridgeError>(args.into_iter().map(|arg| arg + " echo").collect())
    })
}
