use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use futures::FutureExt;

use crate::{
    adapter::{InboundService, ServiceAdapter, SuspendedResult},
    endpoint::OutboundService,
    error::BridgeError,
};

type SyncFn = Arc<dyn Fn(Vec<String>) -> Result<Vec<String>, BridgeError> + Send + Sync>;
type SuspendingFn = Arc<dyn Fn(Vec<String>) -> SuspendedResult + Send + Sync>;

#[derive(Clone)]
enum Function {
    Sync(SyncFn),
    Suspending(SuspendingFn),
}

/// A service assembled from named closures over encoded arguments.
///
/// A synchronous function may also be called through a suspending call; its
/// result is delivered through the callback like any other. A suspending
/// function cannot be called synchronously.
#[derive(Default)]
pub struct FunctionService {
    functions: BTreeMap<String, Function>,
    on_close: Option<Box<dyn Fn() + Send + Sync>>,
}

impl FunctionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(Vec<String>) -> Result<Vec<String>, BridgeError> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.to_string(), Function::Sync(Arc::new(func)));
        self
    }

    pub fn suspending_function<F, Fut>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<String>, BridgeError>> + Send + 'static,
    {
        let func: SuspendingFn = Arc::new(move |args| func(args).boxed());
        self.functions
            .insert(name.to_string(), Function::Suspending(func));
        self
    }

    /// Runs `hook` when the service is closed by its endpoint.
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for FunctionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionService")
            .field("functions", &self.function_names())
            .finish()
    }
}

impl InboundService for FunctionService {
    fn call(&self, fun_name: &str, encoded_arguments: Vec<String>) -> Result<Vec<String>, BridgeError> {
        match self.functions.get(fun_name) {
            Some(Function::Sync(func)) => func(encoded_arguments),
            _ => Err(BridgeError::unknown_method(fun_name)),
        }
    }

    fn call_suspending(
        &self,
        fun_name: &str,
        encoded_arguments: Vec<String>,
    ) -> Result<SuspendedResult, BridgeError> {
        match self.functions.get(fun_name) {
            Some(Function::Suspending(func)) => Ok(func(encoded_arguments)),
            Some(Function::Sync(func)) => {
                let result = func(encoded_arguments);
                Ok(futures::future::ready(result).boxed())
            }
            None => Err(BridgeError::unknown_method(fun_name)),
        }
    }

    fn close(&self) {
        if let Some(hook) = &self.on_close {
            hook();
        }
    }
}

/// Adapter for services that work on encoded strings directly. The proxy is
/// the untyped [`OutboundService`] handle itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawAdapter;

impl ServiceAdapter for RawAdapter {
    type Service = FunctionService;
    type Proxy = OutboundService;

    fn serial_name(&self) -> &str {
        "raw"
    }

    fn inbound(&self, service: Arc<FunctionService>) -> Arc<dyn InboundService> {
        service
    }

    fn outbound(&self, handle: OutboundService) -> OutboundService {
        handle
    }
}
