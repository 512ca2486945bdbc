//! Echo services used by the demo binary, the benches and the tests.
pub mod echo;

pub use echo::{
    EchoAdapter, EchoProxy, EchoRequest, EchoResponse, EchoService, SuspendingEchoAdapter,
    SuspendingEchoProxy, SuspendingEchoService, raw_echo_service, raw_suspending_echo_service,
};
