use std::{
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use futures::{FutureExt, channel::oneshot, executor::block_on};
use parking_lot::Mutex;

use crate::{
    adapter::{FunctionService, RawAdapter},
    channel::{CallChannel, Liveness},
    endpoint::{
        Endpoint, Spawn, SuspensionState, ThreadPoolSpawner,
        registry::{ServiceEntry, ServiceRegistry},
    },
    error::BridgeError,
};

/// Forwards straight into another endpoint's dispatcher.
#[derive(Default)]
struct Loopback {
    target: OnceLock<Weak<dyn CallChannel>>,
}

impl Loopback {
    fn peer(&self) -> Result<Arc<dyn CallChannel>, BridgeError> {
        self.target
            .get()
            .and_then(|target| target.upgrade())
            .ok_or(BridgeError::ChannelClosed)
    }
}

impl CallChannel for Loopback {
    fn service_names_array(&self) -> Result<Vec<String>, BridgeError> {
        self.peer()?.service_names_array()
    }

    fn invoke(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
    ) -> Result<Vec<String>, BridgeError> {
        self.peer()?.invoke(instance_name, fun_name, encoded_arguments)
    }

    fn invoke_suspending(
        &self,
        instance_name: &str,
        fun_name: &str,
        encoded_arguments: &[String],
        callback_name: &str,
    ) -> Result<(), BridgeError> {
        self.peer()?
            .invoke_suspending(instance_name, fun_name, encoded_arguments, callback_name)
    }

    fn disconnect(&self, instance_name: &str) -> Result<bool, BridgeError> {
        self.peer()?.disconnect(instance_name)
    }
}

fn pair() -> (Endpoint, Endpoint) {
    let to_guest = Arc::new(Loopback::default());
    let to_host = Arc::new(Loopback::default());
    let host = Endpoint::new(
        "host",
        to_guest.clone(),
        Liveness::new(),
        Arc::new(ThreadPoolSpawner::new("endpoint-test-", 2).unwrap()),
    );
    let guest = Endpoint::new(
        "guest",
        to_host.clone(),
        Liveness::new(),
        Arc::new(ThreadPoolSpawner::new("endpoint-test-", 2).unwrap()),
    );
    let _ = to_guest.target.set(guest.dispatcher());
    let _ = to_host.target.set(host.dispatcher());
    (host, guest)
}

fn echo() -> Arc<FunctionService> {
    Arc::new(
        FunctionService::new()
            .function("call", |args| Ok(args.into_iter().map(|a| a + " echo").collect()))
            .function("fail", |_| Err(BridgeError::application("EchoError", "no echo"))),
    )
}

type Gates = Arc<Mutex<Vec<oneshot::Sender<String>>>>;

/// A service whose `wait` calls complete only when the test opens their gate.
fn gated() -> (Arc<FunctionService>, Gates) {
    let gates: Gates = Arc::new(Mutex::new(Vec::new()));
    let held = gates.clone();
    let service = FunctionService::new().suspending_function("wait", move |_args| {
        let (sender, receiver) = oneshot::channel::<String>();
        held.lock().push(sender);
        async move {
            receiver
                .await
                .map(|value| vec![value])
                .map_err(|_| BridgeError::application("Gate", "dropped"))
        }
    });
    (Arc::new(service), gates)
}

#[test]
fn names_follow_set_and_disconnect() {
    let (host, guest) = pair();
    guest.set("b", &RawAdapter, echo()).unwrap();
    guest.set("a", &RawAdapter, echo()).unwrap();
    assert_eq!(guest.service_names(), vec!["a", "b"]);
    assert_eq!(host.remote_service_names().unwrap(), guest.service_names());

    assert_eq!(guest.disconnect("a"), Ok(true));
    assert_eq!(guest.disconnect("a"), Ok(false));
    assert_eq!(host.remote_service_names().unwrap(), vec!["b"]);
}

#[test]
fn proxy_calls_reach_peer_service() {
    let (host, guest) = pair();
    guest.set("echo", &RawAdapter, echo()).unwrap();
    let proxy = host.get("echo", &RawAdapter).unwrap();

    assert_eq!(proxy.instance_name(), "echo");
    assert_eq!(proxy.call("call", &[String::from("hi")]), Ok(vec![String::from("hi echo")]));
    assert_eq!(
        proxy.call("fail", &[]),
        Err(BridgeError::application("EchoError", "no echo"))
    );
    assert_eq!(
        proxy.call("nope", &[]),
        Err(BridgeError::UnknownMethod {
            service: String::from("echo"),
            method: String::from("nope"),
        })
    );
}

#[test]
fn unknown_service_is_detected_lazily() {
    let (host, guest) = pair();
    let proxy = host.get("later", &RawAdapter).unwrap();
    assert_eq!(
        proxy.call("call", &[]),
        Err(BridgeError::UnknownService(String::from("later")))
    );

    guest.set("later", &RawAdapter, echo()).unwrap();
    assert_eq!(proxy.call("call", &[String::from("x")]), Ok(vec![String::from("x echo")]));
}

#[test]
fn overwrite_closes_previous_entry() {
    let (_host, guest) = pair();
    let closes = Arc::new(AtomicUsize::new(0));
    let counter = closes.clone();
    let first = FunctionService::new().on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    guest.set("svc", &RawAdapter, Arc::new(first)).unwrap();
    guest.set("svc", &RawAdapter, echo()).unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(guest.service_names(), vec!["svc"]);
}

#[test]
fn close_hook_of_replaced_service_can_use_its_endpoint() {
    let (_host, guest) = pair();
    guest.set("companion", &RawAdapter, echo()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_endpoint = guest.clone();
    let hook_seen = seen.clone();
    let first = FunctionService::new().on_close(move || {
        let _ = hook_endpoint.disconnect("companion");
        *hook_seen.lock() = hook_endpoint.service_names();
    });
    guest.set("svc", &RawAdapter, Arc::new(first)).unwrap();

    let (done, finished) = mpsc::channel();
    let replacing = guest.clone();
    thread::spawn(move || {
        let _ = done.send(replacing.set("svc", &RawAdapter, echo()));
    });
    assert_eq!(finished.recv_timeout(Duration::from_secs(5)), Ok(Ok(())));
    assert_eq!(*seen.lock(), vec!["svc"]);
    assert_eq!(guest.service_names(), vec!["svc"]);
}

#[test]
fn closed_registry_accepts_nothing() {
    let mut registry = ServiceRegistry::default();
    registry.insert(ServiceEntry::new("a", "raw", echo())).unwrap();
    assert_eq!(registry.close().len(), 1);
    assert!(matches!(
        registry.insert(ServiceEntry::new("b", "raw", echo())),
        Err(BridgeError::ChannelClosed)
    ));
    assert!(registry.names().is_empty());
}

#[test]
fn services_registered_from_a_close_hook_do_not_survive_close() {
    let (_host, guest) = pair();
    let refused = Arc::new(Mutex::new(None));
    let hook_endpoint = guest.clone();
    let hook_refused = refused.clone();
    let closing = FunctionService::new().on_close(move || {
        *hook_refused.lock() = Some(hook_endpoint.set("late", &RawAdapter, echo()));
    });
    guest.set("closing", &RawAdapter, Arc::new(closing)).unwrap();

    assert!(guest.close());
    assert_eq!(*refused.lock(), Some(Err(BridgeError::ChannelClosed)));
    assert!(guest.service_names().is_empty());
    assert_eq!(
        guest.await_callback("cb-1", "late").err(),
        Some(BridgeError::ChannelClosed)
    );
    assert_eq!(guest.outstanding_suspensions(), 0);
}

#[test]
fn closed_endpoint_refuses_everything() {
    let (host, guest) = pair();
    guest.set("echo", &RawAdapter, echo()).unwrap();
    let proxy = host.get("echo", &RawAdapter).unwrap();

    assert!(host.close());
    assert!(!host.close());
    assert!(host.is_closed());
    assert_eq!(proxy.call("call", &[]), Err(BridgeError::ChannelClosed));
    assert_eq!(host.set("x", &RawAdapter, echo()), Err(BridgeError::ChannelClosed));
    assert!(host.get("echo", &RawAdapter).is_err());
    assert_eq!(host.disconnect("x"), Err(BridgeError::ChannelClosed));

    // The peer is a separate endpoint and stays open.
    assert_eq!(guest.service_names(), vec!["echo"]);
}

#[test]
fn suspending_call_resolves_and_cleans_up() {
    let (host, guest) = pair();
    guest
        .set(
            "echoAsync",
            &RawAdapter,
            Arc::new(FunctionService::new().suspending_function("call", |args| async move {
                Ok::<Vec<String>, BridgeError>(args.into_iter().map(|a| a + " echo").collect())
            })),
        )
        .unwrap();
    let proxy = host.get("echoAsync", &RawAdapter).unwrap();

    let pending = proxy.call_suspending("call", &[String::from("hi")]).unwrap();
    assert!(pending.callback_name().starts_with("host/echoAsync/"));
    assert_eq!(block_on(pending), Ok(vec![String::from("hi echo")]));
    assert_eq!(host.outstanding_suspensions(), 0);
    assert!(host.service_names().is_empty());
}

#[test]
fn refused_suspending_call_leaves_nothing_behind() {
    let (host, guest) = pair();
    guest.set("echo", &RawAdapter, echo()).unwrap();
    let proxy = host.get("echo", &RawAdapter).unwrap();

    // Synchronous functions can complete through a callback too.
    assert_eq!(
        block_on(proxy.call_suspending("call", &[String::from("a")]).unwrap()),
        Ok(vec![String::from("a echo")])
    );
    assert_eq!(
        proxy.call_suspending("missing", &[]).map(|_| ()),
        Err(BridgeError::UnknownMethod {
            service: String::from("echo"),
            method: String::from("missing"),
        })
    );
    assert_eq!(host.outstanding_suspensions(), 0);
    assert!(host.service_names().is_empty());
}

#[test]
fn reverse_completion_resumes_each_caller() {
    let (host, guest) = pair();
    let (service, gates) = gated();
    guest.set("gate", &RawAdapter, service).unwrap();
    let proxy = host.get("gate", &RawAdapter).unwrap();

    let first = proxy.call_suspending("wait", &[]).unwrap();
    let second = proxy.call_suspending("wait", &[]).unwrap();
    assert_eq!(
        host.suspension_state(first.callback_name()),
        Some(SuspensionState::AwaitingCallback)
    );

    let mut opened = std::mem::take(&mut *gates.lock());
    opened.pop().unwrap().send(String::from("second")).unwrap();
    opened.pop().unwrap().send(String::from("first")).unwrap();

    assert_eq!(block_on(second), Ok(vec![String::from("second")]));
    assert_eq!(block_on(first), Ok(vec![String::from("first")]));
}

#[test]
fn close_cancels_every_awaiting_suspension() {
    let (host, guest) = pair();
    let (service, _gates) = gated();
    guest.set("gate", &RawAdapter, service).unwrap();
    let proxy = host.get("gate", &RawAdapter).unwrap();

    let pending: Vec<_> = (0..3)
        .map(|_| proxy.call_suspending("wait", &[]).unwrap())
        .collect();
    assert_eq!(host.service_names().len(), 3);

    assert!(host.close());
    assert!(host.service_names().is_empty());
    assert_eq!(host.outstanding_suspensions(), 0);
    for call in pending {
        let name = call.callback_name().to_string();
        assert_eq!(block_on(call), Err(BridgeError::Cancelled(name)));
    }
}

#[test]
fn proxy_close_cancels_its_suspensions() {
    let (host, guest) = pair();
    let (service, _gates) = gated();
    guest.set("gate", &RawAdapter, service).unwrap();
    let proxy = host.get("gate", &RawAdapter).unwrap();

    let call = proxy.call_suspending("wait", &[]).unwrap();
    let name = call.callback_name().to_string();
    assert!(proxy.close());
    assert_eq!(block_on(call), Err(BridgeError::Cancelled(name)));
    assert!(host.service_names().is_empty());
    assert!(guest.service_names().is_empty());
    assert!(!proxy.close());
}

#[test]
fn second_callback_is_unknown_service() {
    let (host, guest) = pair();
    let pending = host.await_callback("cb-1", "echoAsync").unwrap().unwrap();
    assert!(host.await_callback("cb-1", "echoAsync").unwrap().is_none());

    let to_host = guest.outbound_channel();
    assert_eq!(to_host.invoke("cb-1", "call", &[String::from("hi echo")]), Ok(Vec::new()));
    assert_eq!(
        to_host.invoke("cb-1", "call", &[String::from("again")]),
        Err(BridgeError::UnknownService(String::from("cb-1")))
    );
    assert_eq!(block_on(pending), Ok(vec![String::from("hi echo")]));
}

#[test]
fn pool_workers_carry_the_name_prefix() {
    let spawner = ThreadPoolSpawner::new("pool-test-", 1).unwrap();
    let (sender, names) = mpsc::channel();
    spawner
        .spawn(
            async move {
                let _ = sender.send(thread::current().name().map(str::to_string));
            }
            .boxed(),
        )
        .unwrap();
    assert_eq!(
        names.recv_timeout(Duration::from_secs(5)),
        Ok(Some(String::from("pool-test-0")))
    );
}
