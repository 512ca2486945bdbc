use std::{env, fs, process, sync::Arc};

use futures::{
    FutureExt,
    executor::block_on,
    future::{self, BoxFuture},
};
use tracing_subscriber::EnvFilter;

use flux_bridge::{
    adapter::RawAdapter,
    bridge::Bridge,
    config::BridgeOptions,
    engine::{ScriptEngine, share},
    error::BridgeError,
    guest::GuestRuntime,
    services::{
        EchoAdapter, EchoRequest, EchoResponse, EchoService, SuspendingEchoAdapter,
        SuspendingEchoService, raw_echo_service, raw_suspending_echo_service,
    },
};

/// Host-side echo the engine side calls back into.
struct HostEcho;

impl EchoService for HostEcho {
    fn echo(&self, request: EchoRequest) -> Result<EchoResponse, BridgeError> {
        Ok(EchoResponse {
            message: format!("{} from host", request.message),
        })
    }
}

/// Engine-side echo that answers through a callback.
struct GuestEcho;

impl SuspendingEchoService for GuestEcho {
    fn echo(&self, request: EchoRequest) -> BoxFuture<'static, Result<EchoResponse, BridgeError>> {
        let message = format!("{} from guest", request.message);
        future::ready(Ok(EchoResponse { message })).boxed()
    }
}

fn main() {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let leak_detector = args.iter().any(|arg| arg == "--leak-detector");
    let trace = args.iter().any(|arg| arg == "--trace");
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return;
    }
    if leak_detector {
        args.retain(|arg| arg != "--leak-detector");
    }
    if trace {
        args.retain(|arg| arg != "--trace");
    }
    let options = match extract_config(&mut args) {
        Some(options) => options,
        None => process::exit(1),
    };

    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let message = if args.is_empty() {
        String::from("hello")
    } else {
        args.join(" ")
    };

    if let Err(err) = run(options, &message, leak_detector) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run(options: BridgeOptions, message: &str, leak_detector: bool) -> Result<(), BridgeError> {
    let engine = share(ScriptEngine::new());
    let guest = GuestRuntime::attach(engine.clone(), &options)?;
    guest
        .endpoint()
        .set("echo", &RawAdapter, Arc::new(raw_echo_service()))?;
    guest
        .endpoint()
        .set("echoAsync", &RawAdapter, Arc::new(raw_suspending_echo_service()))?;
    guest
        .endpoint()
        .set("guestEcho", &SuspendingEchoAdapter, Arc::new(GuestEcho))?;

    let bridge = Bridge::new(engine.clone(), options)?;
    bridge.endpoint().set("hostEcho", &EchoAdapter, Arc::new(HostEcho))?;

    let echo = bridge.endpoint().get("echo", &RawAdapter)?;
    let reply = echo.call("call", &[message.to_string()])?;
    println!("echo.call           -> {:?}", reply);

    let echo_async = bridge.endpoint().get("echoAsync", &RawAdapter)?;
    let reply = block_on(echo_async.call_suspending("call", &[message.to_string()])?)?;
    println!("echoAsync.call      -> {:?}", reply);

    let host_echo = guest.endpoint().get("hostEcho", &EchoAdapter)?;
    let reply = host_echo.echo(EchoRequest::new(message))?;
    println!("hostEcho.echo       -> {:?}", reply.message);

    let guest_echo = bridge.endpoint().get("guestEcho", &SuspendingEchoAdapter)?;
    let reply = block_on(guest_echo.echo(EchoRequest::new(message)))?;
    println!("guestEcho.echo      -> {:?}", reply.message);

    println!("host services:  {:?}", bridge.endpoint().service_names());
    println!("guest services: {:?}", bridge.endpoint().remote_service_names()?);

    bridge.close();
    guest.close();
    if leak_detector {
        println!("{}", engine.lock().handle_stats());
    }
    Ok(())
}

fn extract_config(args: &mut Vec<String>) -> Option<BridgeOptions> {
    let mut options = BridgeOptions::default();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--config" {
            if i + 1 >= args.len() {
                eprintln!("Usage: flux-bridge --config <options.json> [message]");
                return None;
            }
            let path = args.remove(i + 1);
            args.remove(i);
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    eprintln!("Error: cannot read {}: {}", path, err);
                    return None;
                }
            };
            options = match BridgeOptions::from_json(&source) {
                Ok(options) => options,
                Err(err) => {
                    eprintln!("Error: invalid options in {}: {}", path, err);
                    return None;
                }
            };
            continue;
        }
        i += 1;
    }
    Some(options)
}

fn print_help() {
    println!("Usage: flux-bridge [--trace] [--leak-detector] [--config <options.json>] [message]");
    println!();
    println!("Runs the echo services across a host/engine bridge and prints each reply.");
    println!("  --trace           log every crossing at trace level");
    println!("  --leak-detector   print engine handle accounting on exit");
    println!("  --config <file>   read bridge options from a JSON file");
}
