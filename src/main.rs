use std::net::SocketAddr;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use kubelift::metrics::REGISTRY;
use kubelift::options::{DrainDirectives, DrainTarget};
use kubelift::state::{NoopNotifier, ReadinessNotifier, State, SystemdNotifier};
use kubelift::Error;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Track the cluster readiness until interrupted, then report the drain plan
    Run(RunArgs),
    /// Show version information
    Version,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Resources to drain on stop: all, none or a comma separated list of
    /// pods, iptables, kubeletmanifests
    #[arg(long, env = "KUBELIFT_DRAIN", default_value = "all")]
    drain: DrainDirectives,

    /// Listen address of the status API
    #[arg(long, env = "KUBELIFT_BIND_ADDRESS", default_value = "127.0.0.1:8989")]
    bind_address: SocketAddr,

    /// Notify systemd through $NOTIFY_SOCKET once ready
    #[arg(long, env = "KUBELIFT_NOTIFY_SYSTEMD", default_value_t = true, action = ArgAction::Set)]
    notify_systemd: bool,

    /// Emit logs as JSON
    #[arg(long, env = "KUBELIFT_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("kubelift v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Run(run_args) => run(run_args).await,
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn run(args: RunArgs) -> Result<(), Error> {
    init_tracing(args.log_json);

    info!("Starting kubelift v{}", env!("CARGO_PKG_VERSION"));

    let notifier: Box<dyn ReadinessNotifier> = if args.notify_systemd {
        let notifier = SystemdNotifier::from_env();
        if notifier.socket().is_none() {
            info!("NOTIFY_SOCKET not set, readiness will not be reported to systemd");
        }
        Box::new(notifier)
    } else {
        Box::new(NoopNotifier)
    };

    let state = Arc::new(State::with_registry(&REGISTRY, notifier)?);
    info!("Drain option resolved to {:?}", args.drain.to_string());

    serve(Arc::clone(&state), args.drain.clone(), args.bind_address).await?;

    info!(ready = state.is_ready(), "Stopping kubelift");
    for target in DrainTarget::ALL {
        info!(
            drain_target = %target,
            enabled = args.drain.is_enabled(target),
            "Drain plan"
        );
    }

    Ok(())
}

#[cfg(feature = "rest-api")]
async fn serve(state: Arc<State>, drain: DrainDirectives, addr: SocketAddr) -> Result<(), Error> {
    let api = kubelift::rest_api::ApiState {
        state,
        drain,
        registry: &REGISTRY,
    };
    kubelift::rest_api::run_server(api, addr, shutdown_signal()).await
}

#[cfg(not(feature = "rest-api"))]
async fn serve(_state: Arc<State>, _drain: DrainDirectives, addr: SocketAddr) -> Result<(), Error> {
    warn!("Built without the rest-api feature, not listening on {}", addr);
    shutdown_signal().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {:?}", e);
    }
    info!("Shutdown signal received");
}
