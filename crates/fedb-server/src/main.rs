//! fedb Server
//!
//! Main entry point for the fedb MySQL-compatible server.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fedb_common::config::{LoggingConfig, ServerConfig};
use fedb_protocol::Server;
use fedb_server::FedbDriver;
use fedb_storage::StorageRegistry;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

// Use jemalloc as the global allocator for better performance
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// fedb - a MySQL wire protocol compatible database server
#[derive(Parser, Debug)]
#[command(name = "fedb-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/fedb.toml")]
    config: PathBuf,

    /// Override listen host
    #[arg(long)]
    host: Option<String>,

    /// Override listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Override storage URI, e.g. local:///tmp/fedb
    #[arg(long)]
    store: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration first (needed for logging setup)
    let config = load_config(&args)?;
    init_tracing(&config.logging, args.verbose);

    print_banner();
    info!("Loading configuration from {:?}", args.config);

    if let Err(errors) = config.validate() {
        for err in &errors {
            error!("Config validation error: {}", err);
        }
        anyhow::bail!(
            "Configuration validation failed with {} error(s). \
             See log output above for details.",
            errors.len()
        );
    }

    info!(store = %config.store, "Opening storage...");
    let registry = StorageRegistry::with_builtin_drivers();
    let store = registry
        .open(&config.store)
        .await
        .with_context(|| format!("failed to open store {}", config.store))?;

    let driver = Arc::new(FedbDriver::new(store.clone()));
    let server = Arc::new(
        Server::new(config.clone(), driver)
            .await
            .with_context(|| format!("failed to listen on {}", config.listen_addr()))?,
    );
    info!("fedb server started on {}", server.local_addr());

    let graceful = Arc::new(AtomicBool::new(false));
    spawn_signal_handler(server.clone(), graceful.clone())?;

    let result = server.run().await;
    if let Err(e) = &result {
        error!("Listener failed: {}", e);
    }

    if graceful.load(Ordering::SeqCst) {
        server.graceful_down().await;
    } else {
        server.close();
        server.close_connections();
    }

    if let Err(e) = store.close().await {
        error!("Failed to close store: {}", e);
    }

    result?;
    info!("fedb server stopped");
    Ok(())
}

/// Process signals that stop the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownSignal {
    Terminate,
    Interrupt,
    Hangup,
    Quit,
}

/// The first SIGTERM drains connections, any other first signal stops at
/// once. Every signal after the first closes all remaining connections.
fn handle_shutdown_signal(
    server: &Server,
    graceful: &AtomicBool,
    signal: ShutdownSignal,
    first: bool,
) {
    if !first {
        warn!(?signal, "Received another signal, closing all connections...");
        server.close_connections();
        return;
    }
    if signal == ShutdownSignal::Terminate {
        info!("Received SIGTERM, initiating graceful shutdown...");
        graceful.store(true, Ordering::SeqCst);
    } else {
        info!(?signal, "Received signal, shutting down...");
    }
    server.close();
}

#[cfg(unix)]
fn spawn_signal_handler(server: Arc<Server>, graceful: Arc<AtomicBool>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::spawn(async move {
        let mut first = true;
        loop {
            let received = tokio::select! {
                _ = terminate.recv() => ShutdownSignal::Terminate,
                _ = interrupt.recv() => ShutdownSignal::Interrupt,
                _ = hangup.recv() => ShutdownSignal::Hangup,
                _ = quit.recv() => ShutdownSignal::Quit,
            };
            handle_shutdown_signal(&server, &graceful, received, first);
            first = false;
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_handler(server: Arc<Server>, graceful: Arc<AtomicBool>) -> anyhow::Result<()> {
    tokio::spawn(async move {
        let mut first = true;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl+c: {}", e);
                return;
            }
            handle_shutdown_signal(&server, &graceful, ShutdownSignal::Interrupt, first);
            first = false;
        }
    });
    Ok(())
}

/// Install the global subscriber: env filter, console output and an
/// optional daily-rolling log file.
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let log_level = if verbose { "debug" } else { &logging.level };
    let env_filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::filter::EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("info"));

    let use_json = logging.format == "json";

    // Build console layer (boxed to unify types)
    let console_layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if use_json {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json(),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true),
        )
    };

    let file_layer: Option<Box<dyn tracing_subscriber::Layer<_> + Send + Sync>> =
        if let Some(ref log_file) = logging.file {
            let file_appender = tracing_appender::rolling::daily(
                log_file.parent().unwrap_or_else(|| std::path::Path::new(".")),
                log_file
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("fedb.log")),
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // Leak the guard so file logging stays active for the process lifetime
            std::mem::forget(guard);

            if use_json {
                Some(Box::new(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .json(),
                ))
            } else {
                Some(Box::new(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                ))
            }
        } else {
            None
        };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn print_banner() {
    println!(
        r#"
  __          _ _
 / _| ___  __| | |__
| |_ / _ \/ _` | '_ \
|  _|  __/ (_| | |_) |
|_|  \___|\__,_|_.__/

  MySQL wire protocol front-end
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn load_config(args: &Args) -> anyhow::Result<ServerConfig> {
    let mut config = if args.config.exists() {
        ServerConfig::from_file(&args.config)?
    } else {
        ServerConfig::default()
    };

    // Apply command line overrides
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(store) = &args.store {
        config.store = store.clone();
    }

    // Apply environment variable overrides (highest priority)
    if let Ok(val) = std::env::var("FEDB_HOST") {
        config.host = val;
    }
    if let Ok(val) = std::env::var("FEDB_PORT") {
        if let Ok(port) = val.parse() {
            config.port = port;
        }
    }
    if let Ok(val) = std::env::var("FEDB_STORE") {
        config.store = val;
    }
    if let Ok(val) = std::env::var("FEDB_TCP_KEEPALIVE") {
        if let Ok(enabled) = val.parse() {
            config.tcp_keepalive = enabled;
        }
    }
    if let Ok(val) = std::env::var("FEDB_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var("FEDB_LOG_FORMAT") {
        config.logging.format = val;
    }
    if let Ok(val) = std::env::var("FEDB_LOG_FILE") {
        config.logging.file = Some(PathBuf::from(val));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedb_protocol::constants::OK_HEADER;
    use fedb_protocol::{HandshakeResponseBuilder, PacketIo};
    use fedb_storage::LocalStore;
    use std::time::Duration;
    use tokio::net::TcpStream;

    async fn start_server() -> Arc<Server> {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let driver = Arc::new(FedbDriver::new(Arc::new(LocalStore::new("/tmp/fedb-signals"))));
        let server = Arc::new(Server::new(config, driver).await.unwrap());
        let runner = server.clone();
        tokio::spawn(async move { runner.run().await });
        server
    }

    async fn login(server: &Server) -> PacketIo<TcpStream> {
        let mut client = PacketIo::new(TcpStream::connect(server.local_addr()).await.unwrap());
        client.read_message().await.unwrap();
        client
            .write_message(&HandshakeResponseBuilder::new("root").build())
            .await
            .unwrap();
        client.flush().await.unwrap();
        assert_eq!(client.read_message().await.unwrap()[0], OK_HEADER);
        client
    }

    async fn wait_for_connections(server: &Server, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while server.connection_count() != n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection count never settled");
    }

    #[tokio::test]
    async fn test_sigterm_requests_graceful_shutdown() {
        let server = start_server().await;
        let graceful = AtomicBool::new(false);
        handle_shutdown_signal(&server, &graceful, ShutdownSignal::Terminate, true);
        assert!(graceful.load(Ordering::SeqCst));
        assert!(server.registry().is_closed());
    }

    #[tokio::test]
    async fn test_sigint_stops_without_draining() {
        let server = start_server().await;
        let graceful = AtomicBool::new(false);
        handle_shutdown_signal(&server, &graceful, ShutdownSignal::Interrupt, true);
        assert!(!graceful.load(Ordering::SeqCst));
        assert!(server.registry().is_closed());
    }

    #[tokio::test]
    async fn test_second_signal_closes_connections() {
        let server = start_server().await;
        let mut client = login(&server).await;
        wait_for_connections(&server, 1).await;

        let graceful = AtomicBool::new(false);
        handle_shutdown_signal(&server, &graceful, ShutdownSignal::Terminate, true);
        // The drain leaves idle connections to graceful_down.
        assert_eq!(server.connection_count(), 1);

        handle_shutdown_signal(&server, &graceful, ShutdownSignal::Interrupt, false);
        wait_for_connections(&server, 0).await;
        assert!(client.read_message().await.is_err());
    }
}
