//! cad-bridge: RPC bridge between AI assistants and a CAD document
//!
//! `cad-bridge serve` runs the bridge server against the in-memory engine.
//! `cad-bridge call` sends a single call to a running bridge.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use cad_bridge_mcp::bridge;
use cad_bridge_mcp::config::{self, Config};
use cad_bridge_mcp::engine::MemoryHost;
use cad_bridge_mcp::rpc::{BridgeServer, RpcClient, SERVER_NAME};

/// RPC bridge between AI assistants and a CAD document.
///
/// Exposes sketch and extrusion commands over a local JSON-RPC socket and
/// runs every command on a single executor.
#[derive(Parser, Debug)]
#[command(name = "cad-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the bridge server until interrupted
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Call one bridge method and print its result
    Call {
        /// Method name, e.g. `create_cylinder`
        method: String,

        /// Positional arguments; each is parsed as JSON, else taken as a string
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
    },
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses one CLI argument into a call parameter.
fn parse_param(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

fn build_runtime() -> Option<tokio::runtime::Runtime> {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            None
        }
    }
}

/// Waits for SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
    Ok(())
}

/// Waits for Ctrl+C.
#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, initiating graceful shutdown");
    Ok(())
}

fn serve(cfg: &Config, port: Option<u16>) -> ExitCode {
    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "{SERVER_NAME} {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting {SERVER_NAME}");

    let mut server_config = cfg.server.clone();
    if let Some(port) = port {
        server_config.port = port;
    }

    let (dispatcher, executor) = bridge::channel(MemoryHost::with_empty_design());
    // The executor thread ends once the server and its connections drop their
    // dispatchers; it is never joined.
    if let Err(e) = executor.spawn() {
        error!(error = %e, "Failed to start command executor");
        return ExitCode::FAILURE;
    }

    let mut server = BridgeServer::new(server_config, dispatcher);
    if let Err(e) = server.start() {
        error!(error = %e, "Failed to start bridge server");
        return ExitCode::FAILURE;
    }

    if let Some(addr) = server.local_addr() {
        info!(%addr, "Bridge ready, waiting for calls...");
    }

    let Some(runtime) = build_runtime() else {
        server.stop();
        return ExitCode::FAILURE;
    };

    let result = runtime.block_on(shutdown_signal());
    server.stop();

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signals");
            ExitCode::FAILURE
        }
    }
}

fn call(cfg: &Config, method: &str, args: &[String]) -> ExitCode {
    let params = args.iter().map(|arg| parse_param(arg)).collect();
    let client = RpcClient::new(cfg.client.clone());

    let Some(runtime) = build_runtime() else {
        return ExitCode::FAILURE;
    };

    match runtime.block_on(client.call(method, params)) {
        Ok(envelope) => {
            println!("{}", envelope.to_text());
            if envelope.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            println!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Entry point for the cad-bridge binary.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    match &args.command {
        Cmd::Serve { port } => serve(&cfg, *port),
        Cmd::Call { method, args } => call(&cfg, method, args),
    }
}
