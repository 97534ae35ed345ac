//! Tailrelay - tail log folders and relay classified lines and JSON payloads.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tailrelay::config::{ConfigLoader, RelayConfig};
use tailrelay::display;
use tailrelay::server::{AppState, IngestServer, DEFAULT_EVENT_CHANNEL_CAPACITY};
use tailrelay::sink::RelayEvent;
use tailrelay::watcher::{LogWatcher, WatchedFolder};

#[derive(Parser)]
#[command(
    name = "tailrelay",
    about = "Tail log folders and relay classified lines and JSON payloads",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the configured folders and run the ingestion server.
    Run {
        /// Config file to use instead of the default search paths.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Host to bind the ingestion server to.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind the ingestion server to.
        #[arg(short, long)]
        port: Option<u16>,
        /// Only tail logs, without the HTTP server.
        #[arg(long)]
        no_server: bool,
        /// Print events as JSON lines.
        #[arg(long)]
        json: bool,
        /// Print full lines without truncation.
        #[arg(long)]
        raw: bool,
    },
    /// List the files each configured folder would track.
    Files {
        /// Config file to use instead of the default search paths.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Option<RelayConfig> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match loader.load() {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            display::print_error(&e.to_string());
            None
        }
    }
}

async fn run(mut config: RelayConfig, no_server: bool, json: bool, raw: bool) -> ExitCode {
    let (feed, mut events) = broadcast::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    let server_handle = if no_server {
        None
    } else {
        let server = IngestServer::new(AppState::new(feed.clone()), cancel.clone())
            .with_config(config.server.clone());
        let listener = match server.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "Ingestion server failed to start");
                display::print_error(&e.to_string());
                return ExitCode::FAILURE;
            }
        };
        let address = listener
            .local_addr()
            .map_or_else(|_| server.address(), |addr| addr.to_string());
        display::print_listening(&address);
        Some(tokio::spawn(server.serve(listener)))
    };

    let watcher = LogWatcher::new(Arc::new(feed.clone())).with_reader(config.tail.reader());
    let folders = std::mem::take(&mut config.folders);
    if folders.is_empty() {
        tracing::warn!("No log folders configured");
    } else if let Err(e) = watcher.start(folders).await {
        tracing::warn!(error = %e, "Log watcher not started");
    }

    if server_handle.is_none() && !watcher.is_running().await {
        display::print_error("Nothing to do: no folders are being watched and the server is disabled");
        return ExitCode::FAILURE;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => print_event(&event, json, raw),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Output fell behind, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    watcher.stop().await;
    cancel.cancel();

    let Some(handle) = server_handle else {
        return ExitCode::SUCCESS;
    };
    match handle.await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Ingestion server failed");
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Ingestion server task panicked");
            ExitCode::FAILURE
        }
    }
}

fn print_event(event: &RelayEvent, json: bool, raw: bool) {
    if json {
        display::print_event_json(event);
    } else {
        display::print_event(event, raw);
    }
}

fn list_files(config: &RelayConfig) -> ExitCode {
    if config.folders.is_empty() {
        display::print_error("No log folders configured");
        return ExitCode::FAILURE;
    }

    for spec in &config.folders {
        if !spec.enabled {
            display::print_folder_skipped(&spec.path, "disabled");
            continue;
        }
        match WatchedFolder::resolve(spec.clone()) {
            Ok(folder) => {
                let mut files = folder.discover();
                files.sort();
                display::print_folder(folder.root(), files.len());
                for file in &files {
                    display::print_tracked_file(file);
                }
            }
            Err(e) => display::print_folder_skipped(&spec.path, &e.to_string()),
        }
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            host,
            port,
            no_server,
            json,
            raw,
        } => {
            let Some(mut config) = load_config(config) else {
                return ExitCode::FAILURE;
            };
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tracing::info!(
                address = %config.server.address(),
                folders = config.folders.len(),
                no_server,
                "Starting tailrelay"
            );
            run(config, no_server, json, raw).await
        }
        Commands::Files { config } => {
            let Some(config) = load_config(config) else {
                return ExitCode::FAILURE;
            };
            list_files(&config)
        }
    }
}
