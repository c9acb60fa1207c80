//! Huddle chat server.
//!
//! Accepts WebSocket connections, requires `#login <id>` as each
//! connection's first message, and relays chat to everyone. Operator
//! commands are read from stdin:
//!
//!   cargo run -p huddle-server -- 5555
//!   cargo run -p huddle-server -- --config server.toml

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use huddle_core::{ChatServer, ServerConfig, StdoutConsole};
use huddle_server::WsServerTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

#[derive(Debug, Parser)]
#[command(name = "huddle-server", version, about = "Multi-user chat server")]
struct Args {
    /// Port to listen on [default: 5555]
    #[arg(env = "HUDDLE_PORT")]
    port: Option<u16>,

    /// Optional TOML config file
    #[arg(long, env = "HUDDLE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    init_tracing(config.log.as_deref())?;

    let port = args.port.unwrap_or(config.port);
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let server = ChatServer::new(WsServerTransport::new(port, events_tx), StdoutConsole);

    if let Err(e) = server.start() {
        tracing::error!("Could not listen on port {}: {}", port, e);
        println!("ERR - Could not listen for clients! Terminating Server.");
        std::process::exit(1);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    if server.handle_line(&line).is_terminate() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::info!("Console input closed; still serving connections");
                    console_open = false;
                }
                Err(e) => {
                    tracing::warn!("Unexpected error while reading from console: {}", e);
                    console_open = false;
                }
            },
            Some(event) = events.recv() => {
                if let Err(e) = server.handle_event(event) {
                    tracing::error!("{}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = server.handle_line("#quit");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing(extra: Option<&str>) -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env()
        .add_directive("huddle_server=info".parse()?)
        .add_directive("huddle_core=info".parse()?);
    if let Some(directive) = extra {
        filter = filter.add_directive(
            directive
                .parse::<Directive>()
                .with_context(|| format!("invalid log directive: {directive}"))?,
        );
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
