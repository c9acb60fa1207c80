//! Huddle console chat client.
//!
//! Connects, logs on with the given id, and relays lines typed on stdin.
//! Lines starting with `#` are client commands (`#quit`, `#logoff`,
//! `#login`, `#sethost`, `#setport`, `#gethost`, `#getport`).
//!
//!   cargo run -p huddle-client -- alice
//!   cargo run -p huddle-client -- bob chat.example.org 6000

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use huddle_client::{WsClientTransport, establish};
use huddle_core::{ChatClient, ClientConfig, StdoutConsole};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

#[derive(Debug, Parser)]
#[command(name = "huddle-client", version, about = "Console chat client")]
struct Args {
    /// Login id announced to the server (no whitespace)
    login_id: String,

    /// Server host [default: localhost]
    #[arg(env = "HUDDLE_HOST")]
    host: Option<String>,

    /// Server port [default: 5555]
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
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    init_tracing(config.log.as_deref())?;

    if args.login_id.is_empty() || args.login_id.contains(char::is_whitespace) {
        anyhow::bail!("login id must be a single word, got {:?}", args.login_id);
    }

    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let client = ChatClient::new(
        args.login_id,
        WsClientTransport::new(host, port, events_tx),
        StdoutConsole,
    );

    match establish(&client, &mut events).await {
        Ok(flow) if flow.is_terminate() => return Ok(()),
        Ok(_) => {}
        Err(e) => {
            tracing::error!("{}", e);
            println!("Error: Can't setup connection! Terminating client.");
            std::process::exit(1);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    if client.handle_line(&line).is_terminate() {
                        break;
                    }
                }
                Ok(None) => console_open = false,
                Err(e) => {
                    tracing::warn!("Unexpected error while reading from console: {}", e);
                    console_open = false;
                }
            },
            Some(event) = events.recv() => {
                if client.handle_event(event).is_terminate() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = client.quit();
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing(extra: Option<&str>) -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env()
        .add_directive("huddle_client=warn".parse()?)
        .add_directive("huddle_core=warn".parse()?);
    if let Some(directive) = extra {
        filter = filter.add_directive(
            directive
                .parse::<Directive>()
                .with_context(|| format!("invalid log directive: {directive}"))?,
        );
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
