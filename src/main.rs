//! tvstream - TV stream player lifecycle
//!
//! Runs the lifecycle controller against a simulated native player and
//! a headless host, reading input events from stdin.
//!
//! # Usage
//!
//! ```bash
//! tvstream
//! RUST_LOG=tvstream=debug tvstream --backend-url http://localhost:3000/stream-url
//! ```

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, InputLine};
use tvstream::host::{HeadlessHost, SoftwareMixer, DEFAULT_USER_AGENT};
use tvstream::player::{SimulatedPlayer, SimulatedPlayerRemote};
use tvstream::{App, Config, Event, EventSender, StreamResolver};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = load_config(&cli)?;
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let player = SimulatedPlayer::new(Duration::from_millis(cli.prepare_ms));
    let remote = player.remote();

    let app = App::new(
        &config,
        Box::new(player),
        Arc::new(StreamResolver::new(&config)),
        Arc::new(HeadlessHost::new(user_agent)),
        Box::new(SoftwareMixer::default()),
    );

    tokio::spawn(read_stdin(app.sender(), remote));
    app.run().await;

    // The stdin reader may still be parked on a blocking read
    std::process::exit(0);
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Defaults ← config file ← environment ← command-line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let mut config = config.with_env_overrides();

    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(url) = &cli.ip_service_url {
        config.ip_service_url = url.clone();
    }
    if let Some(ua) = &cli.user_agent {
        config.user_agent = Some(ua.clone());
    }
    Ok(config)
}

/// Turn stdin lines into events until EOF
async fn read_stdin(events: EventSender, remote: SimulatedPlayerRemote) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };

        let event = match InputLine::parse(&line) {
            Some(InputLine::Key(code)) => Event::Key(code),
            Some(InputLine::Visibility(v)) => Event::Visibility(v),
            Some(InputLine::EndOfStream) => {
                remote.end_of_stream();
                continue;
            }
            Some(InputLine::PlayerError(message)) => {
                remote.raise_error(message);
                continue;
            }
            Some(InputLine::Quit) => break,
            None => {
                debug!(line = %line, "Unrecognized input");
                continue;
            }
        };

        if events.send(event).is_err() {
            return;
        }
    }

    let _ = events.send(Event::Shutdown);
}
