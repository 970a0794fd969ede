//! CLI - launcher for running the player lifecycle without TV hardware
//!
//! Runs the application against the simulated player and a headless host.
//! Lines on stdin become events.
//!
//! # Examples
//!
//! ```bash
//! # Start playback, pause, resume, background, foreground, exit
//! printf '19\n415\nhide\nshow\n10009\n' | tvstream
//!
//! # Point at a local backend
//! tvstream --backend-url http://localhost:3000/stream-url --log-json
//! ```

use clap::Parser;
use std::path::PathBuf;

use tvstream::models::Visibility;

/// tvstream - TV stream player lifecycle
#[derive(Parser, Debug)]
#[command(
    name = "tvstream",
    version,
    about = "Drive a TV stream player lifecycle from stdin",
    long_about = "Resolves the stream URL, drives a simulated native player \
                  and reads input events from stdin.\n\n\
                  Input lines: a key code (e.g. 19, 415, 413, 10009), \
                  'hide', 'show', 'end', 'fail <message>', 'quit'."
)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Stream backend URL
    #[arg(long)]
    pub backend_url: Option<String>,

    /// IP-echo service URL
    #[arg(long)]
    pub ip_service_url: Option<String>,

    /// User-agent reported by the host
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Simulated prepare duration in milliseconds
    #[arg(long, default_value_t = 500)]
    pub prepare_ms: u64,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// One parsed line of stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Key(u32),
    Visibility(Visibility),
    EndOfStream,
    PlayerError(String),
    Quit,
}

impl InputLine {
    /// Parse a stdin line; blank or unknown lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Ok(code) = line.parse::<u32>() {
            return Some(InputLine::Key(code));
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        match word.to_lowercase().as_str() {
            "hide" => Some(InputLine::Visibility(Visibility::Hidden)),
            "show" => Some(InputLine::Visibility(Visibility::Visible)),
            "end" => Some(InputLine::EndOfStream),
            "fail" => Some(InputLine::PlayerError(if rest.is_empty() {
                "simulated failure".to_string()
            } else {
                rest.to_string()
            })),
            "quit" | "q" => Some(InputLine::Quit),
            _ => None,
        }
    }
}
