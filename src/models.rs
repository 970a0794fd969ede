//! Data models for playback sessions and the hardware player
//!
//! Core data structures shared by the resolver, the player handle,
//! the lifecycle controller and the input router.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::controller::ErrorClass;

// =============================================================================
// Hardware Player State
// =============================================================================

/// State reported by the hardware player.
///
/// This is the only source of truth for guard checks; higher layers never
/// cache it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// No media attached (never opened, or closed)
    #[default]
    None,
    /// Player exists but holds no stream (stopped)
    Idle,
    /// A stream URL has been opened, prepare not yet requested
    Opened,
    /// Asynchronous prepare in flight
    Preparing,
    /// Prepare completed, ready to play
    Ready,
    Playing,
    Paused,
    /// Player reported an unrecoverable error
    Error,
}

impl PlayerState {
    /// True when no hardware resources are held and teardown has nothing to do
    pub fn is_released(&self) -> bool {
        matches!(self, PlayerState::None | PlayerState::Idle)
    }

    /// Wire name as reported by the device
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::None => "NONE",
            PlayerState::Idle => "IDLE",
            PlayerState::Opened => "OPENED",
            PlayerState::Preparing => "PREPARING",
            PlayerState::Ready => "READY",
            PlayerState::Playing => "PLAYING",
            PlayerState::Paused => "PAUSED",
            PlayerState::Error => "ERROR",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NONE" => Ok(PlayerState::None),
            "IDLE" => Ok(PlayerState::Idle),
            "OPENED" => Ok(PlayerState::Opened),
            "PREPARING" => Ok(PlayerState::Preparing),
            "READY" => Ok(PlayerState::Ready),
            "PLAYING" => Ok(PlayerState::Playing),
            "PAUSED" => Ok(PlayerState::Paused),
            "ERROR" => Ok(PlayerState::Error),
            other => Err(format!("unknown player state: {}", other)),
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Session-level lifecycle state. Ended sessions are dropped rather than
/// kept in a terminal state; how one ended is a [`SessionOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    NoSession,
    Resolving,
    Opening,
    Preparing,
    Playing,
    Paused,
}

impl SessionState {
    /// States in which a session holds (or is acquiring) the player
    pub fn is_live(&self) -> bool {
        *self != SessionState::NoSession
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NoSession => write!(f, "No session"),
            SessionState::Resolving => write!(f, "Resolving..."),
            SessionState::Opening => write!(f, "Opening..."),
            SessionState::Preparing => write!(f, "Preparing..."),
            SessionState::Playing => write!(f, "▶ Playing"),
            SessionState::Paused => write!(f, "⏸ Paused"),
        }
    }
}

/// One attempt to resolve and display a single stream
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSession {
    pub id: Uuid,
    /// Continuations tagged with a different generation are stale
    pub generation: u64,
    pub state: SessionState,
    pub stream_url: Option<String>,
    /// Captured once when the session starts
    pub user_agent: String,
}

impl PlaybackSession {
    pub fn new(generation: u64, user_agent: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            state: SessionState::Resolving,
            stream_url: None,
            user_agent: user_agent.into(),
        }
    }
}

/// How the most recent session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionOutcome {
    /// End of content reached
    Completed,
    /// Torn down by input, visibility or exit
    Stopped,
    Failed(ErrorClass),
}

// =============================================================================
// Resolution
// =============================================================================

/// Result of a successful two-step resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEndpoint {
    pub client_ip: String,
    pub stream_url: String,
}

// =============================================================================
// Display / Visibility / Player Events
// =============================================================================

/// Output rectangle of the video plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DisplayRect {
    pub const FULL_SCREEN: DisplayRect = DisplayRect {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };
}

impl fmt::Display for DisplayRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Host visibility signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Hidden,
    Visible,
}

impl Visibility {
    pub fn from_hidden(hidden: bool) -> Self {
        if hidden {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }
}

/// Notifications delivered through the player's listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    BufferingStart,
    BufferingComplete,
    StreamCompleted,
    Error(String),
}
