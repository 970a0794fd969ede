//! Host platform capabilities
//!
//! The runtime around the player: the display surface the native player
//! attaches to, the browser user-agent, the application exit primitive and
//! the TV's volume/mute control.

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

/// Errors from host platform calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Failed to create player surface: {0}")]
    Surface(String),

    #[error("Error exiting application: {0}")]
    Exit(String),

    #[error("Audio control failed: {0}")]
    Audio(String),
}

/// Application runtime
pub trait Host: Send + Sync {
    /// User-agent string of the runtime, captured once per session
    fn user_agent(&self) -> String;

    fn has_player_surface(&self) -> bool;

    /// Create the display element the player renders into
    fn create_player_surface(&self) -> Result<(), HostError>;

    /// Ask the runtime to terminate the application
    fn exit(&self) -> Result<(), HostError>;
}

/// TV volume/mute control
pub trait AudioControl: Send {
    fn volume_up(&mut self) -> Result<(), HostError>;
    fn volume_down(&mut self) -> Result<(), HostError>;
    fn is_muted(&self) -> Result<bool, HostError>;
    fn set_mute(&mut self, muted: bool) -> Result<(), HostError>;
}

/// Default user-agent for the headless host
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (SMART-TV; LINUX; Tizen 6.0) AppleWebKit/537.36 (KHTML, like Gecko) Version/6.0 TV Safari/537.36";

/// Host for running outside a TV runtime
pub struct HeadlessHost {
    user_agent: String,
    surface: AtomicBool,
    exited: AtomicBool,
}

impl HeadlessHost {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            surface: AtomicBool::new(false),
            exited: AtomicBool::new(false),
        }
    }

    /// Simulate the runtime discarding the surface while backgrounded
    pub fn drop_surface(&self) {
        self.surface.store(false, Ordering::SeqCst);
    }

    pub fn exit_requested(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl Host for HeadlessHost {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn has_player_surface(&self) -> bool {
        self.surface.load(Ordering::SeqCst)
    }

    fn create_player_surface(&self) -> Result<(), HostError> {
        self.surface.store(true, Ordering::SeqCst);
        info!("Player surface created");
        Ok(())
    }

    fn exit(&self) -> Result<(), HostError> {
        self.exited.store(true, Ordering::SeqCst);
        info!("Application exit requested");
        Ok(())
    }
}

/// In-memory volume control
#[derive(Debug, Clone)]
pub struct SoftwareMixer {
    volume: u8,
    muted: bool,
}

impl SoftwareMixer {
    pub const MAX_VOLUME: u8 = 100;

    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.min(Self::MAX_VOLUME),
            muted: false,
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }
}

impl Default for SoftwareMixer {
    fn default() -> Self {
        Self::new(50)
    }
}

impl AudioControl for SoftwareMixer {
    fn volume_up(&mut self) -> Result<(), HostError> {
        self.volume = (self.volume + 1).min(Self::MAX_VOLUME);
        info!(volume = self.volume, "Volume up");
        Ok(())
    }

    fn volume_down(&mut self) -> Result<(), HostError> {
        self.volume = self.volume.saturating_sub(1);
        info!(volume = self.volume, "Volume down");
        Ok(())
    }

    fn is_muted(&self) -> Result<bool, HostError> {
        Ok(self.muted)
    }

    fn set_mute(&mut self, muted: bool) -> Result<(), HostError> {
        self.muted = muted;
        info!(muted, "Mute changed");
        Ok(())
    }
}
