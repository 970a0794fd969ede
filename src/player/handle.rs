//! Player handle - guarded wrapper around the native player
//!
//! Every mutating call re-queries the device state right before acting.
//! Stale calls (a key press racing a teardown, a completion arriving after
//! the player was released) are skipped instead of reaching the device.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::device::{DeviceError, PlayerDevice, PlayerListener, PrepareCallback, USER_AGENT_PROPERTY};
use crate::models::{DisplayRect, PlayerState};

/// Errors from player handle operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player is still holding a stream ({0}); tear down before opening")]
    Busy(PlayerState),

    #[error("Failed to open stream: {0}")]
    Open(#[source] DeviceError),

    #[error("Failed to set custom user-agent: {0}")]
    UserAgent(#[source] DeviceError),

    #[error("Failed to set display rect: {0}")]
    Display(#[source] DeviceError),

    #[error("Prepare failed: {0}")]
    Prepare(#[source] DeviceError),

    #[error("Player not ready after prepare ({0})")]
    NotReady(PlayerState),

    #[error("Play failed: {0}")]
    Play(#[source] DeviceError),

    #[error("Pause failed: {0}")]
    Pause(#[source] DeviceError),
}

impl PlayerError {
    /// Fatal errors abort the session; the rest are logged and ignored
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PlayerError::UserAgent(_) | PlayerError::Pause(_))
    }
}

/// Result of a state-guarded call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guarded {
    /// Guard held and the device call was made
    Applied,
    /// Device was in another state; nothing was called
    Skipped(PlayerState),
}

impl Guarded {
    pub fn applied(&self) -> bool {
        matches!(self, Guarded::Applied)
    }
}

/// Result of a teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// Nothing was held; no device call made
    AlreadyReleased(PlayerState),
    Released,
    /// stop/close raised; resources are considered released anyway
    ReleasedWithErrors,
}

/// Owned handle to the single hardware player
pub struct PlayerHandle {
    device: Box<dyn PlayerDevice>,
}

impl PlayerHandle {
    pub fn new(device: Box<dyn PlayerDevice>) -> Self {
        Self { device }
    }

    /// Current device state (always re-queried)
    pub fn state(&self) -> PlayerState {
        self.device.state()
    }

    /// Open a stream. Only allowed while the player is released.
    pub fn open(&mut self, url: &str) -> Result<(), PlayerError> {
        let state = self.state();
        if !state.is_released() {
            return Err(PlayerError::Busy(state));
        }
        self.device.open(url).map_err(PlayerError::Open)?;
        debug!(url = %url, "Player opened");
        Ok(())
    }

    /// Best-effort user-agent override; callers log and continue on error
    pub fn apply_user_agent(&mut self, user_agent: &str) -> Result<(), PlayerError> {
        self.device
            .set_streaming_property(USER_AGENT_PROPERTY, user_agent)
            .map_err(PlayerError::UserAgent)
    }

    pub fn set_listener(&mut self, listener: PlayerListener) {
        self.device.set_listener(listener);
    }

    /// Route video to the whole screen
    pub fn configure_display(&mut self) -> Result<(), PlayerError> {
        self.device
            .set_display_rect(DisplayRect::FULL_SCREEN)
            .map_err(PlayerError::Display)
    }

    /// Kick off the asynchronous prepare; `on_complete` fires later
    pub fn prepare_async(&mut self, on_complete: PrepareCallback) -> Result<(), PlayerError> {
        self.device
            .prepare_async(on_complete)
            .map_err(PlayerError::Prepare)
    }

    /// First play after a completed prepare (guard: `Ready`)
    pub fn start(&mut self) -> Result<Guarded, PlayerError> {
        self.guarded(PlayerState::Ready, |d| d.play().map_err(PlayerError::Play))
    }

    /// Resume (guard: `Paused`)
    pub fn resume(&mut self) -> Result<Guarded, PlayerError> {
        self.guarded(PlayerState::Paused, |d| d.play().map_err(PlayerError::Play))
    }

    /// Pause (guard: `Playing`)
    pub fn pause(&mut self) -> Result<Guarded, PlayerError> {
        self.guarded(PlayerState::Playing, |d| d.pause().map_err(PlayerError::Pause))
    }

    fn guarded(
        &mut self,
        required: PlayerState,
        call: impl FnOnce(&mut dyn PlayerDevice) -> Result<(), PlayerError>,
    ) -> Result<Guarded, PlayerError> {
        let state = self.state();
        if state != required {
            debug!(state = %state, required = %required, "Guard failed, call skipped");
            return Ok(Guarded::Skipped(state));
        }
        call(self.device.as_mut())?;
        Ok(Guarded::Applied)
    }

    /// Stop and close, releasing the hardware. Never fails.
    pub fn teardown(&mut self) -> Teardown {
        let state = self.state();
        if state.is_released() {
            debug!(state = %state, "Teardown skipped, player already released");
            return Teardown::AlreadyReleased(state);
        }

        let mut clean = true;
        if let Err(e) = self.device.stop() {
            warn!(error = %e, "Error stopping player");
            clean = false;
        }
        if let Err(e) = self.device.close() {
            warn!(error = %e, "Error closing player");
            clean = false;
        }

        if clean {
            info!("Player closed successfully");
            Teardown::Released
        } else {
            Teardown::ReleasedWithErrors
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let err = || DeviceError::new("PLAYER_ERROR", "boom");
        assert!(PlayerError::Open(err()).is_fatal());
        assert!(PlayerError::Prepare(err()).is_fatal());
        assert!(PlayerError::Display(err()).is_fatal());
        assert!(PlayerError::Busy(PlayerState::Playing).is_fatal());
        assert!(PlayerError::NotReady(PlayerState::Opened).is_fatal());
        assert!(!PlayerError::UserAgent(err()).is_fatal());
        assert!(!PlayerError::Pause(err()).is_fatal());
    }

    #[test]
    fn test_guarded_applied() {
        assert!(Guarded::Applied.applied());
        assert!(!Guarded::Skipped(PlayerState::Idle).applied());
    }
}
