//! Hardware player capability
//!
//! The contract of the platform's native player object. Implementations
//! are opaque; the rest of the crate only relies on the behavior described
//! on each method.

use thiserror::Error;

use crate::models::{DisplayRect, PlayerEvent, PlayerState};

/// Streaming property key used to override the player's HTTP user-agent
pub const USER_AGENT_PROPERTY: &str = "USER_AGENT";

/// Error raised by the native player
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct DeviceError {
    pub name: String,
    pub message: String,
}

impl DeviceError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Error for a call the device does not allow in its current state
    pub fn invalid_state(state: PlayerState) -> Self {
        Self::new("InvalidStateError", format!("not allowed in state {}", state))
    }
}

/// Completion of an asynchronous prepare, called exactly once
pub type PrepareCallback = Box<dyn FnOnce(Result<(), DeviceError>) + Send + 'static>;

/// Receives buffering, end-of-stream and runtime error notifications
pub type PlayerListener = Box<dyn Fn(PlayerEvent) + Send + Sync + 'static>;

/// Native player object
///
/// All calls except [`PlayerDevice::prepare_async`] complete synchronously.
/// `prepare_async` returns immediately and reports through its callback
/// later, after the state has moved to `Ready` (success) or `Error`.
pub trait PlayerDevice: Send {
    /// Attach a stream URL. State becomes `Opened`.
    fn open(&mut self, url: &str) -> Result<(), DeviceError>;

    /// Must be called after `open` and before `prepare_async`
    fn set_streaming_property(&mut self, property: &str, value: &str) -> Result<(), DeviceError>;

    /// Replaces any previously installed listener
    fn set_listener(&mut self, listener: PlayerListener);

    fn set_display_rect(&mut self, rect: DisplayRect) -> Result<(), DeviceError>;

    /// Start buffering. State becomes `Preparing` until the callback fires.
    fn prepare_async(&mut self, on_complete: PrepareCallback) -> Result<(), DeviceError>;

    fn play(&mut self) -> Result<(), DeviceError>;

    fn pause(&mut self) -> Result<(), DeviceError>;

    /// State becomes `Idle`
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Releases the hardware. State becomes `None`.
    fn close(&mut self) -> Result<(), DeviceError>;

    fn state(&self) -> PlayerState;
}
