//! Remote-control and visibility input
//!
//! Key codes map to intents through a static table; the mapping is a pure
//! function so it can be checked without a player. The router then turns
//! intents and visibility changes into controller calls.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::app::{Event, EventSender};
use crate::controller::LifecycleController;
use crate::host::{AudioControl, Host};
use crate::models::Visibility;

// =============================================================================
// Intents
// =============================================================================

/// Abstract action derived from a raw key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Tear down and leave the application
    Exit,
    /// Resume if paused
    Play,
    /// Pause if playing
    Pause,
    /// Tear down the session
    Stop,
    VolumeUp,
    VolumeDown,
    ToggleMute,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Exit => write!(f, "exit"),
            Intent::Play => write!(f, "play"),
            Intent::Pause => write!(f, "pause"),
            Intent::Stop => write!(f, "stop"),
            Intent::VolumeUp => write!(f, "volume-up"),
            Intent::VolumeDown => write!(f, "volume-down"),
            Intent::ToggleMute => write!(f, "toggle-mute"),
        }
    }
}

/// One row of the remote-control table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: u32,
    pub name: &'static str,
    pub intent: Intent,
}

/// Remote-control key codes
pub const KEY_BINDINGS: &[KeyBinding] = &[
    KeyBinding { code: 10009, name: "Return", intent: Intent::Exit },
    KeyBinding { code: 415, name: "MediaPlay", intent: Intent::Play },
    KeyBinding { code: 10252, name: "MediaPlayPause", intent: Intent::Play },
    KeyBinding { code: 19, name: "MediaPause", intent: Intent::Pause },
    KeyBinding { code: 413, name: "MediaStop", intent: Intent::Stop },
    KeyBinding { code: 447, name: "VolumeUp", intent: Intent::VolumeUp },
    KeyBinding { code: 448, name: "VolumeDown", intent: Intent::VolumeDown },
    KeyBinding { code: 449, name: "VolumeMute", intent: Intent::ToggleMute },
];

/// Look up the binding for a key code
pub fn binding_for(code: u32) -> Option<&'static KeyBinding> {
    KEY_BINDINGS.iter().find(|b| b.code == code)
}

/// Map a key code to its intent; unknown codes map to nothing
pub fn intent_for(code: u32) -> Option<Intent> {
    binding_for(code).map(|b| b.intent)
}

// =============================================================================
// Router
// =============================================================================

/// Dispatches input to the lifecycle controller
pub struct InputRouter {
    host: Arc<dyn Host>,
    audio: Box<dyn AudioControl>,
    events: EventSender,
    restart_delay: Duration,
    visible: bool,
    /// Bumped on every visibility change; a scheduled start carries the
    /// epoch it was queued in
    epoch: u64,
}

impl InputRouter {
    pub fn new(
        host: Arc<dyn Host>,
        audio: Box<dyn AudioControl>,
        events: EventSender,
        restart_delay: Duration,
    ) -> Self {
        Self {
            host,
            audio,
            events,
            restart_delay,
            visible: true,
            epoch: 0,
        }
    }

    /// Handle a raw key press. `Break` means the application should end.
    pub fn handle_key(&mut self, code: u32, controller: &mut LifecycleController) -> ControlFlow<()> {
        match binding_for(code) {
            Some(binding) => {
                debug!(code, key = binding.name, intent = %binding.intent, "Key pressed");
                self.dispatch(binding.intent, controller)
            }
            None => {
                debug!(code, "Unmapped key ignored");
                ControlFlow::Continue(())
            }
        }
    }

    pub fn dispatch(&mut self, intent: Intent, controller: &mut LifecycleController) -> ControlFlow<()> {
        match intent {
            Intent::Exit => {
                controller.teardown_session();
                if let Err(e) = self.host.exit() {
                    error!(error = %e, "Error exiting application");
                }
                return ControlFlow::Break(());
            }
            Intent::Play => {
                controller.resume();
            }
            Intent::Pause => {
                controller.pause();
            }
            Intent::Stop => controller.teardown_session(),
            Intent::VolumeUp => {
                if let Err(e) = self.audio.volume_up() {
                    warn!(error = %e, "Volume up failed");
                }
            }
            Intent::VolumeDown => {
                if let Err(e) = self.audio.volume_down() {
                    warn!(error = %e, "Volume down failed");
                }
            }
            Intent::ToggleMute => {
                let toggled = self
                    .audio
                    .is_muted()
                    .and_then(|muted| self.audio.set_mute(!muted));
                if let Err(e) = toggled {
                    warn!(error = %e, "Mute toggle failed");
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Hidden: release the player now. Visible: recreate the surface and
    /// start a fresh session after the restart delay.
    pub fn handle_visibility(&mut self, visibility: Visibility, controller: &mut LifecycleController) {
        self.epoch += 1;
        self.visible = visibility == Visibility::Visible;
        match visibility {
            Visibility::Hidden => {
                info!("Application hidden, releasing player");
                controller.teardown_session();
            }
            Visibility::Visible => {
                info!("Application visible, restarting playback");
                self.schedule_playback(controller);
            }
        }
    }

    /// Ensure the player surface exists, then queue a playback start after
    /// the host has had time to settle.
    pub fn schedule_playback(&self, controller: &LifecycleController) {
        if let Err(e) = controller.ensure_surface() {
            error!(error = %e, "Could not create player surface");
        }

        let events = self.events.clone();
        let delay = self.restart_delay;
        let token = self.epoch;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::StartPlayback { token });
        });
    }

    /// Delayed start: any previous session is torn down first. A start
    /// scheduled before the latest visibility change, or arriving while
    /// hidden, is dropped.
    pub fn restart_playback(&self, token: u64, controller: &mut LifecycleController) {
        if token != self.epoch || !self.visible {
            debug!(
                token,
                epoch = self.epoch,
                visible = self.visible,
                "Discarding stale playback start"
            );
            return;
        }
        controller.teardown_session();
        controller.start_session();
    }
}
