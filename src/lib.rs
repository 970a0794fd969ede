//! tvstream - lifecycle controller for a hardware-backed TV stream player
//!
//! Resolves a stream URL from a remote backend, drives the native player
//! through open/prepare/play, reacts to remote-control keys and visibility
//! changes, and releases the player whenever video is not on screen.
//!
//! # Modules
//!
//! - `models` - Session, player state and endpoint data
//! - `api` - Stream URL resolution (IP lookup + backend)
//! - `player` - Native player capability, guarded handle, simulator
//! - `host` - Runtime capabilities (surface, exit, audio)
//! - `controller` - Session lifecycle state machine
//! - `input` - Key table and input routing
//! - `app` - Single-threaded event loop
//! - `config` - Settings

pub mod models;
pub mod api;
pub mod player;
pub mod host;
pub mod controller;
pub mod input;
pub mod app;
pub mod config;

// Re-export commonly used types
pub use models::{
    DisplayRect, PlaybackSession, PlayerEvent, PlayerState, ResolvedEndpoint, SessionOutcome,
    SessionState, Visibility,
};

pub use api::{EndpointResolver, ResolutionError, StreamResolver};
pub use app::{App, Event, EventSender};
pub use config::Config;
pub use controller::{ErrorClass, LifecycleController, SessionError};
pub use host::{AudioControl, Host, HostError};
pub use input::{intent_for, InputRouter, Intent, KeyBinding, KEY_BINDINGS};
pub use player::{DeviceError, PlayerDevice, PlayerHandle};
