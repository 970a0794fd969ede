//! Lifecycle controller
//!
//! Owns the single player handle and the single playback session.
//! A session runs resolve → open → configure → prepare → play, with every
//! asynchronous step re-entering through the app's event queue tagged with
//! the session generation. A completion whose generation no longer matches
//! the live session is dropped, so a teardown never needs to cancel the
//! network request or the hardware prepare that is still in flight.
//!
//! Failure at any step funnels into one handler that logs, releases the
//! player and returns to "no session".

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{EndpointResolver, ResolutionError};
use crate::app::{Event, EventSender};
use crate::host::{Host, HostError};
use crate::models::{
    PlaybackSession, PlayerEvent, PlayerState, ResolvedEndpoint, SessionOutcome, SessionState,
};
use crate::player::{DeviceError, Guarded, PlayerError, PlayerHandle, Teardown};

// =============================================================================
// Errors
// =============================================================================

/// Error taxonomy used for logging and outcome reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorClass {
    /// IP lookup or backend call failed or returned garbage
    Network,
    /// Open/prepare/play failed; session aborted
    PlayerFatal,
    /// Logged and ignored
    PlayerNonFatal,
    /// Reported by the player while playing
    Runtime,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Network => write!(f, "network"),
            ErrorClass::PlayerFatal => write!(f, "player-fatal"),
            ErrorClass::PlayerNonFatal => write!(f, "player-non-fatal"),
            ErrorClass::Runtime => write!(f, "runtime"),
        }
    }
}

/// Anything that can end or disturb a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Player error: {0}")]
    Runtime(String),
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::Resolution(_) => ErrorClass::Network,
            SessionError::Player(e) if e.is_fatal() => ErrorClass::PlayerFatal,
            SessionError::Player(_) => ErrorClass::PlayerNonFatal,
            SessionError::Host(HostError::Surface(_)) => ErrorClass::PlayerFatal,
            SessionError::Host(_) => ErrorClass::PlayerNonFatal,
            SessionError::Runtime(_) => ErrorClass::Runtime,
        }
    }

    /// Stable code for structured logs
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Resolution(e) => match e {
                ResolutionError::IpLookupRequest(_) => "IP_LOOKUP_REQUEST",
                ResolutionError::IpLookupStatus(_) => "IP_LOOKUP_STATUS",
                ResolutionError::MissingIp => "IP_MISSING",
                ResolutionError::BackendRequest(_) => "BACKEND_REQUEST",
                ResolutionError::BackendStatus(_) => "BACKEND_STATUS",
                ResolutionError::MissingStreamUrl => "STREAM_URL_MISSING",
                ResolutionError::InvalidResponse { .. } => "INVALID_RESPONSE",
            },
            SessionError::Player(e) => match e {
                PlayerError::Busy(_) => "PLAYER_BUSY",
                PlayerError::Open(_) => "PLAYER_OPEN",
                PlayerError::UserAgent(_) => "PLAYER_USER_AGENT",
                PlayerError::Display(_) => "PLAYER_DISPLAY",
                PlayerError::Prepare(_) => "PLAYER_PREPARE",
                PlayerError::NotReady(_) => "PLAYER_NOT_READY",
                PlayerError::Play(_) => "PLAYER_PLAY",
                PlayerError::Pause(_) => "PLAYER_PAUSE",
            },
            SessionError::Host(e) => match e {
                HostError::Surface(_) => "HOST_SURFACE",
                HostError::Exit(_) => "HOST_EXIT",
                HostError::Audio(_) => "HOST_AUDIO",
            },
            SessionError::Runtime(_) => "PLAYER_RUNTIME",
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Orchestrates the player for at most one session at a time
pub struct LifecycleController {
    player: PlayerHandle,
    resolver: Arc<dyn EndpointResolver>,
    host: Arc<dyn Host>,
    events: EventSender,
    session: Option<PlaybackSession>,
    next_generation: u64,
    last_outcome: Option<SessionOutcome>,
}

impl LifecycleController {
    pub fn new(
        player: PlayerHandle,
        resolver: Arc<dyn EndpointResolver>,
        host: Arc<dyn Host>,
        events: EventSender,
    ) -> Self {
        Self {
            player,
            resolver,
            host,
            events,
            session: None,
            next_generation: 1,
            last_outcome: None,
        }
    }

    /// The live session, if any
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn session_state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::NoSession)
    }

    /// Hardware state, re-queried
    pub fn player_state(&self) -> PlayerState {
        self.player.state()
    }

    /// How the most recent session ended
    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.last_outcome
    }

    /// Create the player surface if the host has none. Returns true if created.
    pub fn ensure_surface(&self) -> Result<bool, HostError> {
        if self.host.has_player_surface() {
            return Ok(false);
        }
        self.host.create_player_surface()?;
        Ok(true)
    }

    /// Start a new session. No-op if one is already live; callers that want a
    /// fresh session tear down first.
    pub fn start_session(&mut self) -> bool {
        if let Some(session) = &self.session {
            debug!(session = %session.id, state = %session.state, "Session already active, start ignored");
            return false;
        }

        if let Err(e) = self.ensure_surface() {
            self.fail(e.into());
            return false;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let session = PlaybackSession::new(generation, self.host.user_agent());
        info!(session = %session.id, generation, "Starting playback session");

        let resolver = Arc::clone(&self.resolver);
        let events = self.events.clone();
        let user_agent = session.user_agent.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(&user_agent).await;
            let _ = events.send(Event::Resolved { generation, result });
        });

        self.session = Some(session);
        true
    }

    /// Stop and close the player and drop the session. Always safe.
    pub fn teardown_session(&mut self) {
        self.finish(SessionOutcome::Stopped);
    }

    /// Continuation of the resolution started by `start_session`
    pub fn on_resolved(
        &mut self,
        generation: u64,
        result: Result<ResolvedEndpoint, ResolutionError>,
    ) {
        if self.live_session(generation, SessionState::Resolving).is_none() {
            debug!(generation, "Discarding stale resolution result");
            return;
        }

        let outcome = result
            .map_err(SessionError::from)
            .and_then(|endpoint| self.begin_playback(generation, endpoint));
        if let Err(e) = outcome {
            self.fail(e);
        }
    }

    fn begin_playback(
        &mut self,
        generation: u64,
        endpoint: ResolvedEndpoint,
    ) -> Result<(), SessionError> {
        let user_agent = self.set_state(generation, SessionState::Opening, |s| {
            s.stream_url = Some(endpoint.stream_url.clone());
            s.user_agent.clone()
        });

        self.player.open(&endpoint.stream_url)?;

        if let Err(e) = self.player.apply_user_agent(&user_agent) {
            warn!(error = %e, "Continuing without custom user-agent");
        }

        let events = self.events.clone();
        self.player.set_listener(Box::new(move |event| {
            let _ = events.send(Event::Player { generation, event });
        }));

        self.player.configure_display()?;

        self.set_state(generation, SessionState::Preparing, |_| ());
        let events = self.events.clone();
        self.player.prepare_async(Box::new(move |result| {
            let _ = events.send(Event::PrepareCompleted { generation, result });
        }))?;

        info!(url = %endpoint.stream_url, client_ip = %endpoint.client_ip, "Preparing stream");
        Ok(())
    }

    /// Continuation of the hardware prepare. Play is only ever issued here.
    pub fn on_prepare_completed(&mut self, generation: u64, result: Result<(), DeviceError>) {
        if self.live_session(generation, SessionState::Preparing).is_none() {
            debug!(generation, "Discarding stale prepare completion");
            return;
        }

        if let Err(e) = result {
            self.fail(PlayerError::Prepare(e).into());
            return;
        }

        info!("Prepare complete. Starting playback.");
        match self.player.start() {
            Ok(Guarded::Applied) => {
                self.set_state(generation, SessionState::Playing, |_| ());
                info!("Playback started");
            }
            Ok(Guarded::Skipped(state)) => self.fail(PlayerError::NotReady(state).into()),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Listener notifications for the session with `generation`
    pub fn on_player_event(&mut self, generation: u64, event: PlayerEvent) {
        if !self.is_current(generation) {
            debug!(generation, ?event, "Discarding player event from a previous session");
            return;
        }

        match event {
            PlayerEvent::BufferingStart => info!("Buffering started..."),
            PlayerEvent::BufferingComplete => info!("Buffering complete."),
            PlayerEvent::StreamCompleted => {
                info!("Stream completed.");
                self.finish(SessionOutcome::Completed);
            }
            PlayerEvent::Error(message) => {
                // No automatic restart; the next lifecycle event recovers.
                let err = SessionError::Runtime(message);
                error!(code = err.error_code(), class = %err.class(), error = %err, "Player error");
            }
        }
    }

    /// Play intent: resume if paused
    pub fn resume(&mut self) -> bool {
        match self.player.resume() {
            Ok(Guarded::Applied) => {
                self.set_current_state(SessionState::Playing);
                true
            }
            Ok(Guarded::Skipped(_)) => false,
            Err(e) => {
                warn!(error = %e, "Resume failed");
                false
            }
        }
    }

    /// Pause intent: pause if playing
    pub fn pause(&mut self) -> bool {
        match self.player.pause() {
            Ok(Guarded::Applied) => {
                self.set_current_state(SessionState::Paused);
                true
            }
            Ok(Guarded::Skipped(_)) => false,
            Err(e) => {
                warn!(error = %e, "Pause failed");
                false
            }
        }
    }

    fn fail(&mut self, err: SessionError) {
        error!(
            code = err.error_code(),
            class = %err.class(),
            error = %err,
            "A critical error occurred in the playback setup chain"
        );
        let outcome = SessionOutcome::Failed(err.class());
        self.finish(outcome);
        // finish only records for a live session; surface failures happen before one exists
        self.last_outcome = Some(outcome);
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        let teardown = self.player.teardown();
        match self.session.take() {
            Some(session) => {
                info!(session = %session.id, ?outcome, ?teardown, "Session ended");
                self.last_outcome = Some(outcome);
            }
            None if !matches!(teardown, Teardown::AlreadyReleased(_)) => {
                debug!(?teardown, "Released player without a live session");
            }
            None => {}
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }

    fn live_session(&self, generation: u64, expected: SessionState) -> Option<&PlaybackSession> {
        self.session
            .as_ref()
            .filter(|s| s.generation == generation && s.state == expected)
    }

    /// Update the session identified by `generation`, returning what `f` extracts
    fn set_state<T>(
        &mut self,
        generation: u64,
        state: SessionState,
        f: impl FnOnce(&mut PlaybackSession) -> T,
    ) -> T
    where
        T: Default,
    {
        match self.session.as_mut().filter(|s| s.generation == generation) {
            Some(session) => {
                debug!(from = %session.state, to = %state, "Session state transition");
                session.state = state;
                f(session)
            }
            None => T::default(),
        }
    }

    fn set_current_state(&mut self, state: SessionState) {
        if let Some(session) = self.session.as_mut() {
            session.state = state;
        }
    }
}
