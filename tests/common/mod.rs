//! Shared fakes for integration tests
//!
//! A recording player device, host and audio control that all append to
//! one call log, so tests can assert on the order of hardware calls.

#![allow(dead_code)]

use async_trait::async_trait;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tvstream::api::{EndpointResolver, ResolutionError};
use tvstream::player::{DeviceError, PlayerDevice, PlayerListener, PrepareCallback};
use tvstream::{
    App, AudioControl, Config, DisplayRect, Host, HostError, PlayerEvent, PlayerState,
    ResolvedEndpoint,
};

pub const TEST_USER_AGENT: &str = "TestTV/1.0 (Tizen)";
pub const TEST_STREAM_URL: &str = "http://x/stream.m3u8";

// =============================================================================
// Call Log
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(String),
    SetProperty(String, String),
    SetListener,
    SetDisplayRect(DisplayRect),
    Prepare,
    Play,
    Pause,
    Stop,
    Close,
    CreateSurface,
    Exit,
    VolumeUp,
    VolumeDown,
    SetMute(bool),
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn opens(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Open(_)))
            .count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

// =============================================================================
// Fake Player
// =============================================================================

#[derive(Default)]
struct FakeState {
    state: PlayerState,
    pending_prepare: Option<PrepareCallback>,
    listener: Option<Arc<dyn Fn(PlayerEvent) + Send + Sync>>,
    auto_prepare: bool,
    fail_open: bool,
    fail_user_agent: bool,
    fail_stop: bool,
    fail_play: bool,
}

/// Recording device with manually completed prepare
pub struct FakePlayer {
    log: CallLog,
    shared: Arc<Mutex<FakeState>>,
}

/// Test-side control over a [`FakePlayer`]
#[derive(Clone)]
pub struct FakePlayerControl {
    shared: Arc<Mutex<FakeState>>,
}

impl FakePlayer {
    pub fn new(log: CallLog) -> (Self, FakePlayerControl) {
        let shared = Arc::new(Mutex::new(FakeState::default()));
        let control = FakePlayerControl {
            shared: Arc::clone(&shared),
        };
        (Self { log, shared }, control)
    }

    fn fail(name: &str) -> DeviceError {
        DeviceError::new(name, "injected failure")
    }
}

impl PlayerDevice for FakePlayer {
    fn open(&mut self, url: &str) -> Result<(), DeviceError> {
        self.log.push(Call::Open(url.to_string()));
        let mut s = self.shared.lock().unwrap();
        if s.fail_open {
            return Err(Self::fail("InvalidValuesError"));
        }
        s.state = PlayerState::Opened;
        Ok(())
    }

    fn set_streaming_property(&mut self, property: &str, value: &str) -> Result<(), DeviceError> {
        self.log
            .push(Call::SetProperty(property.to_string(), value.to_string()));
        if self.shared.lock().unwrap().fail_user_agent {
            return Err(Self::fail("NotSupportedError"));
        }
        Ok(())
    }

    fn set_listener(&mut self, listener: PlayerListener) {
        self.log.push(Call::SetListener);
        self.shared.lock().unwrap().listener = Some(Arc::from(listener));
    }

    fn set_display_rect(&mut self, rect: DisplayRect) -> Result<(), DeviceError> {
        self.log.push(Call::SetDisplayRect(rect));
        Ok(())
    }

    fn prepare_async(&mut self, on_complete: PrepareCallback) -> Result<(), DeviceError> {
        self.log.push(Call::Prepare);
        let auto = {
            let mut s = self.shared.lock().unwrap();
            s.state = PlayerState::Preparing;
            if s.auto_prepare {
                s.state = PlayerState::Ready;
                Some(on_complete)
            } else {
                s.pending_prepare = Some(on_complete);
                None
            }
        };
        if let Some(on_complete) = auto {
            on_complete(Ok(()));
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Play);
        let mut s = self.shared.lock().unwrap();
        if s.fail_play {
            return Err(Self::fail("InvalidStateError"));
        }
        s.state = PlayerState::Playing;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Pause);
        self.shared.lock().unwrap().state = PlayerState::Paused;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Stop);
        let mut s = self.shared.lock().unwrap();
        if s.fail_stop {
            return Err(Self::fail("InvalidStateError"));
        }
        s.state = PlayerState::Idle;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.log.push(Call::Close);
        let mut s = self.shared.lock().unwrap();
        s.state = PlayerState::None;
        s.listener = None;
        Ok(())
    }

    fn state(&self) -> PlayerState {
        self.shared.lock().unwrap().state
    }
}

impl FakePlayerControl {
    pub fn state(&self) -> PlayerState {
        self.shared.lock().unwrap().state
    }

    pub fn set_state(&self, state: PlayerState) {
        self.shared.lock().unwrap().state = state;
    }

    pub fn auto_prepare(&self) {
        self.shared.lock().unwrap().auto_prepare = true;
    }

    pub fn fail_open(&self) {
        self.shared.lock().unwrap().fail_open = true;
    }

    pub fn fail_user_agent(&self) {
        self.shared.lock().unwrap().fail_user_agent = true;
    }

    pub fn fail_stop(&self) {
        self.shared.lock().unwrap().fail_stop = true;
    }

    pub fn fail_play(&self) {
        self.shared.lock().unwrap().fail_play = true;
    }

    pub fn has_pending_prepare(&self) -> bool {
        self.shared.lock().unwrap().pending_prepare.is_some()
    }

    /// Fire the pending prepare callback. The device moves to Ready/Error only
    /// if it is still preparing, like hardware that finishes late.
    pub fn complete_prepare(&self, result: Result<(), DeviceError>) {
        let callback = {
            let mut s = self.shared.lock().unwrap();
            if s.state == PlayerState::Preparing {
                s.state = if result.is_ok() {
                    PlayerState::Ready
                } else {
                    PlayerState::Error
                };
            }
            s.pending_prepare.take()
        };
        let callback = callback.expect("no prepare in flight");
        callback(result);
    }

    /// Deliver a listener notification as the device would
    pub fn emit(&self, event: PlayerEvent) {
        let listener = self.shared.lock().unwrap().listener.clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }
}

// =============================================================================
// Fake Host / Audio
// =============================================================================

pub struct FakeHost {
    log: CallLog,
    surface: Mutex<bool>,
    fail_exit: bool,
    fail_surface: bool,
}

impl FakeHost {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            surface: Mutex::new(false),
            fail_exit: false,
            fail_surface: false,
        }
    }

    pub fn failing_surface(log: CallLog) -> Self {
        Self {
            fail_surface: true,
            ..Self::new(log)
        }
    }

    pub fn failing_exit(log: CallLog) -> Self {
        Self {
            fail_exit: true,
            ..Self::new(log)
        }
    }

    pub fn drop_surface(&self) {
        *self.surface.lock().unwrap() = false;
    }
}

impl Host for FakeHost {
    fn user_agent(&self) -> String {
        TEST_USER_AGENT.to_string()
    }

    fn has_player_surface(&self) -> bool {
        *self.surface.lock().unwrap()
    }

    fn create_player_surface(&self) -> Result<(), HostError> {
        self.log.push(Call::CreateSurface);
        if self.fail_surface {
            return Err(HostError::Surface("no video container".into()));
        }
        *self.surface.lock().unwrap() = true;
        Ok(())
    }

    fn exit(&self) -> Result<(), HostError> {
        self.log.push(Call::Exit);
        if self.fail_exit {
            return Err(HostError::Exit("application not found".into()));
        }
        Ok(())
    }
}

pub struct FakeAudio {
    log: CallLog,
    muted: bool,
}

impl FakeAudio {
    pub fn new(log: CallLog) -> Self {
        Self { log, muted: false }
    }
}

impl AudioControl for FakeAudio {
    fn volume_up(&mut self) -> Result<(), HostError> {
        self.log.push(Call::VolumeUp);
        Ok(())
    }

    fn volume_down(&mut self) -> Result<(), HostError> {
        self.log.push(Call::VolumeDown);
        Ok(())
    }

    fn is_muted(&self) -> Result<bool, HostError> {
        Ok(self.muted)
    }

    fn set_mute(&mut self, muted: bool) -> Result<(), HostError> {
        self.log.push(Call::SetMute(muted));
        self.muted = muted;
        Ok(())
    }
}

// =============================================================================
// Resolvers
// =============================================================================

/// Resolver that always yields the same URL, or always fails
pub struct StaticResolver {
    stream_url: Option<String>,
    pub calls: AtomicUsize,
}

impl StaticResolver {
    pub fn ok(stream_url: impl Into<String>) -> Self {
        Self {
            stream_url: Some(stream_url.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing_stream_url() -> Self {
        Self {
            stream_url: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EndpointResolver for StaticResolver {
    async fn resolve(&self, user_agent: &str) -> Result<ResolvedEndpoint, ResolutionError> {
        assert_eq!(user_agent, TEST_USER_AGENT);
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.stream_url {
            Some(url) => Ok(ResolvedEndpoint {
                client_ip: "1.2.3.4".to_string(),
                stream_url: url.clone(),
            }),
            None => Err(ResolutionError::MissingStreamUrl),
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub app: App,
    pub player: FakePlayerControl,
    pub log: CallLog,
}

pub fn test_config() -> Config {
    Config {
        restart_delay_ms: 0,
        ..Config::default()
    }
}

pub fn harness(resolver: Arc<dyn EndpointResolver>) -> Harness {
    let log = CallLog::default();
    harness_with_host(resolver, Arc::new(FakeHost::new(log.clone())), log)
}

pub fn harness_with_host(
    resolver: Arc<dyn EndpointResolver>,
    host: Arc<dyn Host>,
    log: CallLog,
) -> Harness {
    let (device, player) = FakePlayer::new(log.clone());
    let app = App::new(
        &test_config(),
        Box::new(device),
        resolver,
        host,
        Box::new(FakeAudio::new(log.clone())),
    );
    Harness { app, player, log }
}

impl Harness {
    /// Handle the next queued event, failing the test if none arrives
    pub async fn step(&mut self) -> ControlFlow<()> {
        tokio::time::timeout(Duration::from_secs(5), self.app.step())
            .await
            .expect("timed out waiting for an event")
    }

    /// Queue a start and run it through resolution until prepare is requested.
    /// Uses the launch epoch, so only valid before any visibility change.
    pub async fn start_until_prepare(&mut self) {
        self.app.handle(tvstream::Event::StartPlayback { token: 0 });
        // Resolved
        self.step().await;
    }

    /// Full happy path up to Playing
    pub async fn start_until_playing(&mut self) {
        self.start_until_prepare().await;
        self.player.complete_prepare(Ok(()));
        self.step().await;
        assert_eq!(self.player.state(), PlayerState::Playing);
    }

    pub fn key(&mut self, code: u32) -> ControlFlow<()> {
        self.app.handle(tvstream::Event::Key(code))
    }
}
