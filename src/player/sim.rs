//! Simulated player
//!
//! An in-process [`PlayerDevice`] that follows the native player's state
//! machine. Prepare completes on the tokio runtime after a configurable
//! delay, so it must be driven from inside a runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::device::{DeviceError, PlayerDevice, PlayerListener, PrepareCallback};
use crate::models::{DisplayRect, PlayerEvent, PlayerState};

type SharedListener = Arc<dyn Fn(PlayerEvent) + Send + Sync>;

struct SimState {
    state: PlayerState,
    url: Option<String>,
    user_agent: Option<String>,
    rect: Option<DisplayRect>,
    listener: Option<SharedListener>,
    /// Bumped on every open/close so a late prepare timer can tell it is stale
    epoch: u64,
    fail_next_prepare: Option<String>,
}

/// Simulated native player
pub struct SimulatedPlayer {
    inner: Arc<Mutex<SimState>>,
    prepare_delay: Duration,
}

/// Side channel for injecting device-originated events
#[derive(Clone)]
pub struct SimulatedPlayerRemote {
    inner: Arc<Mutex<SimState>>,
}

fn lock(inner: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedPlayer {
    pub fn new(prepare_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                state: PlayerState::None,
                url: None,
                user_agent: None,
                rect: None,
                listener: None,
                epoch: 0,
                fail_next_prepare: None,
            })),
            prepare_delay,
        }
    }

    pub fn remote(&self) -> SimulatedPlayerRemote {
        SimulatedPlayerRemote {
            inner: Arc::clone(&self.inner),
        }
    }

    fn expect_state(&self, allowed: &[PlayerState]) -> Result<(), DeviceError> {
        let state = lock(&self.inner).state;
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(DeviceError::invalid_state(state))
        }
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl PlayerDevice for SimulatedPlayer {
    fn open(&mut self, url: &str) -> Result<(), DeviceError> {
        self.expect_state(&[PlayerState::None, PlayerState::Idle])?;
        let mut inner = lock(&self.inner);
        inner.state = PlayerState::Opened;
        inner.url = Some(url.to_string());
        inner.user_agent = None;
        inner.epoch += 1;
        info!(url = %url, "[sim] open");
        Ok(())
    }

    fn set_streaming_property(&mut self, property: &str, value: &str) -> Result<(), DeviceError> {
        self.expect_state(&[PlayerState::Opened])?;
        if property != super::device::USER_AGENT_PROPERTY {
            return Err(DeviceError::new(
                "NotSupportedError",
                format!("unknown streaming property {}", property),
            ));
        }
        lock(&self.inner).user_agent = Some(value.to_string());
        debug!(user_agent = %value, "[sim] user-agent set");
        Ok(())
    }

    fn set_listener(&mut self, listener: PlayerListener) {
        lock(&self.inner).listener = Some(Arc::from(listener));
    }

    fn set_display_rect(&mut self, rect: DisplayRect) -> Result<(), DeviceError> {
        lock(&self.inner).rect = Some(rect);
        debug!(rect = %rect, "[sim] display rect set");
        Ok(())
    }

    fn prepare_async(&mut self, on_complete: PrepareCallback) -> Result<(), DeviceError> {
        self.expect_state(&[PlayerState::Opened])?;
        let epoch = {
            let mut inner = lock(&self.inner);
            inner.state = PlayerState::Preparing;
            inner.epoch
        };
        info!("[sim] prepare started");

        let inner = Arc::clone(&self.inner);
        let delay = self.prepare_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = {
                let mut guard = lock(&inner);
                if guard.epoch != epoch || guard.state != PlayerState::Preparing {
                    debug!("[sim] prepare abandoned, player was released");
                    return;
                }
                match guard.fail_next_prepare.take() {
                    Some(message) => {
                        guard.state = PlayerState::Error;
                        Err(DeviceError::new("PLAYER_ERROR_CONNECTION_FAILED", message))
                    }
                    None => {
                        guard.state = PlayerState::Ready;
                        Ok(())
                    }
                }
            };
            on_complete(result);
        });
        Ok(())
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        self.expect_state(&[PlayerState::Ready, PlayerState::Paused])?;
        lock(&self.inner).state = PlayerState::Playing;
        info!("[sim] play");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), DeviceError> {
        self.expect_state(&[PlayerState::Playing])?;
        lock(&self.inner).state = PlayerState::Paused;
        info!("[sim] pause");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        lock(&self.inner).state = PlayerState::Idle;
        info!("[sim] stop");
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        let mut inner = lock(&self.inner);
        inner.state = PlayerState::None;
        inner.url = None;
        inner.listener = None;
        inner.epoch += 1;
        info!("[sim] close");
        Ok(())
    }

    fn state(&self) -> PlayerState {
        lock(&self.inner).state
    }
}

impl SimulatedPlayerRemote {
    /// Currently opened URL
    pub fn url(&self) -> Option<String> {
        lock(&self.inner).url.clone()
    }

    pub fn user_agent(&self) -> Option<String> {
        lock(&self.inner).user_agent.clone()
    }

    pub fn state(&self) -> PlayerState {
        lock(&self.inner).state
    }

    /// Make the next prepare fail with the given message
    pub fn fail_next_prepare(&self, message: impl Into<String>) {
        lock(&self.inner).fail_next_prepare = Some(message.into());
    }

    /// Signal end of content through the listener
    pub fn end_of_stream(&self) {
        self.emit(PlayerEvent::StreamCompleted);
    }

    /// Signal a runtime playback error through the listener
    pub fn raise_error(&self, message: impl Into<String>) {
        self.emit(PlayerEvent::Error(message.into()));
    }

    fn emit(&self, event: PlayerEvent) {
        // Listener runs outside the lock
        let listener = lock(&self.inner).listener.clone();
        match listener {
            Some(listener) => listener(event),
            None => debug!(?event, "[sim] no listener attached, event dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[tokio::test]
    async fn test_prepare_completes_to_ready() {
        let mut player = SimulatedPlayer::new(Duration::from_millis(1));
        player.open("http://x/stream.m3u8").unwrap();

        let (tx, rx) = mpsc::channel();
        player
            .prepare_async(Box::new(move |r| tx.send(r).unwrap()))
            .unwrap();
        assert_eq!(player.state(), PlayerState::Preparing);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(rx.try_recv().unwrap(), Ok(()));
        assert_eq!(player.state(), PlayerState::Ready);
    }

    #[tokio::test]
    async fn test_prepare_after_close_never_completes() {
        let mut player = SimulatedPlayer::new(Duration::from_millis(1));
        player.open("http://x/stream.m3u8").unwrap();

        let (tx, rx) = mpsc::channel();
        player
            .prepare_async(Box::new(move |r| tx.send(r).unwrap()))
            .unwrap();
        player.stop().unwrap();
        player.close().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(player.state(), PlayerState::None);
    }

    #[tokio::test]
    async fn test_injected_prepare_failure() {
        let mut player = SimulatedPlayer::new(Duration::from_millis(1));
        let remote = player.remote();
        remote.fail_next_prepare("no route");
        player.open("http://x/stream.m3u8").unwrap();

        let (tx, rx) = mpsc::channel();
        player
            .prepare_async(Box::new(move |r| tx.send(r).unwrap()))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().unwrap().is_err());
        assert_eq!(remote.state(), PlayerState::Error);
    }

    #[test]
    fn test_play_requires_ready_or_paused() {
        let mut player = SimulatedPlayer::default();
        assert!(player.play().is_err());
        player.open("http://x/stream.m3u8").unwrap();
        assert!(player.play().is_err());
    }

    #[test]
    fn test_remote_emits_to_listener() {
        let mut player = SimulatedPlayer::default();
        let (tx, rx) = mpsc::channel();
        player.set_listener(Box::new(move |e| {
            let _ = tx.send(e);
        }));

        player.remote().end_of_stream();
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::StreamCompleted);
    }
}
