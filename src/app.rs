//! Application event loop
//!
//! Every input (key press, visibility change, network completion, player
//! callback, delayed restart) arrives as an [`Event`] on one channel and is
//! handled to completion before the next one is taken. Spawned tasks never
//! touch the controller directly; they only post events back.

use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::{EndpointResolver, ResolutionError};
use crate::config::Config;
use crate::controller::LifecycleController;
use crate::host::{AudioControl, Host};
use crate::input::InputRouter;
use crate::models::{PlayerEvent, ResolvedEndpoint, Visibility};
use crate::player::{DeviceError, PlayerDevice, PlayerHandle};

// =============================================================================
// Events
// =============================================================================

/// Everything the application reacts to
#[derive(Debug)]
pub enum Event {
    /// Remote-control key code
    Key(u32),
    Visibility(Visibility),
    /// Delayed (re)start after app launch or return to foreground, tagged
    /// with the visibility epoch it was scheduled in
    StartPlayback { token: u64 },
    /// Stream resolution finished for session `generation`
    Resolved {
        generation: u64,
        result: Result<ResolvedEndpoint, ResolutionError>,
    },
    /// Hardware prepare finished for session `generation`
    PrepareCompleted {
        generation: u64,
        result: Result<(), DeviceError>,
    },
    /// Listener notification for session `generation`
    Player { generation: u64, event: PlayerEvent },
    /// Release everything and stop the loop
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<Event>;

// =============================================================================
// App
// =============================================================================

/// The running application
pub struct App {
    controller: LifecycleController,
    router: InputRouter,
    sender: EventSender,
    events: mpsc::UnboundedReceiver<Event>,
}

impl App {
    pub fn new(
        config: &Config,
        device: Box<dyn PlayerDevice>,
        resolver: Arc<dyn EndpointResolver>,
        host: Arc<dyn Host>,
        audio: Box<dyn AudioControl>,
    ) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        let controller = LifecycleController::new(
            PlayerHandle::new(device),
            resolver,
            Arc::clone(&host),
            sender.clone(),
        );
        let router = InputRouter::new(host, audio, sender.clone(), config.restart_delay());

        Self {
            controller,
            router,
            sender,
            events,
        }
    }

    /// Handle for feeding external events into the loop
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut LifecycleController {
        &mut self.controller
    }

    /// Create the player surface and queue the first session
    pub fn init(&mut self) {
        info!("Application initialized.");
        self.router.schedule_playback(&self.controller);
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: Event) -> ControlFlow<()> {
        match event {
            Event::Key(code) => return self.router.handle_key(code, &mut self.controller),
            Event::Visibility(visibility) => {
                self.router
                    .handle_visibility(visibility, &mut self.controller)
            }
            Event::StartPlayback { token } => {
                self.router.restart_playback(token, &mut self.controller)
            }
            Event::Resolved { generation, result } => {
                self.controller.on_resolved(generation, result)
            }
            Event::PrepareCompleted { generation, result } => {
                self.controller.on_prepare_completed(generation, result)
            }
            Event::Player { generation, event } => {
                self.controller.on_player_event(generation, event)
            }
            Event::Shutdown => {
                info!("Shutting down");
                self.controller.teardown_session();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Wait for the next event and handle it
    pub async fn step(&mut self) -> ControlFlow<()> {
        match self.events.recv().await {
            Some(event) => {
                debug!(?event, "Event");
                self.handle(event)
            }
            None => ControlFlow::Break(()),
        }
    }

    /// Run until exit or shutdown
    pub async fn run(mut self) {
        self.init();
        while self.step().await.is_continue() {}
        info!("Event loop finished");
    }
}
