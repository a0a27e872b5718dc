//! Live meeting room: SDK connections, engagement sampling and exit handling
//!
//! A room is driven by [`RoomCommand`]s sent through its [`RoomHandle`].
//! `run` consumes commands until the session exits and always tears the SDK
//! connections down before returning.

pub mod connector;
pub mod events;
pub mod layout;
pub mod lifecycle;
pub mod metrics;
pub mod participant;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::api::MeetingBackend;
use crate::config::Config;
use crate::error::Result;
use crate::sdk::{ChatClient, VideoClient};
use crate::session::{JoinedSession, Session};

pub use connector::CallConnector;
pub use events::{RoomCommand, RoomCommands, RoomHandle};
pub use layout::{derive_layout, format_elapsed, Layout, Tile};
pub use lifecycle::{Exit, LifecycleState, MeetingLifecycle};
pub use metrics::{CameraGate, MetricsLoop, SampleSource, SyntheticSource};
pub use participant::Participant;

/// External collaborators a room is wired to
pub struct RoomServices {
    pub backend: Arc<dyn MeetingBackend>,
    pub video: Arc<dyn VideoClient>,
    pub chat: Arc<dyn ChatClient>,
    pub source: Arc<dyn SampleSource>,
}

pub struct MeetingRoom {
    joined: JoinedSession,
    backend: Arc<dyn MeetingBackend>,
    connector: Arc<CallConnector>,
    metrics: Arc<MetricsLoop>,
    lifecycle: MeetingLifecycle,
    commands: RoomCommands,
    microphone: bool,
    screen_share: bool,
    opened_at: Instant,
}

impl MeetingRoom {
    /// Connects the SDKs and starts engagement sampling
    ///
    /// A connection failure is returned as-is; nothing stays connected.
    pub async fn open(
        joined: JoinedSession,
        services: RoomServices,
        config: &Config,
    ) -> Result<(Self, RoomHandle)> {
        let RoomServices {
            backend,
            video,
            chat,
            source,
        } = services;

        let connector = Arc::new(CallConnector::new(
            video,
            chat,
            config.sdk.api_key.clone().unwrap_or_default(),
        ));
        connector.connect(&joined).await?;

        // The call starts with the camera on
        let gate = CameraGate::new(true);
        let metrics = Arc::new(MetricsLoop::new(
            Arc::clone(&backend),
            source,
            gate,
            config.metrics_interval(),
        ));
        metrics.start(&joined.session);

        let lifecycle = MeetingLifecycle::new(
            joined.session,
            Arc::clone(&backend),
            Arc::clone(&metrics),
            Arc::clone(&connector),
        );
        let (handle, commands) = events::channel();

        tracing::info!(
            meeting_id = joined.session.meeting_id,
            role = %joined.session.role,
            "Meeting room opened"
        );

        let room = Self {
            joined,
            backend,
            connector,
            metrics,
            lifecycle,
            commands,
            microphone: true,
            screen_share: false,
            opened_at: Instant::now(),
        };
        Ok((room, handle))
    }

    pub fn session(&self) -> &Session {
        &self.joined.session
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn camera_on(&self) -> bool {
        self.metrics.gate().is_on()
    }

    pub fn sampling(&self) -> bool {
        self.metrics.is_running()
    }

    /// Layout of the current participant snapshot
    pub fn layout(&self) -> Layout {
        derive_layout(&self.connector.video().participants())
    }

    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// `MM:SS` since the room opened
    pub fn clock(&self) -> String {
        format_elapsed(self.elapsed().as_secs())
    }

    /// Processes commands until the session exits
    ///
    /// When every handle is dropped the room leaves on its own.
    pub async fn run(mut self) -> Exit {
        let exit = loop {
            let Some(command) = self.commands.recv().await else {
                tracing::info!("All room handles dropped, leaving");
                break self.lifecycle.leave().await.unwrap_or(Exit::Left);
            };
            if let Some(exit) = self.handle(command).await {
                break exit;
            }
        };

        self.metrics.stop();
        self.connector.teardown().await;
        exit
    }

    async fn handle(&mut self, command: RoomCommand) -> Option<Exit> {
        tracing::debug!(command = ?command, "Room command");
        match command {
            RoomCommand::Leave => self.lifecycle.leave().await,
            RoomCommand::End => self.lifecycle.end().await,
            RoomCommand::HostEnded => self.lifecycle.host_ended().await,
            RoomCommand::CameraOn => {
                self.set_camera(true).await;
                None
            }
            RoomCommand::CameraOff => {
                self.set_camera(false).await;
                None
            }
            RoomCommand::ToggleMicrophone => {
                self.toggle_microphone().await;
                None
            }
            RoomCommand::ToggleScreenShare => {
                self.toggle_screen_share().await;
                None
            }
        }
    }

    /// Keeps the sampling gate in step with the camera the SDK actually has
    ///
    /// Disabling closes the gate before the SDK call so no sample slips
    /// through; enabling opens it only once the SDK reports success. A failed
    /// toggle restores the gate and is not reported to the backend.
    async fn set_camera(&self, enabled: bool) {
        let Session {
            meeting_id,
            user_id,
            ..
        } = self.joined.session;
        let gate = self.metrics.gate();
        let was_on = gate.is_on();

        if !enabled {
            gate.set(false);
        }
        if let Err(e) = self.connector.video().set_camera(enabled).await {
            gate.set(was_on);
            tracing::warn!(enabled, camera_on = was_on, error = %e, "Failed to toggle camera");
            return;
        }
        gate.set(enabled);

        let notified = if enabled {
            self.backend.camera_on(meeting_id, user_id).await
        } else {
            self.backend.camera_off(meeting_id, user_id).await
        };
        match notified {
            Ok(()) => tracing::info!(meeting_id, user_id, enabled, "Camera state reported"),
            Err(e) => tracing::warn!(meeting_id, enabled, error = %e, "Failed to report camera state"),
        }
    }

    pub async fn toggle_microphone(&mut self) -> bool {
        let enabled = !self.microphone;
        match self.connector.video().set_microphone(enabled).await {
            Ok(()) => self.microphone = enabled,
            Err(e) => tracing::warn!(enabled, error = %e, "Failed to toggle microphone"),
        }
        self.microphone
    }

    pub async fn toggle_screen_share(&mut self) -> bool {
        let enabled = !self.screen_share;
        match self.connector.video().set_screen_share(enabled).await {
            Ok(()) => self.screen_share = enabled,
            Err(e) => tracing::warn!(enabled, error = %e, "Failed to toggle screen share"),
        }
        self.screen_share
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::User;
    use crate::sdk::{CallJournal, HeadlessChatClient, HeadlessVideoClient};
    use crate::session::Role;
    use crate::testing::FakeBackend;

    fn joined(role: Role) -> JoinedSession {
        JoinedSession {
            session: Session {
                user_id: 3,
                role,
                meeting_id: 12,
            },
            user: User {
                id: 3,
                name: "Ada".into(),
                email: None,
                image_path: None,
            },
            sdk_token: "t".into(),
        }
    }

    struct Setup {
        backend: Arc<FakeBackend>,
        video: Arc<HeadlessVideoClient>,
        journal: CallJournal,
    }

    fn setup() -> Setup {
        let journal = CallJournal::default();
        Setup {
            backend: Arc::new(FakeBackend::new(3, 1)),
            video: Arc::new(HeadlessVideoClient::new(journal.clone())),
            journal,
        }
    }

    async fn open(setup: &Setup, role: Role) -> (MeetingRoom, RoomHandle) {
        let services = RoomServices {
            backend: setup.backend.clone(),
            video: setup.video.clone(),
            chat: Arc::new(HeadlessChatClient::new(setup.journal.clone())),
            source: Arc::new(SyntheticSource),
        };
        MeetingRoom::open(joined(role), services, &Config::with_api_url("http://localhost:1"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_connects_and_samples() {
        let setup = setup();
        let (room, _handle) = open(&setup, Role::Participant).await;

        assert!(room.sampling());
        assert!(room.camera_on());
        assert_eq!(room.state(), LifecycleState::Joined);
        assert!(setup.video.in_call());

        let layout = room.layout();
        assert_eq!(layout.tile_count(), 1);
        assert_eq!(layout.tiles()[0].label, "You");
    }

    #[tokio::test]
    async fn test_run_leaves_and_tears_down() {
        let setup = setup();
        let (room, handle) = open(&setup, Role::Participant).await;

        handle.set_camera(false);
        handle.leave();
        handle.leave();
        assert_eq!(room.run().await, Exit::Left);

        assert_eq!(setup.backend.leave_count(), 1);
        assert_eq!(*setup.backend.camera_events.lock().unwrap(), vec![false]);
        assert!(!setup.video.in_call());
        assert!(setup.journal.lock().unwrap().contains(&"chat.disconnect".to_string()));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_host_ended_signal() {
        let setup = setup();
        let (room, handle) = open(&setup, Role::Host).await;

        handle.host_ended();
        assert_eq!(room.run().await, Exit::Ended);
        assert_eq!(setup.backend.end_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_handle_leaves() {
        let setup = setup();
        let (room, handle) = open(&setup, Role::Host).await;

        drop(handle);
        assert_eq!(room.run().await, Exit::Ended);
        assert_eq!(setup.backend.end_count(), 1);
    }

    #[tokio::test]
    async fn test_camera_toggle_gates_sampling() {
        let setup = setup();
        let (mut room, _handle) = open(&setup, Role::Participant).await;

        room.handle(RoomCommand::CameraOff).await;
        assert!(!room.camera_on());
        assert!(room.sampling(), "loop keeps running with the camera off");
        assert!(!setup.video.camera_enabled());

        room.handle(RoomCommand::CameraOn).await;
        assert!(room.camera_on());
        assert_eq!(*setup.backend.camera_events.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_camera_on_keeps_sampling_off() {
        let setup = setup();
        let (mut room, _handle) = open(&setup, Role::Participant).await;

        room.handle(RoomCommand::CameraOff).await;
        setup.video.set_camera_failing(true);
        room.handle(RoomCommand::CameraOn).await;

        assert!(!setup.video.camera_enabled());
        assert!(!room.camera_on());
        tokio::time::sleep(Duration::from_secs(16)).await;

        assert!(setup.backend.samples.lock().unwrap().is_empty());
        assert_eq!(*setup.backend.camera_events.lock().unwrap(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_camera_off_keeps_sampling_on() {
        let setup = setup();
        let (mut room, _handle) = open(&setup, Role::Participant).await;

        setup.video.set_camera_failing(true);
        room.handle(RoomCommand::CameraOff).await;

        assert!(setup.video.camera_enabled());
        assert!(room.camera_on());
        assert!(setup.backend.camera_events.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(setup.backend.samples.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggles() {
        let setup = setup();
        let (mut room, _handle) = open(&setup, Role::Participant).await;

        assert!(!room.toggle_microphone().await);
        assert!(room.toggle_screen_share().await);

        let layout = room.layout();
        assert_eq!(layout.presenter().map(|t| t.label.as_str()), Some("You"));
        assert!(layout.tiles()[0].muted_badge);
    }
}
