use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ChatClient, SdkCredentials, SdkUser, VideoClient};
use crate::error::{MeetError, Result};
use crate::room::participant::Participant;

/// Ordered record of SDK operations, shared between clients
pub type CallJournal = Arc<Mutex<Vec<String>>>;

fn record(journal: &CallJournal, entry: impl Into<String>) {
    if let Ok(mut entries) = journal.lock() {
        entries.push(entry.into());
    }
}

#[derive(Debug, Default)]
struct VideoState {
    user: Option<SdkUser>,
    call_id: Option<String>,
    camera: bool,
    microphone: bool,
    screen_share: bool,
    remotes: Vec<Participant>,
}

/// Video client with no media; keeps call state in memory
#[derive(Debug, Default)]
pub struct HeadlessVideoClient {
    state: Mutex<VideoState>,
    journal: CallJournal,
    fail_join: bool,
    fail_camera: AtomicBool,
}

impl HeadlessVideoClient {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    /// Client whose `join_call` always fails
    pub fn failing_join(journal: CallJournal) -> Self {
        Self {
            journal,
            fail_join: true,
            ..Default::default()
        }
    }

    /// Adds a remote participant to the snapshot
    pub fn add_remote(&self, participant: Participant) {
        if let Ok(mut state) = self.state.lock() {
            state.remotes.push(participant);
        }
    }

    /// Makes later `set_camera` calls fail, as a device that went away would
    pub fn set_camera_failing(&self, failing: bool) {
        self.fail_camera.store(failing, Ordering::SeqCst);
    }

    pub fn in_call(&self) -> bool {
        self.state.lock().map(|s| s.call_id.is_some()).unwrap_or(false)
    }

    pub fn camera_enabled(&self) -> bool {
        self.state.lock().map(|s| s.camera).unwrap_or(false)
    }
}

#[async_trait]
impl VideoClient for HeadlessVideoClient {
    async fn connect_user(&self, user: &SdkUser, credentials: &SdkCredentials) -> Result<()> {
        if credentials.token.is_empty() {
            return Err(MeetError::sdk("empty session token"));
        }
        if let Ok(mut state) = self.state.lock() {
            state.user = Some(user.clone());
        }
        record(&self.journal, "video.connect");
        tracing::debug!(user_id = %user.id, "Video client connected");
        Ok(())
    }

    async fn disconnect_user(&self) -> Result<()> {
        if let Ok(mut state) = self.state.lock() {
            let remotes = std::mem::take(&mut state.remotes);
            *state = VideoState {
                remotes,
                ..Default::default()
            };
        }
        record(&self.journal, "video.disconnect");
        Ok(())
    }

    async fn join_call(&self, call_id: &str) -> Result<()> {
        if self.fail_join {
            record(&self.journal, "video.join_failed");
            return Err(MeetError::sdk(format!("call {} rejected", call_id)));
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| MeetError::internal("video state poisoned"))?;
        if state.user.is_none() {
            return Err(MeetError::sdk("join before connect"));
        }
        state.call_id = Some(call_id.to_string());
        // The call starts with camera and microphone on
        state.camera = true;
        state.microphone = true;
        drop(state);

        record(&self.journal, format!("video.join:{}", call_id));
        Ok(())
    }

    async fn leave_call(&self) -> Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.call_id = None;
            state.screen_share = false;
        }
        record(&self.journal, "video.leave");
        Ok(())
    }

    async fn set_camera(&self, enabled: bool) -> Result<()> {
        if self.fail_camera.load(Ordering::SeqCst) {
            record(&self.journal, "video.camera_failed");
            return Err(MeetError::SdkOperation("camera unavailable".to_string()));
        }
        if let Ok(mut state) = self.state.lock() {
            state.camera = enabled;
        }
        record(&self.journal, format!("video.camera:{}", enabled));
        Ok(())
    }

    async fn set_microphone(&self, enabled: bool) -> Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.microphone = enabled;
        }
        record(&self.journal, format!("video.microphone:{}", enabled));
        Ok(())
    }

    async fn set_screen_share(&self, enabled: bool) -> Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.screen_share = enabled;
        }
        record(&self.journal, format!("video.screen_share:{}", enabled));
        Ok(())
    }

    fn participants(&self) -> Vec<Participant> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        let mut participants = Vec::with_capacity(state.remotes.len() + 1);
        if let (Some(user), Some(_)) = (&state.user, &state.call_id) {
            participants.push(Participant {
                session_id: format!("local-{}", user.id),
                user_id: user.id.clone(),
                name: Some(user.name.clone()).filter(|n| !n.is_empty()),
                is_local: true,
                has_video: state.camera,
                has_audio: state.microphone,
                is_speaking: false,
                is_screen_sharing: state.screen_share,
            });
        }
        participants.extend(state.remotes.iter().cloned());
        participants
    }
}

/// Chat client that only tracks the watched channel
#[derive(Debug, Default)]
pub struct HeadlessChatClient {
    channel: Mutex<Option<String>>,
    journal: CallJournal,
}

impl HeadlessChatClient {
    pub fn new(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    pub fn watched_channel(&self) -> Option<String> {
        self.channel.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl ChatClient for HeadlessChatClient {
    async fn connect_user(&self, user: &SdkUser, _credentials: &SdkCredentials) -> Result<()> {
        record(&self.journal, "chat.connect");
        tracing::debug!(user_id = %user.id, "Chat client connected");
        Ok(())
    }

    async fn disconnect_user(&self) -> Result<()> {
        if let Ok(mut channel) = self.channel.lock() {
            *channel = None;
        }
        record(&self.journal, "chat.disconnect");
        Ok(())
    }

    async fn watch_channel(&self, channel_id: &str) -> Result<()> {
        if let Ok(mut channel) = self.channel.lock() {
            *channel = Some(channel_id.to_string());
        }
        record(&self.journal, format!("chat.watch:{}", channel_id));
        Ok(())
    }
}
