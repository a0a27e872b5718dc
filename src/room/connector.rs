use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MeetError, Result};
use crate::sdk::{ChatClient, SdkCredentials, SdkUser, VideoClient};
use crate::session::JoinedSession;

/// Owns the video and chat SDK connections of one joined session
///
/// `connect` runs at most once per connector. Whatever it acquired is released
/// either on its own failure path or by `teardown`.
pub struct CallConnector {
    video: Arc<dyn VideoClient>,
    chat: Arc<dyn ChatClient>,
    api_key: String,
    started: AtomicBool,
    in_call: AtomicBool,
    video_connected: AtomicBool,
    chat_connected: AtomicBool,
}

impl CallConnector {
    pub fn new(video: Arc<dyn VideoClient>, chat: Arc<dyn ChatClient>, api_key: impl Into<String>) -> Self {
        Self {
            video,
            chat,
            api_key: api_key.into(),
            started: AtomicBool::new(false),
            in_call: AtomicBool::new(false),
            video_connected: AtomicBool::new(false),
            chat_connected: AtomicBool::new(false),
        }
    }

    pub fn video(&self) -> &Arc<dyn VideoClient> {
        &self.video
    }

    pub fn is_connected(&self) -> bool {
        self.video_connected.load(Ordering::SeqCst)
    }

    /// Connects video, joins the call, connects chat and watches the meeting channel
    ///
    /// Returns `Ok(false)` without touching either SDK when a connect was already
    /// issued on this connector.
    pub async fn connect(&self, joined: &JoinedSession) -> Result<bool> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(meeting_id = joined.session.meeting_id, "Connect already issued");
            return Ok(false);
        }

        let user = SdkUser::from(&joined.user);
        let credentials = SdkCredentials {
            api_key: self.api_key.clone(),
            token: joined.sdk_token.clone(),
        };
        let call_id = joined.session.meeting_id.to_string();
        let channel_id = joined.session.chat_channel_id();

        self.video
            .connect_user(&user, &credentials)
            .await
            .map_err(|e| connection_error("video connect", e))?;
        self.video_connected.store(true, Ordering::SeqCst);

        if let Err(e) = self.video.join_call(&call_id).await {
            self.teardown().await;
            return Err(connection_error("call join", e));
        }
        self.in_call.store(true, Ordering::SeqCst);

        if let Err(e) = self.chat.connect_user(&user, &credentials).await {
            self.teardown().await;
            return Err(connection_error("chat connect", e));
        }
        self.chat_connected.store(true, Ordering::SeqCst);

        if let Err(e) = self.chat.watch_channel(&channel_id).await {
            self.teardown().await;
            return Err(connection_error("chat watch", e));
        }

        tracing::info!(
            meeting_id = joined.session.meeting_id,
            user_id = %user.id,
            channel = %channel_id,
            "Call and chat connected"
        );
        Ok(true)
    }

    /// Leaves the call if still in it; later calls are no-ops
    pub async fn leave_call(&self) {
        if !self.in_call.swap(false, Ordering::SeqCst) {
            return;
        }
        match self.video.leave_call().await {
            Ok(()) => tracing::info!("Left call"),
            Err(e) => tracing::warn!(error = %e, "Failed to leave call"),
        }
    }

    /// Releases both clients; returns false when nothing was held
    pub async fn teardown(&self) -> bool {
        self.leave_call().await;

        let video_held = self.video_connected.swap(false, Ordering::SeqCst);
        let chat_held = self.chat_connected.swap(false, Ordering::SeqCst);
        if !video_held && !chat_held {
            return false;
        }

        let (video, chat) = futures::join!(
            async {
                if video_held {
                    self.video.disconnect_user().await
                } else {
                    Ok(())
                }
            },
            async {
                if chat_held {
                    self.chat.disconnect_user().await
                } else {
                    Ok(())
                }
            }
        );
        if let Err(e) = video {
            tracing::warn!(error = %e, "Failed to disconnect video client");
        }
        if let Err(e) = chat {
            tracing::warn!(error = %e, "Failed to disconnect chat client");
        }

        tracing::info!("Call connector torn down");
        true
    }
}

fn connection_error(stage: &str, err: MeetError) -> MeetError {
    tracing::error!(stage = %stage, error = %err, "SDK connection failed");
    match err {
        MeetError::SdkConnection(msg) => MeetError::SdkConnection(format!("{}: {}", stage, msg)),
        other => MeetError::sdk(format!("{}: {}", stage, other)),
    }
}
