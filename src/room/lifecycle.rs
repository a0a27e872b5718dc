//! Leave/end state machine
//!
//! ```text
//! Joined --leave (participant)--> Leaving --> Left
//! Joined --leave/end (host)-----> Ending  --> Ended
//! Joined --host ended-----------> Ended
//! ```
//!
//! Backend notification is best effort. The local exit always completes.

use std::sync::{Arc, Mutex};

use crate::api::MeetingBackend;
use crate::session::Session;

use super::connector::CallConnector;
use super::metrics::MetricsLoop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Joined,
    Leaving,
    Left,
    Ending,
    Ended,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Left | LifecycleState::Ended)
    }
}

/// Where the user goes once the call is left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Participant left; the meeting goes on
    Left,
    /// Meeting is over for everyone
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Leave,
    End,
    /// Someone else ended the meeting; nothing to report upstream
    Remote,
}

pub struct MeetingLifecycle {
    session: Session,
    backend: Arc<dyn MeetingBackend>,
    metrics: Arc<MetricsLoop>,
    connector: Arc<CallConnector>,
    state: Mutex<LifecycleState>,
}

impl MeetingLifecycle {
    pub fn new(
        session: Session,
        backend: Arc<dyn MeetingBackend>,
        metrics: Arc<MetricsLoop>,
        connector: Arc<CallConnector>,
    ) -> Self {
        Self {
            session,
            backend,
            metrics,
            connector,
            state: Mutex::new(LifecycleState::Joined),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(LifecycleState::Left)
    }

    /// Leave button: a host ends the meeting, a participant leaves it
    ///
    /// Returns `None` when an exit is already under way or done.
    pub async fn leave(&self) -> Option<Exit> {
        let path = if self.session.role.is_host() {
            Path::End
        } else {
            Path::Leave
        };
        self.exit(path).await
    }

    /// Explicit end; only a host may end, anyone else just leaves
    pub async fn end(&self) -> Option<Exit> {
        if !self.session.role.is_host() {
            tracing::warn!(
                meeting_id = self.session.meeting_id,
                user_id = self.session.user_id,
                "Only the host can end the meeting, leaving instead"
            );
            return self.exit(Path::Leave).await;
        }
        self.exit(Path::End).await
    }

    /// The host ended the meeting elsewhere
    pub async fn host_ended(&self) -> Option<Exit> {
        self.exit(Path::Remote).await
    }

    fn begin(&self, path: Path) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if *state != LifecycleState::Joined {
            tracing::debug!(state = ?*state, "Exit already in progress");
            return false;
        }
        *state = match path {
            Path::Leave => LifecycleState::Leaving,
            Path::End | Path::Remote => LifecycleState::Ending,
        };
        true
    }

    fn finish(&self, state: LifecycleState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    async fn exit(&self, path: Path) -> Option<Exit> {
        if !self.begin(path) {
            return None;
        }

        let Session {
            meeting_id,
            user_id,
            ..
        } = self.session;

        self.metrics.stop();

        let notified = match path {
            Path::Leave => Some(("leave", self.backend.leave_meeting(meeting_id, user_id).await)),
            Path::End => Some(("end", self.backend.end_meeting(meeting_id).await)),
            Path::Remote => None,
        };
        if let Some((action, Err(e))) = notified {
            tracing::warn!(
                meeting_id,
                user_id,
                action = %action,
                error = %e,
                "Backend notification failed, exiting anyway"
            );
        }

        self.connector.leave_call().await;

        let (state, exit) = match path {
            Path::Leave => (LifecycleState::Left, Exit::Left),
            Path::End | Path::Remote => (LifecycleState::Ended, Exit::Ended),
        };
        self.finish(state);

        tracing::info!(meeting_id, user_id, state = ?state, "Meeting exited");
        Some(exit)
    }
}
