//! Session bootstrap: who the local user is and what they may do in a meeting

mod resolver;

pub use resolver::SessionResolver;

use serde::{Deserialize, Serialize};

use crate::api::types::User;

/// Role of the local user within one meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Owner of the meeting, may end it for everyone
    Host,
    #[serde(rename = "User", alias = "Participant")]
    Participant,
}

impl Role {
    /// Host iff the meeting's host id is the current user's id
    pub fn resolve(host_id: i64, user_id: i64) -> Self {
        if host_id == user_id {
            Role::Host
        } else {
            Role::Participant
        }
    }

    pub fn is_host(self) -> bool {
        matches!(self, Role::Host)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Host => write!(f, "Host"),
            Role::Participant => write!(f, "Participant"),
        }
    }
}

/// Fixed for the lifetime of a joined meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub role: Role,
    pub meeting_id: i64,
}

impl Session {
    /// Chat channel bound to this meeting
    pub fn chat_channel_id(&self) -> String {
        format!("messaging:{}", self.meeting_id)
    }
}

/// Outcome of a successful join
#[derive(Debug, Clone)]
pub struct JoinedSession {
    pub session: Session,
    pub user: User,
    /// Short-lived credential for the hosted video/chat service
    pub sdk_token: String,
}
