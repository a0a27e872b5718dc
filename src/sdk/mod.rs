//! Seams over the hosted video and chat SDKs
//!
//! The room only ever talks to these traits. `headless` provides in-memory
//! clients for the CLI presence mode and for tests.

pub mod headless;

use async_trait::async_trait;

use crate::api::types::User;
use crate::error::Result;
use crate::room::participant::Participant;

pub use headless::{CallJournal, HeadlessChatClient, HeadlessVideoClient};

/// Identity presented to the hosted SDKs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkUser {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for SdkUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            image: user.image_path.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SdkCredentials {
    pub api_key: String,
    /// Session token minted by the backend's join
    pub token: String,
}

#[async_trait]
pub trait VideoClient: Send + Sync {
    async fn connect_user(&self, user: &SdkUser, credentials: &SdkCredentials) -> Result<()>;

    async fn disconnect_user(&self) -> Result<()>;

    /// Joins the call keyed by `call_id`, creating it if needed
    async fn join_call(&self, call_id: &str) -> Result<()>;

    async fn leave_call(&self) -> Result<()>;

    async fn set_camera(&self, enabled: bool) -> Result<()>;

    async fn set_microphone(&self, enabled: bool) -> Result<()>;

    async fn set_screen_share(&self, enabled: bool) -> Result<()>;

    /// Current participant snapshot, in SDK order
    fn participants(&self) -> Vec<Participant>;
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn connect_user(&self, user: &SdkUser, credentials: &SdkCredentials) -> Result<()>;

    async fn disconnect_user(&self) -> Result<()>;

    async fn watch_channel(&self, channel_id: &str) -> Result<()>;
}
