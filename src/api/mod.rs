//! Backend client for the meeting service's GraphQL and REST endpoints

mod graphql;
mod rest;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};

use crate::config::Config;
use crate::error::{MeetError, Result};
use crate::token::TokenStore;
use types::{JoinMeetingResponse, JoiningUser, MetricsSample, User};

/// Backend operations the meeting room depends on
#[async_trait]
pub trait MeetingBackend: Send + Sync {
    /// False when no auth token was available at construction
    fn has_token(&self) -> bool;

    async fn current_user(&self) -> Result<User>;

    /// Host user id of a meeting
    async fn meeting_host(&self, meeting_id: i64) -> Result<i64>;

    /// Registers attendance for `user` and returns the SDK session token
    async fn join_meeting(&self, meeting_id: i64, user: &JoiningUser) -> Result<JoinMeetingResponse>;

    async fn leave_meeting(&self, meeting_id: i64, user_id: i64) -> Result<()>;

    async fn end_meeting(&self, meeting_id: i64) -> Result<()>;

    async fn camera_on(&self, meeting_id: i64, user_id: i64) -> Result<()>;

    async fn camera_off(&self, meeting_id: i64, user_id: i64) -> Result<()>;

    async fn post_metrics(&self, sample: &MetricsSample) -> Result<()>;
}

/// HTTP client bound to one backend and one auth token
///
/// The token is read from the store once, when the client is built. A
/// fresh login requires building a new client.
#[derive(Clone)]
pub struct BackendClient {
    config: Arc<Config>,
    client: reqwest::Client,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(config: Config, tokens: &dyn TokenStore) -> Result<Self> {
        Self::with_token(config, tokens.load())
    }

    pub fn with_token(config: Config, token: Option<String>) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| MeetError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            client,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Attaches the bearer token, failing fast when there is none
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(MeetError::MissingToken),
        }
    }
}

/// Maps non-success statuses onto the error taxonomy
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED => Err(MeetError::Unauthorized),
        StatusCode::NOT_FOUND => Err(MeetError::NotFound(if body.is_empty() {
            "resource".to_string()
        } else {
            body
        })),
        _ => Err(MeetError::Backend {
            status: status.as_u16(),
            body,
        }),
    }
}

#[async_trait]
impl MeetingBackend for BackendClient {
    fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn current_user(&self) -> Result<User> {
        BackendClient::current_user(self).await
    }

    async fn meeting_host(&self, meeting_id: i64) -> Result<i64> {
        BackendClient::meeting_host(self, meeting_id).await
    }

    async fn join_meeting(&self, meeting_id: i64, user: &JoiningUser) -> Result<JoinMeetingResponse> {
        BackendClient::join_meeting(self, meeting_id, user).await
    }

    async fn leave_meeting(&self, meeting_id: i64, user_id: i64) -> Result<()> {
        BackendClient::leave_meeting(self, meeting_id, user_id).await
    }

    async fn end_meeting(&self, meeting_id: i64) -> Result<()> {
        BackendClient::end_meeting(self, meeting_id).await
    }

    async fn camera_on(&self, meeting_id: i64, user_id: i64) -> Result<()> {
        BackendClient::camera_on(self, meeting_id, user_id).await
    }

    async fn camera_off(&self, meeting_id: i64, user_id: i64) -> Result<()> {
        BackendClient::camera_off(self, meeting_id, user_id).await
    }

    async fn post_metrics(&self, sample: &MetricsSample) -> Result<()> {
        BackendClient::post_metrics(self, sample).await
    }
}
