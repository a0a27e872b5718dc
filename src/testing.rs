//! Test doubles shared by unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::types::{JoinMeetingResponse, JoiningUser, MetricsSample, User};
use crate::api::MeetingBackend;
use crate::error::{MeetError, Result};

/// Scripted backend recording every side effect
#[derive(Default)]
pub struct FakeBackend {
    pub token: bool,
    pub user_id: i64,
    pub host_id: Option<i64>,
    pub join_response: JoinMeetingResponse,
    pub fail_writes: bool,
    pub joins: AtomicUsize,
    pub joined_as: Mutex<Vec<JoiningUser>>,
    pub user_lookups: AtomicUsize,
    pub leaves: AtomicUsize,
    pub ends: AtomicUsize,
    pub camera_events: Mutex<Vec<bool>>,
    pub samples: Mutex<Vec<MetricsSample>>,
}

impl FakeBackend {
    pub fn new(user_id: i64, host_id: i64) -> Self {
        Self {
            token: true,
            user_id,
            host_id: Some(host_id),
            join_response: JoinMeetingResponse {
                token: Some("sdk-token".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn write(&self) -> Result<()> {
        if self.fail_writes {
            Err(MeetError::network("backend unreachable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MeetingBackend for FakeBackend {
    fn has_token(&self) -> bool {
        self.token
    }

    async fn current_user(&self) -> Result<User> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(User {
            id: self.user_id,
            name: format!("user-{}", self.user_id),
            email: None,
            image_path: None,
        })
    }

    async fn meeting_host(&self, meeting_id: i64) -> Result<i64> {
        self.host_id
            .ok_or_else(|| MeetError::NotFound(format!("meeting {}", meeting_id)))
    }

    async fn join_meeting(&self, _meeting_id: i64, user: &JoiningUser) -> Result<JoinMeetingResponse> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        self.joined_as.lock().unwrap().push(user.clone());
        Ok(self.join_response.clone())
    }

    async fn leave_meeting(&self, _meeting_id: i64, _user_id: i64) -> Result<()> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        self.write()
    }

    async fn end_meeting(&self, _meeting_id: i64) -> Result<()> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        self.write()
    }

    async fn camera_on(&self, _meeting_id: i64, _user_id: i64) -> Result<()> {
        self.camera_events.lock().unwrap().push(true);
        self.write()
    }

    async fn camera_off(&self, _meeting_id: i64, _user_id: i64) -> Result<()> {
        self.camera_events.lock().unwrap().push(false);
        self.write()
    }

    async fn post_metrics(&self, sample: &MetricsSample) -> Result<()> {
        self.samples.lock().unwrap().push(sample.clone());
        self.write()
    }
}

impl FakeBackend {
    pub fn leave_count(&self) -> usize {
        self.leaves.load(Ordering::SeqCst)
    }

    pub fn end_count(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }
}
