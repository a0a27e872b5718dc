use std::sync::Arc;

use crate::api::types::{JoiningUser, User};
use crate::api::MeetingBackend;
use crate::error::{MeetError, Result};

use super::{JoinedSession, Role, Session};

/// Resolves who the local user is in a meeting and joins it on the backend
pub struct SessionResolver {
    backend: Arc<dyn MeetingBackend>,
}

impl SessionResolver {
    pub fn new(backend: Arc<dyn MeetingBackend>) -> Self {
        Self { backend }
    }

    /// Derives the session role and joins `meeting_id` on the backend
    ///
    /// The current user and the meeting host are fetched concurrently before
    /// anything is posted, so a meeting that does not resolve registers no
    /// attendance. The join carries the user and role; when its response
    /// names them too, the backend's answer is kept.
    pub async fn resolve(&self, meeting_id: i64) -> Result<JoinedSession> {
        if !self.backend.has_token() {
            return Err(MeetError::MissingToken);
        }

        let (user, role) = self.fetch_identity(meeting_id).await?;
        let joined = self
            .backend
            .join_meeting(meeting_id, &JoiningUser::new(&user, role))
            .await?;
        let sdk_token = joined
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MeetError::UnexpectedResponse("join response has no session token".into()))?;

        let (user, role) = match (joined.user, joined.role, joined.host_id) {
            (Some(user), Some(role), _) => (user, role),
            (Some(user), None, Some(host_id)) => {
                let role = Role::resolve(host_id, user.id);
                (user, role)
            }
            _ => (user, role),
        };

        tracing::info!(
            meeting_id,
            user_id = user.id,
            role = %role,
            "Session resolved"
        );

        Ok(JoinedSession {
            session: Session {
                user_id: user.id,
                role,
                meeting_id,
            },
            user,
            sdk_token,
        })
    }

    /// Resolves the session, then leaves again straight away
    ///
    /// For callers that only need the role and token: the attendance the join
    /// opened is closed before returning.
    pub async fn resolve_and_leave(&self, meeting_id: i64) -> Result<JoinedSession> {
        let joined = self.resolve(meeting_id).await?;
        self.backend
            .leave_meeting(meeting_id, joined.session.user_id)
            .await?;
        tracing::info!(meeting_id, "Left meeting after resolving");
        Ok(joined)
    }

    async fn fetch_identity(&self, meeting_id: i64) -> Result<(User, Role)> {
        let (user, host_id) = futures::try_join!(
            self.backend.current_user(),
            self.backend.meeting_host(meeting_id)
        )?;
        let role = Role::resolve(host_id, user.id);
        Ok((user, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::JoinMeetingResponse;
    use crate::testing::FakeBackend;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_host_when_meeting_host_matches() {
        let resolver = SessionResolver::new(Arc::new(FakeBackend::new(7, 7)));
        let joined = resolver.resolve(12).await.unwrap();

        assert_eq!(joined.session.role, Role::Host);
        assert_eq!(joined.session.meeting_id, 12);
        assert_eq!(joined.session.user_id, 7);
        assert_eq!(joined.sdk_token, "sdk-token");
    }

    #[tokio::test]
    async fn test_participant_when_host_differs() {
        let resolver = SessionResolver::new(Arc::new(FakeBackend::new(7, 9)));
        let joined = resolver.resolve(12).await.unwrap();
        assert_eq!(joined.session.role, Role::Participant);
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_join() {
        let backend = Arc::new(FakeBackend {
            token: false,
            ..FakeBackend::new(1, 1)
        });
        let resolver = SessionResolver::new(backend.clone());

        let err = resolver.resolve(12).await.unwrap_err();
        assert!(matches!(err, MeetError::MissingToken));
        assert_eq!(backend.joins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unresolved_meeting_is_not_found() {
        let backend = Arc::new(FakeBackend {
            host_id: None,
            ..FakeBackend::new(1, 1)
        });
        let err = SessionResolver::new(backend.clone())
            .resolve(404)
            .await
            .unwrap_err();
        assert!(matches!(err, MeetError::NotFound(_)));
        assert_eq!(backend.joins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_join_carries_user_and_role() {
        let backend = Arc::new(FakeBackend::new(7, 9));
        SessionResolver::new(backend.clone()).resolve(12).await.unwrap();

        let joined_as = backend.joined_as.lock().unwrap().clone();
        assert_eq!(joined_as.len(), 1);
        assert_eq!(joined_as[0].id, 7);
        assert_eq!(joined_as[0].name, "user-7");
        assert_eq!(joined_as[0].role, Role::Participant);
    }

    #[tokio::test]
    async fn test_resolve_and_leave_closes_attendance() {
        let backend = Arc::new(FakeBackend::new(7, 9));
        let joined = SessionResolver::new(backend.clone())
            .resolve_and_leave(12)
            .await
            .unwrap();

        assert_eq!(joined.session.role, Role::Participant);
        assert_eq!(backend.joins.load(Ordering::SeqCst), 1);
        assert_eq!(backend.leave_count(), 1);
        assert_eq!(backend.end_count(), 0);
    }

    #[tokio::test]
    async fn test_join_response_identity_wins() {
        let mut backend = FakeBackend::new(1, 9);
        backend.join_response = JoinMeetingResponse {
            token: Some("t".into()),
            role: None,
            host_id: Some(5),
            user: Some(User {
                id: 5,
                name: "Ada".into(),
                email: None,
                image_path: None,
            }),
        };
        let backend = Arc::new(backend);

        let joined = SessionResolver::new(backend.clone()).resolve(3).await.unwrap();
        assert_eq!(joined.session.role, Role::Host);
        assert_eq!(joined.session.user_id, 5);
        assert_eq!(joined.user.name, "Ada");
        assert_eq!(backend.user_lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_join_without_token_is_an_error() {
        let mut backend = FakeBackend::new(1, 1);
        backend.join_response.token = None;

        let err = SessionResolver::new(Arc::new(backend))
            .resolve(3)
            .await
            .unwrap_err();
        assert!(matches!(err, MeetError::UnexpectedResponse(_)));
    }
}
