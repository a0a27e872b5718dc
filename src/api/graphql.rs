use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{de, GraphQlResponse, Meeting, Organization, User, UserHome};
use super::{check_status, BackendClient};
use crate::error::{MeetError, Result};

/// Meetings listed per organization on the home page
pub const HOME_MEETINGS_LIMIT: u32 = 2;

const CURRENT_USER_FIELDS: &str = "id name email ImagePath";

const PARTICIPANT_FIELDS: &str = "id meetingId userId totalActiveSeconds avgAttention avgGaze \
     avgFace firstJoinTime lastLeaveTime user { id name ImagePath }";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeetingHost {
    #[serde(default, deserialize_with = "de::opt_id")]
    host_id: Option<i64>,
}

impl BackendClient {
    /// Runs one query and extracts `data.<field>`
    async fn query<T: DeserializeOwned>(&self, query: String, field: &str, what: &str) -> Result<T> {
        let request = self
            .authorized(self.client.post(self.config.graphql_url()))?
            .json(&json!({ "query": query }));

        let response = check_status(request.send().await?).await?;
        let payload: GraphQlResponse<Value> = response
            .json()
            .await
            .map_err(|e| MeetError::UnexpectedResponse(format!("GraphQL body: {}", e)))?;

        if let Some(errors) = payload.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            tracing::warn!(field = %field, errors = ?messages, "GraphQL query failed");
            return Err(MeetError::GraphQl(messages));
        }

        match payload.data.and_then(|mut data| data.get_mut(field).map(Value::take)) {
            None | Some(Value::Null) => Err(MeetError::NotFound(what.to_string())),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    pub async fn current_user(&self) -> Result<User> {
        let query = format!("{{ getUserbyId {{ {} }} }}", CURRENT_USER_FIELDS);
        self.query(query, "getUserbyId", "current user").await
    }

    pub async fn meeting_host(&self, meeting_id: i64) -> Result<i64> {
        let query = format!("{{ getMeetingById(id: {}) {{ id hostId }} }}", meeting_id);
        let meeting: MeetingHost = self
            .query(query, "getMeetingById", &format!("meeting {}", meeting_id))
            .await?;

        meeting.host_id.ok_or_else(|| {
            MeetError::UnexpectedResponse(format!("meeting {} has no host", meeting_id))
        })
    }

    /// Meeting with schedule and per-participant engagement rows
    pub async fn meeting(&self, meeting_id: i64) -> Result<Meeting> {
        let query = format!(
            "query {{ getMeetingById(id: {}) {{ id name description organizationId startTime \
             daily weekly EnableEngagement Engagment meetingDuration meetingLink hostId \
             participants {{ {} }} }} }}",
            meeting_id, PARTICIPANT_FIELDS
        );
        self.query(query, "getMeetingById", &format!("meeting {}", meeting_id))
            .await
    }

    pub async fn organization(&self, organization_id: i64) -> Result<Organization> {
        let query = format!(
            "query {{ getOrganizationbyId(id: {}) {{ id name description organizationCode \
             createAt ownerId owner {{ id name email ImagePath }} \
             meeting {{ id name startTime Engagment meetingDuration hostId }} \
             members {{ id joinedAt user {{ id name email ImagePath }} }} }} }}",
            organization_id
        );
        self.query(
            query,
            "getOrganizationbyId",
            &format!("organization {}", organization_id),
        )
        .await
    }

    /// Landing data: memberships and owned organizations with meetings since `since`
    pub async fn user_home(&self, since: DateTime<Utc>) -> Result<UserHome> {
        let org_fields = format!(
            "id name totalParticipants createAt ownerId \
             meeting(time: \"{}\", limit: {}) {{ id name startTime meetingDuration }}",
            since.timestamp_millis(),
            HOME_MEETINGS_LIMIT
        );
        let query = format!(
            "{{ getUserbyId {{ {} member {{ organization {{ {} }} }} \
             ownedOrganizations {{ {} }} }} }}",
            CURRENT_USER_FIELDS, org_fields, org_fields
        );
        self.query(query, "getUserbyId", "current user").await
    }
}
