//! Wire types for the meeting backend
//!
//! Field names follow the backend's GraphQL schema and REST payloads, which
//! mix camelCase with a few legacy spellings (`ImagePath`, `Engagment`,
//! `EnableEngagement`). Identifiers arrive either as numbers or as numeric
//! strings, and timestamps either as epoch milliseconds or RFC 3339 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "ImagePath", default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub organization_id: Option<i64>,
    #[serde(deserialize_with = "de::timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub daily: Option<bool>,
    #[serde(default)]
    pub weekly: Option<bool>,
    #[serde(rename = "EnableEngagement", default)]
    pub enable_engagement: Option<bool>,
    /// Stored session engagement, 0-100
    #[serde(rename = "Engagment", default)]
    pub engagement: Option<f64>,
    /// Scheduled length in minutes
    #[serde(default, deserialize_with = "de::minutes")]
    pub meeting_duration: i64,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub host_id: Option<i64>,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub participants: Vec<MeetingParticipant>,
}

impl Meeting {
    /// Start plus the scheduled length, saturating at the representable range
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        chrono::Duration::try_minutes(self.meeting_duration)
            .and_then(|length| self.start_time.checked_add_signed(length))
            .unwrap_or(if self.meeting_duration < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}

/// Per-participant engagement aggregate kept by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingParticipant {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub meeting_id: Option<i64>,
    #[serde(deserialize_with = "de::id")]
    pub user_id: i64,
    #[serde(default)]
    pub total_active_seconds: f64,
    #[serde(default)]
    pub avg_attention: f64,
    #[serde(default)]
    pub avg_gaze: Option<f64>,
    #[serde(default)]
    pub avg_face: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub first_join_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub last_leave_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organization_code: Option<String>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub create_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub total_participants: Option<i64>,
    #[serde(default)]
    pub owner: Option<User>,
    #[serde(rename = "meeting", default, deserialize_with = "de::null_as_empty")]
    pub meetings: Vec<Meeting>,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub joined_at: Option<DateTime<Utc>>,
    pub user: User,
}

/// Landing page payload: the user plus every organization they belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHome {
    #[serde(deserialize_with = "de::id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "ImagePath", default)]
    pub image_path: Option<String>,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub member: Vec<MemberOrganization>,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub owned_organizations: Vec<Organization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberOrganization {
    pub organization: Organization,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub description: String,
    pub domain_name: String,
    pub domain_restriction_flag: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinOrganizationRequest {
    pub code: String,
}

/// The joining user as the backend expects it: the profile plus the resolved role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoiningUser {
    pub id: i64,
    pub name: String,
    #[serde(rename = "ImagePath")]
    pub image_path: Option<String>,
    pub role: Role,
}

impl JoiningUser {
    pub fn new(user: &User, role: Role) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            image_path: user.image_path.clone(),
            role,
        }
    }
}

/// Idempotent join: registers attendance and mints the SDK session token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMeetingRequest {
    pub data: JoiningUser,
    pub meeting_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingUserRequest {
    pub meeting_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndMeetingRequest {
    pub meeting_id: i64,
}

/// One engagement window posted while the local camera is on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSample {
    pub meeting_id: i64,
    pub user_id: i64,
    pub attention: f64,
    pub gaze: f64,
    pub face: f64,
    #[serde(rename = "window")]
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResetCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    pub email: String,
    pub code: String,
    pub password: String,
    pub confirm_password: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMeetingResponse {
    /// Session token for the hosted video/chat service
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub host_id: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationCodeResponse {
    pub organization_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Lenient deserializers for ids, timestamps and durations
pub mod de {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(d)?;
        value_to_i64(&value).ok_or_else(|| D::Error::custom(format!("invalid id: {value}")))
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => value_to_i64(&v)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid id: {v}"))),
        }
    }

    pub fn minutes<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        match value {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .ok_or_else(|| D::Error::custom("invalid duration")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(|f| f.round() as i64)
                .map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("invalid duration: {other}"))),
        }
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(d)?;
        parse_timestamp(&value).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {value}")))
    }

    pub fn opt_timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => parse_timestamp(&v)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {v}"))),
        }
    }

    pub fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }

    fn value_to_i64(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Epoch milliseconds (number or digit string) or an RFC 3339 / naive ISO string
    pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                    return s
                        .parse::<i64>()
                        .ok()
                        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
                }
                if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                    return Some(parsed.with_timezone(&Utc));
                }
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }
            _ => None,
        }
    }
}
