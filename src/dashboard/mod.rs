//! Organization dashboard and home overview derived from backend records

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::api::types::{Meeting, Member, Organization, User, UserHome};

/// Upcoming meetings shown on an organization dashboard
pub const UPCOMING_LIMIT: usize = 4;

/// Home page window: meetings that started within this many hours still show
pub const HOME_LOOKBACK_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingStatus {
    Upcoming,
    InProgress,
    Completed,
}

impl MeetingStatus {
    /// Running from start through scheduled end, both inclusive
    pub fn of(meeting: &Meeting, now: DateTime<Utc>) -> Self {
        if now > meeting.scheduled_end() {
            MeetingStatus::Completed
        } else if now < meeting.start_time {
            MeetingStatus::Upcoming
        } else {
            MeetingStatus::InProgress
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MeetingStatus::Upcoming => "upcoming",
            MeetingStatus::InProgress => "in-progress",
            MeetingStatus::Completed => "completed",
        }
    }
}

/// Whole minutes left before the scheduled end, rounded up; 0 once over
pub fn remaining_minutes(meeting: &Meeting, now: DateTime<Utc>) -> i64 {
    let left_ms = (meeting.scheduled_end() - now).num_milliseconds();
    if left_ms <= 0 {
        0
    } else {
        (left_ms + 59_999) / 60_000
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeetingPartition {
    pub running: Vec<Meeting>,
    /// Sorted by start time
    pub upcoming: Vec<Meeting>,
}

/// Splits meetings into running and upcoming; completed ones are dropped
pub fn partition_meetings<'a, I>(meetings: I, now: DateTime<Utc>) -> MeetingPartition
where
    I: IntoIterator<Item = &'a Meeting>,
{
    let mut partition = MeetingPartition::default();
    for meeting in meetings {
        match MeetingStatus::of(meeting, now) {
            MeetingStatus::InProgress => partition.running.push(meeting.clone()),
            MeetingStatus::Upcoming => partition.upcoming.push(meeting.clone()),
            MeetingStatus::Completed => {}
        }
    }
    partition.upcoming.sort_by_key(|m| m.start_time);
    partition
}

/// Colour band of a stored engagement figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngagementBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl EngagementBand {
    pub fn of(engagement: f64) -> Self {
        if engagement >= 90.0 {
            EngagementBand::Excellent
        } else if engagement >= 75.0 {
            EngagementBand::Good
        } else if engagement >= 60.0 {
            EngagementBand::Fair
        } else {
            EngagementBand::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingRow {
    pub id: i64,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: MeetingStatus,
    /// Only for meetings that have started
    pub engagement: Option<(f64, EngagementBand)>,
}

impl MeetingRow {
    fn new(meeting: &Meeting, now: DateTime<Utc>) -> Self {
        let status = MeetingStatus::of(meeting, now);
        let engagement = match status {
            MeetingStatus::Upcoming => None,
            _ => meeting.engagement.map(|e| (e, EngagementBand::of(e))),
        };
        Self {
            id: meeting.id,
            name: meeting.name.clone(),
            start_time: meeting.start_time,
            duration_minutes: meeting.meeting_duration,
            status,
            engagement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationDashboard {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    pub owner: Option<User>,
    pub owner_id: Option<i64>,
    pub members: Vec<Member>,
    pub running: Vec<Meeting>,
    /// Next meetings by start time, at most [`UPCOMING_LIMIT`]
    pub upcoming: Vec<Meeting>,
    pub meetings: Vec<MeetingRow>,
}

impl OrganizationDashboard {
    pub fn build(org: &Organization, now: DateTime<Utc>) -> Self {
        let MeetingPartition { running, mut upcoming } = partition_meetings(&org.meetings, now);
        upcoming.truncate(UPCOMING_LIMIT);

        Self {
            id: org.id,
            name: org.name.clone(),
            description: org.description.clone(),
            code: org.organization_code.clone(),
            owner: org.owner.clone(),
            owner_id: org.owner_id.or_else(|| org.owner.as_ref().map(|o| o.id)),
            members: org.members.clone(),
            running,
            upcoming,
            meetings: org.meetings.iter().map(|m| MeetingRow::new(m, now)).collect(),
        }
    }

    /// Owners see admin actions such as code rotation
    pub fn is_owner(&self, user_id: i64) -> bool {
        self.owner_id == Some(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationSummary {
    pub id: i64,
    pub name: String,
    pub total_participants: Option<i64>,
    pub owned: bool,
}

impl OrganizationSummary {
    fn new(org: &Organization, owned: bool) -> Self {
        Self {
            id: org.id,
            name: org.name.clone(),
            total_participants: org.total_participants,
            owned,
        }
    }
}

/// Landing page: every organization plus their running and upcoming meetings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeOverview {
    pub user_id: i64,
    pub name: String,
    pub organizations: Vec<OrganizationSummary>,
    pub running: Vec<Meeting>,
    pub upcoming: Vec<Meeting>,
}

impl HomeOverview {
    pub fn build(home: &UserHome, now: DateTime<Utc>) -> Self {
        let member_orgs = home.member.iter().map(|m| &m.organization);
        let owned_orgs = home.owned_organizations.iter();

        let organizations = member_orgs
            .clone()
            .map(|org| OrganizationSummary::new(org, false))
            .chain(owned_orgs.clone().map(|org| OrganizationSummary::new(org, true)))
            .collect();

        let meetings = member_orgs
            .chain(owned_orgs)
            .flat_map(|org| org.meetings.iter());
        let MeetingPartition { running, upcoming } = partition_meetings(meetings, now);

        Self {
            user_id: home.id,
            name: home.name.clone(),
            organizations,
            running,
            upcoming,
        }
    }
}

/// Start of the meeting query window used by the home page
pub fn home_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(HOME_LOOKBACK_HOURS)
}

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Human label for a meeting start, relative to `now` in `now`'s time zone
///
/// "Today at HH:MM", "Tomorrow at HH:MM", the weekday name for any other day
/// of the current Sunday-to-Saturday week, else `DD/MM/YYYY HH:MM`.
pub fn format_meeting_time<Tz>(at: DateTime<Utc>, now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let at = at.with_timezone(&now.timezone());
    let time = at.format("%H:%M");
    let day = at.date_naive();
    let today = now.date_naive();

    if day == today {
        return format!("Today at {}", time);
    }
    if today.succ_opt() == Some(day) {
        return format!("Tomorrow at {}", time);
    }

    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    let week_end = week_start + Duration::days(6);
    if day >= week_start && day <= week_end {
        let name = DAY_NAMES[at.weekday().num_days_from_sunday() as usize];
        return format!("{} at {}", name, time);
    }

    at.format("%d/%m/%Y %H:%M").to_string()
}

/// Absolute URL of an uploaded image; Windows separators are normalised
pub fn image_url(base: &str, path: &str) -> String {
    let path = path.replace('\\', "/");
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
