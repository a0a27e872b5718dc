//! Post-meeting report derived from the meeting's participant rows
//!
//! Everything here is a pure reduction over backend data. The engagement
//! timeline is interpolated around the session average; it is a display
//! approximation and not per-interval telemetry.

use std::f64::consts::PI;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::api::types::{Meeting, MeetingParticipant};

/// Joining up to this late still counts as on time
pub const GRACE_MINUTES: i64 = 5;

pub const TIMELINE_INTERVALS: u32 = 8;

const TIMELINE_SWING: f64 = 10.0;
const TIMELINE_FLOOR: f64 = 60.0;
const TIMELINE_CEIL: f64 = 100.0;

const ACTIVE_ATTENTION: f64 = 80.0;

fn percent(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Mean of attention, gaze and face when all are reported, else attention
pub fn composite_score(p: &MeetingParticipant) -> f64 {
    match (p.avg_gaze, p.avg_face) {
        (Some(gaze), Some(face)) => (p.avg_attention + gaze + face) / 3.0,
        _ => p.avg_attention,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngagementTier {
    High,
    Moderate,
    Low,
}

impl EngagementTier {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            EngagementTier::High
        } else if score >= 70 {
            EngagementTier::Moderate
        } else {
            EngagementTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EngagementTier::High => "high",
            EngagementTier::Moderate => "moderate",
            EngagementTier::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngagementSummary {
    pub average: u32,
    pub peak: u32,
    pub lowest: u32,
}

impl EngagementSummary {
    /// Average, peak and lowest composite score; zeros for an empty meeting
    pub fn from_participants(participants: &[MeetingParticipant]) -> Self {
        if participants.is_empty() {
            return Self::default();
        }

        let scores: Vec<f64> = participants.iter().map(composite_score).collect();
        let sum: f64 = scores.iter().sum();
        let peak = scores.iter().copied().fold(f64::MIN, f64::max);
        let lowest = scores.iter().copied().fold(f64::MAX, f64::min);

        Self {
            average: percent(sum / scores.len() as f64),
            peak: percent(peak),
            lowest: percent(lowest),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub on_time: usize,
    pub late: usize,
    pub early_leave: usize,
    /// On-time share of all participants, percent
    pub rate: u32,
}

impl AttendanceSummary {
    /// Buckets join and leave times against the schedule
    ///
    /// Participants without a join time are neither on time nor late; without
    /// a leave time they are never early leavers.
    pub fn from_meeting(meeting: &Meeting) -> Self {
        let grace = Duration::minutes(GRACE_MINUTES);
        let start = meeting.start_time;
        let end = meeting.scheduled_end();

        let mut summary = Self::default();
        for p in &meeting.participants {
            if let Some(joined) = p.first_join_time {
                if joined - start <= grace {
                    summary.on_time += 1;
                } else {
                    summary.late += 1;
                }
            }
            if let Some(left) = p.last_leave_time {
                if end - left > grace {
                    summary.early_leave += 1;
                }
            }
        }

        let total = meeting.participants.len();
        if total > 0 {
            summary.rate = percent(summary.on_time as f64 / total as f64 * 100.0);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub at: DateTime<Utc>,
    /// `HH:MM`
    pub label: String,
    pub engagement: u32,
    pub participants: usize,
}

/// `intervals + 1` evenly spaced points swinging around `average`
///
/// Each value is `average + sin(i / intervals * pi) * 10`, clamped to 60..=100.
pub fn engagement_timeline(meeting: &Meeting, average: u32, intervals: u32) -> Vec<TimelinePoint> {
    let intervals = intervals.max(1);
    let step_ms = meeting.meeting_duration.saturating_mul(60_000) / i64::from(intervals);
    let end = meeting.scheduled_end();

    (0..=intervals)
        .map(|i| {
            let at = Duration::try_milliseconds(step_ms.saturating_mul(i64::from(i)))
                .and_then(|offset| meeting.start_time.checked_add_signed(offset))
                .unwrap_or(end);
            let swing = (f64::from(i) / f64::from(intervals) * PI).sin() * TIMELINE_SWING;
            let engagement = (f64::from(average) + swing).round().clamp(TIMELINE_FLOOR, TIMELINE_CEIL);

            TimelinePoint {
                at,
                label: at.format("%H:%M").to_string(),
                engagement: engagement as u32,
                participants: meeting.participants.len(),
            }
        })
        .collect()
}

/// `Hh Mm` from one hour up, else `Mm`
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// First letter of each word, at most two, uppercased
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantRow {
    pub user_id: i64,
    pub name: String,
    pub initials: String,
    pub attention: u32,
    pub gaze: Option<u32>,
    pub face: Option<u32>,
    pub composite: u32,
    pub tier: EngagementTier,
    pub active: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
}

impl From<&MeetingParticipant> for ParticipantRow {
    fn from(p: &MeetingParticipant) -> Self {
        let name = p
            .user
            .as_ref()
            .map(|u| u.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("User {}", p.user_id));
        let composite = percent(composite_score(p));

        Self {
            user_id: p.user_id,
            initials: initials(&name),
            name,
            attention: percent(p.avg_attention),
            gaze: p.avg_gaze.map(percent),
            face: p.avg_face.map(percent),
            composite,
            tier: EngagementTier::from_score(composite),
            active: format_duration(p.total_active_seconds.max(0.0) as u64),
            joined_at: p.first_join_time,
            left_at: p.last_leave_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetailedMetrics {
    /// Attention-weighted active time, hours
    pub focus_hours: u32,
    /// Mean score where anyone at 70+ counts as 100
    pub consistency: u32,
    /// Share of participants with attention at 80+, percent
    pub active_participation: u32,
    pub session_quality: u32,
}

impl DetailedMetrics {
    pub fn compute(
        participants: &[MeetingParticipant],
        engagement: &EngagementSummary,
        attendance: &AttendanceSummary,
    ) -> Self {
        let session_quality = percent(
            (f64::from(engagement.average) + f64::from(attendance.rate) + 100.0
                - f64::from(engagement.lowest))
                / 3.0,
        );
        if participants.is_empty() {
            return Self {
                session_quality,
                ..Self::default()
            };
        }

        let n = participants.len() as f64;
        let focused_seconds: f64 = participants
            .iter()
            .map(|p| p.total_active_seconds * p.avg_attention / 100.0)
            .sum();
        let consistency: f64 = participants
            .iter()
            .map(|p| {
                let score = percent(composite_score(p));
                if score >= 70 {
                    100.0
                } else {
                    f64::from(score)
                }
            })
            .sum();
        let active = participants
            .iter()
            .filter(|p| p.avg_attention >= ACTIVE_ATTENTION)
            .count() as f64;

        Self {
            focus_hours: percent(focused_seconds / 3600.0),
            consistency: percent(consistency / n),
            active_participation: percent(active / n * 100.0),
            session_quality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingReport {
    pub meeting_id: i64,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub duration: String,
    pub participant_count: usize,
    pub engagement: EngagementSummary,
    pub attendance: AttendanceSummary,
    pub timeline: Vec<TimelinePoint>,
    pub participants: Vec<ParticipantRow>,
    pub metrics: DetailedMetrics,
    pub high_engagement: usize,
    pub needs_follow_up: usize,
}

impl MeetingReport {
    pub fn build(meeting: &Meeting) -> Self {
        let engagement = EngagementSummary::from_participants(&meeting.participants);
        let attendance = AttendanceSummary::from_meeting(meeting);
        let participants: Vec<ParticipantRow> =
            meeting.participants.iter().map(ParticipantRow::from).collect();
        let count_tier = |tier: EngagementTier| participants.iter().filter(|row| row.tier == tier).count();
        let minutes = meeting.meeting_duration.max(0) as u64;

        Self {
            meeting_id: meeting.id,
            name: meeting.name.clone(),
            started_at: meeting.start_time,
            scheduled_end: meeting.scheduled_end(),
            duration: format!("{}h {}m", minutes / 60, minutes % 60),
            participant_count: meeting.participants.len(),
            timeline: engagement_timeline(meeting, engagement.average, TIMELINE_INTERVALS),
            metrics: DetailedMetrics::compute(&meeting.participants, &engagement, &attendance),
            high_engagement: count_tier(EngagementTier::High),
            needs_follow_up: count_tier(EngagementTier::Low),
            engagement,
            attendance,
            participants,
        }
    }
}
