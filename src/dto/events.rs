//! Wire contract for broadcast events.
//!
//! Every frame is `{ "type": ..., "payload": ..., "timestamp": ... }` with
//! an RFC 3339 timestamp. The payload is a tagged union keyed by `type` so
//! new event kinds are caught at compile time on the server side, while
//! clients ignore tags they do not know.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{RetryStatus, SubmissionStatus},
    dto::format_system_time,
    state::clock::ContestStatus,
};

/// Event kinds carried on the wire, tagged with their payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    /// First frame pushed to a freshly registered connection.
    #[serde(rename = "CONNECTION_ESTABLISHED")]
    ConnectionEstablished(ConnectionEstablished),
    /// Partial update of the contest lifecycle fields.
    #[serde(rename = "CONTEST_STATUS_UPDATE")]
    ContestStatusUpdate(ContestStatusUpdate),
    /// Refreshed public standings.
    #[serde(rename = "LEADERBOARD_UPDATE")]
    LeaderboardUpdate(LeaderboardUpdate),
    /// Periodic remaining-time tick.
    #[serde(rename = "TIME_UPDATE")]
    TimeUpdate(TimeUpdate),
    /// A team was blocked or unblocked.
    #[serde(rename = "TEAM_STATUS_UPDATE")]
    TeamStatusUpdate(TeamStatusUpdate),
    /// A submission entered the queue.
    #[serde(rename = "NEW_SUBMISSION")]
    NewSubmission(SubmissionNotice),
    /// A submission's verdict or retry state changed.
    #[serde(rename = "SUBMISSION_UPDATE")]
    SubmissionUpdate(SubmissionNotice),
    /// Jury queue depth changed.
    #[serde(rename = "JURY_QUEUE_UPDATE")]
    JuryQueueUpdate(JuryQueueUpdate),
    /// A team filed a retry request.
    #[serde(rename = "RETRY_REQUESTED")]
    RetryRequested(SubmissionNotice),
    /// The jury granted a retry request.
    #[serde(rename = "RETRY_GRANTED")]
    RetryGranted(SubmissionNotice),
}

impl EventKind {
    /// Wire tag for this event.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished(_) => "CONNECTION_ESTABLISHED",
            Self::ContestStatusUpdate(_) => "CONTEST_STATUS_UPDATE",
            Self::LeaderboardUpdate(_) => "LEADERBOARD_UPDATE",
            Self::TimeUpdate(_) => "TIME_UPDATE",
            Self::TeamStatusUpdate(_) => "TEAM_STATUS_UPDATE",
            Self::NewSubmission(_) => "NEW_SUBMISSION",
            Self::SubmissionUpdate(_) => "SUBMISSION_UPDATE",
            Self::JuryQueueUpdate(_) => "JURY_QUEUE_UPDATE",
            Self::RetryRequested(_) => "RETRY_REQUESTED",
            Self::RetryGranted(_) => "RETRY_GRANTED",
        }
    }

    /// Contest-status payload when this event should refresh the
    /// late-joiner cache; informational events return `None`.
    pub fn status_update(&self) -> Option<&ContestStatusUpdate> {
        match self {
            Self::ContestStatusUpdate(update) => Some(update),
            _ => None,
        }
    }
}

/// Complete wire frame: tagged payload plus emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct WireEvent {
    /// Tagged event payload, flattened into `type` + `payload` fields.
    #[serde(flatten)]
    pub kind: EventKind,
    /// RFC 3339 instant the event was emitted.
    pub timestamp: String,
}

impl WireEvent {
    /// Wrap an event kind with the current wall-clock timestamp.
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: format_system_time(std::time::SystemTime::now()),
            kind,
        }
    }
}

const KNOWN_TAGS: &[&str] = &[
    "CONNECTION_ESTABLISHED",
    "CONTEST_STATUS_UPDATE",
    "LEADERBOARD_UPDATE",
    "TIME_UPDATE",
    "TEAM_STATUS_UPDATE",
    "NEW_SUBMISSION",
    "SUBMISSION_UPDATE",
    "JURY_QUEUE_UPDATE",
    "RETRY_REQUESTED",
    "RETRY_GRANTED",
];

/// Parse a frame, returning `Ok(None)` for event types this build does not
/// know. Unknown types are forward compatibility, not errors.
pub fn parse_known(text: &str) -> serde_json::Result<Option<WireEvent>> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let recognised = value
        .get("type")
        .and_then(|tag| tag.as_str())
        .is_some_and(|tag| KNOWN_TAGS.contains(&tag));
    if !recognised {
        return Ok(None);
    }

    serde_json::from_value(value).map(Some)
}

/// Payload of `CONNECTION_ESTABLISHED`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ConnectionEstablished {
    /// Identifier assigned to the connection by the broadcast engine.
    pub connection_id: Uuid,
}

/// Payload of `CONTEST_STATUS_UPDATE`. All fields optional: events carry
/// only what changed, and the engine's cache merges them shallowly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ContestStatusUpdate {
    /// Contest the update applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<Uuid>,
    /// Derived status at emission time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContestStatus>,
    /// Pause flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    /// Instant the current pause began (RFC 3339), `null` once cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<Option<String>>,
    /// Contest start (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Contest end (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Leaderboard freeze flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_frozen: Option<bool>,
}

impl ContestStatusUpdate {
    /// Overwrite the fields of `self` that `incoming` carries; latest wins.
    pub fn merge_from(&mut self, incoming: &ContestStatusUpdate) {
        if incoming.contest_id.is_some() {
            self.contest_id = incoming.contest_id;
        }
        if incoming.status.is_some() {
            self.status = incoming.status;
        }
        if incoming.is_paused.is_some() {
            self.is_paused = incoming.is_paused;
        }
        if incoming.paused_at.is_some() {
            self.paused_at = incoming.paused_at.clone();
        }
        if incoming.start_time.is_some() {
            self.start_time = incoming.start_time.clone();
        }
        if incoming.end_time.is_some() {
            self.end_time = incoming.end_time.clone();
        }
        if incoming.is_frozen.is_some() {
            self.is_frozen = incoming.is_frozen;
        }
    }
}

/// Single row of the public leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LeaderboardRow {
    /// Team the row belongs to.
    pub team_id: Uuid,
    /// Display name of the team.
    pub team_name: String,
    /// Count of accepted submissions.
    pub solved: u32,
}

/// Payload of `LEADERBOARD_UPDATE`. Row order is the ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LeaderboardUpdate {
    /// Contest the standings belong to.
    pub contest_id: Uuid,
    /// Ranked standings, best first.
    pub standings: Vec<LeaderboardRow>,
}

/// Payload of `TIME_UPDATE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TimeUpdate {
    /// Contest the tick applies to.
    pub contest_id: Uuid,
    /// Milliseconds of contest time left.
    pub remaining_ms: u64,
}

/// Payload of `TEAM_STATUS_UPDATE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TeamStatusUpdate {
    /// Team whose status changed.
    pub team_id: Uuid,
    /// New kill-switch state.
    pub is_blocked: bool,
}

/// Payload shared by submission lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SubmissionNotice {
    /// Submission the event refers to.
    pub submission_id: Uuid,
    /// Owning team.
    pub team_id: Uuid,
    /// Target problem.
    pub problem_id: String,
    /// Verdict after the change.
    pub status: SubmissionStatus,
    /// Retry eligibility after the change.
    pub can_retry: bool,
    /// Retry resolution state, when a request exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_status: Option<RetryStatus>,
}

/// Payload of `JURY_QUEUE_UPDATE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct JuryQueueUpdate {
    /// Number of submissions awaiting a verdict.
    pub pending_count: u64,
}
