//! Typed views of API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Account that triggered an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Account ID.
    pub id: u64,
    /// Login.
    pub login: String,
    /// Login as displayed on github.com.
    #[serde(default)]
    pub display_login: Option<String>,
    /// Gravatar ID.
    #[serde(default)]
    pub gravatar_id: Option<String>,
    /// API URL.
    pub url: String,
    /// Avatar URL.
    pub avatar_url: String,
}

/// Repository an event happened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRepo {
    /// Repository ID.
    pub id: u64,
    /// Full name (owner/repo).
    pub name: String,
    /// API URL.
    pub url: String,
}

/// Event kind taken from the `type` field.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    CommitComment,
    Create,
    Delete,
    Fork,
    Gollum,
    IssueComment,
    Issues,
    Member,
    Public,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Push,
    Release,
    Watch,
    /// Any kind not listed above, verbatim.
    Other(String),
}

impl EventKind {
    /// Parses a `type` value such as `PushEvent`.
    pub fn parse(value: &str) -> Self {
        match value {
            "CommitCommentEvent" => Self::CommitComment,
            "CreateEvent" => Self::Create,
            "DeleteEvent" => Self::Delete,
            "ForkEvent" => Self::Fork,
            "GollumEvent" => Self::Gollum,
            "IssueCommentEvent" => Self::IssueComment,
            "IssuesEvent" => Self::Issues,
            "MemberEvent" => Self::Member,
            "PublicEvent" => Self::Public,
            "PullRequestEvent" => Self::PullRequest,
            "PullRequestReviewEvent" => Self::PullRequestReview,
            "PullRequestReviewCommentEvent" => Self::PullRequestReviewComment,
            "PushEvent" => Self::Push,
            "ReleaseEvent" => Self::Release,
            "WatchEvent" => Self::Watch,
            other => Self::Other(other.to_string()),
        }
    }
}

/// An entry of an events list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID.
    pub id: String,
    /// Raw `type` field.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Triggering account.
    pub actor: Actor,
    /// Repository.
    pub repo: EventRepo,
    /// Organization, for organization-owned repositories.
    #[serde(default)]
    pub org: Option<Actor>,
    /// Kind-specific payload.
    #[serde(default)]
    pub payload: Value,
    /// Whether the event is public.
    #[serde(default)]
    pub public: bool,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Parsed event kind.
    pub fn kind(&self) -> EventKind {
        EventKind::parse(self.event_type.as_deref().unwrap_or_default())
    }
}
