//! Core entities: WantedItem, CompletionRecord, Stamp, Branch, ItemLocation,
//! DashboardData, LeaderboardEntry.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WantedStatus {
    Open,
    Claimed,
    InReview,
    Completed,
    Withdrawn,
}

impl WantedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WantedStatus::Open => "open",
            WantedStatus::Claimed => "claimed",
            WantedStatus::InReview => "in_review",
            WantedStatus::Completed => "completed",
            WantedStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(WantedStatus::Open),
            "claimed" => Some(WantedStatus::Claimed),
            "in_review" => Some(WantedStatus::InReview),
            "completed" => Some(WantedStatus::Completed),
            "withdrawn" => Some(WantedStatus::Withdrawn),
            _ => None,
        }
    }

    /// Terminal statuses have no outgoing lifecycle transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WantedStatus::Completed | WantedStatus::Withdrawn)
    }
}

impl std::fmt::Display for WantedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WantedType {
    Feature,
    Bug,
    Design,
    Rfc,
    Docs,
    Inference,
}

impl WantedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WantedType::Feature => "feature",
            WantedType::Bug => "bug",
            WantedType::Design => "design",
            WantedType::Rfc => "rfc",
            WantedType::Docs => "docs",
            WantedType::Inference => "inference",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "feature" => Some(WantedType::Feature),
            "bug" => Some(WantedType::Bug),
            "design" => Some(WantedType::Design),
            "rfc" => Some(WantedType::Rfc),
            "docs" => Some(WantedType::Docs),
            "inference" => Some(WantedType::Inference),
            _ => None,
        }
    }
}

impl std::fmt::Display for WantedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Leaf,
    Branch,
    Root,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Leaf => "leaf",
            Severity::Branch => "branch",
            Severity::Root => "root",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "leaf" => Some(Severity::Leaf),
            "branch" => Some(Severity::Branch),
            "root" => Some(Severity::Root),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WantedItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub project: String,
    #[serde(rename = "type")]
    pub kind: WantedType,
    pub priority: i32,
    pub tags: Vec<String>,
    pub posted_by: String,
    pub claimed_by: String,
    pub status: WantedStatus,
    pub effort_level: String,
    pub sandbox_required: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl WantedItem {
    pub fn has_ever_been_claimed(&self) -> bool {
        !self.claimed_by.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: String,
    pub wanted_id: String,
    pub completed_by: String,
    pub evidence: String,
    pub hop_uri: Option<String>,
    pub validated_by: Option<String>,
    pub stamp_id: Option<String>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub validated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valence {
    pub quality: u8,
    pub reliability: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    pub id: String,
    pub author: String,
    pub subject: String,
    pub valence: Valence,
    pub severity: Severity,
    pub context_id: String,
    pub context_type: String,
    pub skill_tags: Vec<String>,
    pub message: Option<String>,
    pub hop_uri: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Per-item mutation branch, `wl/{rigHandle}/{wantedID}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub rig_handle: String,
    pub wanted_id: String,
}

impl Branch {
    pub fn name(&self) -> String {
        format!("wl/{}/{}", self.rig_handle, self.wanted_id)
    }

    /// Parses `wl/{rigHandle}/{wantedID}`; returns `None` for anything else.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("wl/")?;
        let (rig_handle, wanted_id) = rest.split_once('/')?;
        if rig_handle.is_empty() || wanted_id.is_empty() || wanted_id.contains('/') {
            return None;
        }
        Some(Branch {
            rig_handle: rig_handle.to_string(),
            wanted_id: wanted_id.to_string(),
        })
    }
}

/// Ephemeral snapshot used for push-target decisions (§4.4).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemLocation {
    pub local_status: String,
    pub origin_status: String,
    pub upstream_status: String,
    pub fetched_origin: bool,
    pub fetched_upstream: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DashboardData {
    pub claimed_by_me: Vec<WantedItem>,
    pub awaiting_my_review: Vec<WantedItem>,
    pub my_recent_completions: Vec<WantedItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rig: String,
    pub validated_completions: u64,
    pub avg_quality: f64,
    pub avg_reliability: f64,
    pub top_skills: Vec<String>,
}

/// Full detail view for a single item (§4.7 `Detail`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WantedDetail {
    pub item: Option<WantedItem>,
    pub completion: Option<CompletionRecord>,
    pub stamp: Option<Stamp>,
    pub branch: String,
    pub main_status: String,
    pub pr_url: Option<String>,
    pub branch_actions: Vec<String>,
    pub delta: Option<String>,
}
