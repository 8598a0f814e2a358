//! Lifecycle engine (C4, §4.4) — pure transition table, permission rules,
//! and delta computation. No I/O: every function here takes the data it
//! needs and returns a value or a `WastelandError`.

use crate::error::WastelandError;
use crate::model::{WantedItem, WantedStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Claim,
    Unclaim,
    Done,
    Accept,
    Reject,
    Close,
    Delete,
    Update,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Claim => "claim",
            Transition::Unclaim => "unclaim",
            Transition::Done => "done",
            Transition::Accept => "accept",
            Transition::Reject => "reject",
            Transition::Close => "close",
            Transition::Delete => "delete",
            Transition::Update => "update",
        }
    }

    pub fn from_to(&self) -> (WantedStatus, WantedStatus) {
        use WantedStatus::*;
        match self {
            Transition::Claim => (Open, Claimed),
            Transition::Unclaim => (Claimed, Open),
            Transition::Done => (Claimed, InReview),
            Transition::Accept => (InReview, Completed),
            Transition::Reject => (InReview, Claimed),
            Transition::Close => (InReview, Completed),
            Transition::Delete => (Open, Withdrawn),
            Transition::Update => (Open, Open),
        }
    }

    pub const ALL: [Transition; 8] = [
        Transition::Claim,
        Transition::Unclaim,
        Transition::Done,
        Transition::Accept,
        Transition::Reject,
        Transition::Close,
        Transition::Delete,
        Transition::Update,
    ];
}

/// Returns the target status for `t` applied to `current`, or an error if
/// `current` does not match `t`'s required starting status.
pub fn validate_transition(current: WantedStatus, t: Transition) -> Result<WantedStatus, WastelandError> {
    let (from, to) = t.from_to();
    if current == from {
        Ok(to)
    } else {
        Err(WastelandError::precondition(format!(
            "cannot {}: item is {}, not {}",
            t.name(),
            current,
            from
        )))
    }
}

/// Permission rules (§4.4's "Permitted actor" column).
pub fn can_perform_transition(item: &WantedItem, t: Transition, actor: &str) -> bool {
    if validate_transition(item.status, t).is_err() {
        return false;
    }
    match t {
        Transition::Claim => true,
        Transition::Unclaim => actor == item.claimed_by || actor == item.posted_by,
        Transition::Done => actor == item.claimed_by,
        Transition::Accept => actor == item.posted_by && actor != item.claimed_by,
        Transition::Reject => actor == item.posted_by,
        Transition::Close => actor == item.posted_by,
        Transition::Delete => actor == item.posted_by,
        Transition::Update => actor == item.posted_by,
    }
}

/// Intersects validity and permission for every transition.
pub fn available_transitions(item: &WantedItem, actor: &str) -> Vec<Transition> {
    Transition::ALL
        .into_iter()
        .filter(|t| can_perform_transition(item, *t, actor))
        .collect()
}

/// Human-readable delta label for a `(mainStatus, branchStatus)` pair
/// (§4.4). `branch_exists` distinguishes "new" (branch has a row, main does
/// not) from "changes" (neither status nor main-existence explains the gap).
pub fn delta_label(main_status: Option<WantedStatus>, branch_status: WantedStatus, branch_exists: bool) -> String {
    match main_status {
        None if branch_exists => "new".to_string(),
        Some(main) if main == branch_status => "update".to_string(),
        Some(main) => Transition::ALL
            .iter()
            .find(|t| t.from_to() == (main, branch_status))
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| "changes".to_string()),
        None => "changes".to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowMode {
    WildWest,
    Pr,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PushTarget {
    pub push_origin: bool,
    pub push_upstream: bool,
    pub hint_create_pr: bool,
}

/// Push-target resolution (§4.4). Wild-west always pushes both remotes; PR
/// mode never pushes upstream and skips origin when the fork is already
/// current, hinting at a manual PR if upstream still differs.
pub fn resolve_push_target(mode: WorkflowMode, loc: &crate::model::ItemLocation) -> PushTarget {
    match mode {
        WorkflowMode::WildWest => PushTarget {
            push_origin: true,
            push_upstream: true,
            hint_create_pr: false,
        },
        WorkflowMode::Pr => {
            if loc.local_status == loc.origin_status {
                PushTarget {
                    push_origin: false,
                    push_upstream: false,
                    hint_create_pr: loc.local_status != loc.upstream_status,
                }
            } else {
                PushTarget {
                    push_origin: true,
                    push_upstream: false,
                    hint_create_pr: false,
                }
            }
        }
    }
}
