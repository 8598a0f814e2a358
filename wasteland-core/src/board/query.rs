//! Filter -> SQL translation (§4.5).

use crate::backend::sql::sql_literal;
use crate::board::DEFAULT_BROWSE_LIMIT;
use crate::model::{WantedStatus, WantedType};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sort {
    #[default]
    PriorityThenNew,
    Newest,
    Alpha,
}

impl Sort {
    fn clause(&self) -> &'static str {
        match self {
            Sort::PriorityThenNew => "priority ASC, created_at DESC",
            Sort::Newest => "created_at DESC",
            Sort::Alpha => "title ASC",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BrowseFilter {
    pub status: Option<WantedStatus>,
    pub project: Option<String>,
    pub item_type: Option<WantedType>,
    /// `-1` (or unset) means "all".
    pub priority: Option<i32>,
    pub search: Option<String>,
    /// Wins silently over `posted_by`/`claimed_by` when set (§4.5, §9).
    pub my_items: Option<String>,
    pub posted_by: Option<String>,
    pub claimed_by: Option<String>,
    pub sort: Sort,
    pub limit: Option<u32>,
}

/// `SELECT … FROM wanted WHERE <ANDed conditions> ORDER BY <sort> LIMIT n`.
pub fn build_browse_query(f: &BrowseFilter) -> String {
    let mut conditions = Vec::new();

    if let Some(status) = f.status {
        conditions.push(format!("status = {}", sql_literal(status.as_str())));
    }
    if let Some(project) = &f.project {
        conditions.push(format!("project = {}", sql_literal(project)));
    }
    if let Some(kind) = f.item_type {
        conditions.push(format!("type = {}", sql_literal(kind.as_str())));
    }
    if let Some(priority) = f.priority {
        if priority >= 0 {
            conditions.push(format!("priority = {priority}"));
        }
    }
    if let Some(search) = &f.search {
        conditions.push(format!("title LIKE {}", sql_literal(&format!("%{search}%"))));
    }

    if let Some(rig) = &f.my_items {
        let literal = sql_literal(rig);
        conditions.push(format!("(posted_by = {literal} OR claimed_by = {literal})"));
    } else {
        if let Some(rig) = &f.posted_by {
            conditions.push(format!("posted_by = {}", sql_literal(rig)));
        }
        if let Some(rig) = &f.claimed_by {
            conditions.push(format!("claimed_by = {}", sql_literal(rig)));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let limit = f.limit.unwrap_or(DEFAULT_BROWSE_LIMIT);

    format!(
        "SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted{where_clause} ORDER BY {} LIMIT {limit}",
        f.sort.clause()
    )
}

/// Full detail projection with `COALESCE(..,'')` for nullable columns.
pub fn build_wanted_detail_query(id: &str) -> (String, String, String) {
    let literal = sql_literal(id);
    let item_sql = format!(
        "SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted WHERE id = {literal}"
    );
    let completion_sql = format!(
        "SELECT id, wanted_id, completed_by, evidence, COALESCE(hop_uri,'') AS hop_uri, COALESCE(validated_by,'') AS validated_by, COALESCE(stamp_id,'') AS stamp_id, completed_at, COALESCE(validated_at,'') AS validated_at FROM completions WHERE wanted_id = {literal}"
    );
    let stamp_sql = format!(
        "SELECT s.id AS id, s.author AS author, s.subject AS subject, s.valence AS valence, s.severity AS severity, s.context_id AS context_id, s.context_type AS context_type, s.skill_tags AS skill_tags, COALESCE(s.message,'') AS message, COALESCE(s.hop_uri,'') AS hop_uri, s.created_at AS created_at FROM stamps s JOIN completions c ON c.stamp_id = s.id WHERE c.wanted_id = {literal}"
    );
    (item_sql, completion_sql, stamp_sql)
}

/// Three bounded queries behind `QueryMyDashboard` (§3, §4.5).
pub fn build_dashboard_queries(rig: &str) -> (String, String, String) {
    let literal = sql_literal(rig);
    let claimed = format!(
        "SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted WHERE status = 'claimed' AND claimed_by = {literal} ORDER BY priority ASC, created_at DESC"
    );
    let awaiting_review = format!(
        "SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted WHERE status = 'in_review' AND (posted_by = {literal} OR claimed_by = {literal}) ORDER BY priority ASC, created_at DESC"
    );
    let recent_completions = format!(
        "SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted WHERE status = 'completed' AND claimed_by = {literal} ORDER BY updated_at DESC LIMIT 5"
    );
    (claimed, awaiting_review, recent_completions)
}
