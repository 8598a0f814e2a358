//! Branch overlay (C6, §4.6) — detects per-item mutation branches via AS-OF
//! queries and overlays their status onto browse results, without ever
//! issuing a per-row branch query (§9).

use std::collections::HashMap;

use crate::backend::csv;
use crate::backend::sql;
use crate::backend::DB;
use crate::board::query::BrowseFilter;
use crate::error::WastelandError;
use crate::lifecycle::delta_label;
use crate::model::{Branch, WantedItem, WantedStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchOverride {
    pub wanted_id: String,
    pub branch: String,
    pub status: WantedStatus,
    pub claimed_by: Option<String>,
}

/// Enumerates `wl/{rig}/…` branches (or every `wl/*` branch when `rig` is
/// `None`) and records one override per branch whose status differs from
/// main.
pub async fn collect_branch_overrides(
    db: &dyn DB,
    rig: Option<&str>,
) -> Result<Vec<BranchOverride>, WastelandError> {
    let prefix = match rig {
        Some(rig) => format!("wl/{rig}/"),
        None => "wl/".to_string(),
    };
    let branch_names = db.branches(&prefix).await?;

    let mut overrides = Vec::new();
    for name in branch_names {
        let Some(parsed) = Branch::parse(&name) else { continue };
        let sql = format!(
            "SELECT status, claimed_by FROM wanted WHERE id = '{}'",
            sql::escape_sql(&parsed.wanted_id)
        );
        let branch_csv = db.query(&sql, &name).await?;
        let rows = csv::parse_rows_as_maps(&branch_csv);
        let Some(branch_row) = rows.first() else { continue };
        let Some(branch_status) = branch_row.get("status").and_then(|s| WantedStatus::parse(s)) else {
            continue;
        };

        let main_csv = db.query(&sql, "").await?;
        let main_status = csv::parse_rows_as_maps(&main_csv)
            .first()
            .and_then(|r| r.get("status").cloned())
            .and_then(|s| WantedStatus::parse(&s));

        if main_status != Some(branch_status) {
            overrides.push(BranchOverride {
                wanted_id: parsed.wanted_id,
                branch: name,
                status: branch_status,
                claimed_by: branch_row.get("claimed_by").cloned(),
            });
        }
    }
    Ok(overrides)
}

/// Applies `overrides` to `items`, matching §4.6's three steps: patch
/// statuses in place, drop items the filter no longer matches, and fetch
/// metadata for items the filter now matches that weren't in the result.
pub async fn apply_branch_overrides(
    db: &dyn DB,
    items: Vec<WantedItem>,
    overrides: &[BranchOverride],
    filter: &BrowseFilter,
) -> Result<Vec<WantedItem>, WastelandError> {
    let by_id: HashMap<&str, &BranchOverride> =
        overrides.iter().map(|o| (o.wanted_id.as_str(), o)).collect();
    let mut present: std::collections::HashSet<String> = items.iter().map(|i| i.id.clone()).collect();

    let mut patched = Vec::with_capacity(items.len());
    for mut item in items {
        if let Some(ov) = by_id.get(item.id.as_str()) {
            item.status = ov.status;
            if let Some(claimed_by) = &ov.claimed_by {
                item.claimed_by = claimed_by.clone();
            }
        }
        if status_matches_filter(item.status, filter) {
            patched.push(item);
        } else {
            present.remove(&item.id);
        }
    }

    for ov in overrides {
        if present.contains(&ov.wanted_id) {
            continue;
        }
        if !status_matches_filter(ov.status, filter) {
            continue;
        }
        let sql = format!("SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted WHERE id = '{}'", sql::escape_sql(&ov.wanted_id));
        let main_csv = db.query(&sql, "").await?;
        let row = csv::parse_rows_as_maps(&main_csv).into_iter().next();
        let from_branch_if_missing = match row {
            Some(r) => crate::board::parse::parse_wanted_row(&r).ok(),
            None => {
                let branch_csv = db.query(&sql, &ov.branch).await?;
                csv::parse_rows_as_maps(&branch_csv)
                    .into_iter()
                    .next()
                    .and_then(|r| crate::board::parse::parse_wanted_row(&r).ok())
            }
        };
        if let Some(mut item) = from_branch_if_missing {
            item.status = ov.status;
            if let Some(claimed_by) = &ov.claimed_by {
                item.claimed_by = claimed_by.clone();
            }
            present.insert(item.id.clone());
            patched.push(item);
        }
    }

    Ok(patched)
}

fn status_matches_filter(status: WantedStatus, filter: &BrowseFilter) -> bool {
    match filter.status {
        Some(wanted) => status == wanted,
        None => true,
    }
}

/// The effective state of one item across main and its branch (§4.6
/// `ResolveItemState`).
#[derive(Clone, Debug)]
pub struct ItemState {
    pub main: Option<WantedItem>,
    pub branch: Option<WantedItem>,
    pub branch_name: String,
}

impl ItemState {
    pub fn effective(&self) -> Option<&WantedItem> {
        self.branch.as_ref().or(self.main.as_ref())
    }

    pub fn delta(&self) -> Option<String> {
        let branch_item = self.branch.as_ref()?;
        Some(delta_label(
            self.main.as_ref().map(|m| m.status),
            branch_item.status,
            true,
        ))
    }
}

pub async fn resolve_item_state(db: &dyn DB, rig: &str, wanted_id: &str) -> Result<ItemState, WastelandError> {
    let branch = Branch {
        rig_handle: rig.to_string(),
        wanted_id: wanted_id.to_string(),
    };
    let branch_name = branch.name();

    let sql = format!("SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted WHERE id = '{}'", sql::escape_sql(wanted_id));

    let main_csv = db.query(&sql, "").await?;
    let main = csv::parse_rows_as_maps(&main_csv)
        .into_iter()
        .next()
        .and_then(|r| crate::board::parse::parse_wanted_row(&r).ok());

    let branch_exists = db.branches(&branch_name).await?.iter().any(|b| b == &branch_name);
    let branch_item = if branch_exists {
        let branch_csv = db.query(&sql, &branch_name).await?;
        csv::parse_rows_as_maps(&branch_csv)
            .into_iter()
            .next()
            .and_then(|r| crate::board::parse::parse_wanted_row(&r).ok())
    } else {
        None
    };

    Ok(ItemState {
        main,
        branch: branch_item,
        branch_name: if branch_exists { branch_name } else { String::new() },
    })
}
