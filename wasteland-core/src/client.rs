//! SDK client (C7, §4.7) — the public operation surface every deployment
//! (CLI, hosted workspace resolver) calls through. Owns one backend and one
//! provider and threads every mutation through the PR-mode branch pipeline
//! or the wild-west direct-to-main pipeline per its configured
//! [`lifecycle::WorkflowMode`].

use std::sync::Arc;

use crate::backend::csv;
use crate::backend::sql::{format_tags, sql_literal};
use crate::backend::DB;
use crate::board::{self, BrowseFilter};
use crate::error::WastelandError;
use crate::ids;
use crate::lifecycle::{self, Transition, WorkflowMode};
use crate::model::{Branch, DashboardData, LeaderboardEntry, Severity, Valence, WantedDetail, WantedItem, WantedStatus};
use crate::overlay;
use crate::provider::Provider;

/// Which branches `Browse` overlays onto the main-branch result (§4.7).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrowseView {
    /// Overlay only the calling rig's own `wl/{rig}/…` branches.
    #[default]
    Mine,
    /// Overlay every `wl/*` branch.
    All,
    /// Skip overlay entirely; show main as-is.
    Upstream,
}

pub struct BrowseResult {
    pub items: Vec<WantedItem>,
    pub branch_ids: Vec<String>,
}

/// Refreshed view of an item plus a hint for the caller about what happened
/// to its branch (§4.7 step 7).
#[derive(Debug)]
pub struct MutationResult {
    pub detail: WantedDetail,
    pub branch: String,
    pub branch_equals_main: bool,
}

pub struct WastelandClient {
    db: Arc<dyn DB>,
    provider: Arc<dyn Provider>,
    mode: WorkflowMode,
    rig_handle: String,
    signing: bool,
}

impl std::fmt::Debug for WastelandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WastelandClient")
            .field("mode", &self.mode)
            .field("rig_handle", &self.rig_handle)
            .field("signing", &self.signing)
            .finish_non_exhaustive()
    }
}

impl WastelandClient {
    pub fn new(db: Arc<dyn DB>, provider: Arc<dyn Provider>, mode: WorkflowMode, rig_handle: impl Into<String>, signing: bool) -> Self {
        WastelandClient {
            db,
            provider,
            mode,
            rig_handle: rig_handle.into(),
            signing,
        }
    }

    pub fn rig_handle(&self) -> &str {
        &self.rig_handle
    }

    async fn fetch_rows(&self, sql: &str, branch_ref: &str) -> Result<Vec<std::collections::HashMap<String, String>>, WastelandError> {
        let raw = self.db.query(sql, branch_ref).await?;
        Ok(csv::parse_rows_as_maps(&raw))
    }

    pub async fn browse(&self, filter: BrowseFilter, view: BrowseView) -> Result<BrowseResult, WastelandError> {
        let sql = board::build_browse_query(&filter);
        let rows = self.fetch_rows(&sql, "").await?;
        let mut items = rows
            .iter()
            .filter_map(|r| board::parse_wanted_row(r).ok())
            .collect::<Vec<_>>();

        let branch_ids = match (self.mode, view) {
            (WorkflowMode::WildWest, _) | (_, BrowseView::Upstream) => Vec::new(),
            (WorkflowMode::Pr, BrowseView::Mine) => {
                let overrides = overlay::collect_branch_overrides(self.db.as_ref(), Some(&self.rig_handle)).await?;
                let ids = overrides.iter().map(|o| o.wanted_id.clone()).collect();
                items = overlay::apply_branch_overrides(self.db.as_ref(), items, &overrides, &filter).await?;
                ids
            }
            (WorkflowMode::Pr, BrowseView::All) => {
                let overrides = overlay::collect_branch_overrides(self.db.as_ref(), None).await?;
                let ids = overrides.iter().map(|o| o.wanted_id.clone()).collect();
                items = overlay::apply_branch_overrides(self.db.as_ref(), items, &overrides, &filter).await?;
                ids
            }
        };

        Ok(BrowseResult { items, branch_ids })
    }

    pub async fn detail(&self, id: &str) -> Result<WantedDetail, WastelandError> {
        let (item_sql, completion_sql, stamp_sql) = board::build_wanted_detail_query(id);

        if matches!(self.mode, WorkflowMode::Pr) {
            let state = overlay::resolve_item_state(self.db.as_ref(), &self.rig_handle, id).await?;
            let item = state.effective().cloned();
            let main_status = if state.branch_name.is_empty() {
                String::new()
            } else {
                state.main.as_ref().map(|i| i.status.as_str().to_string()).unwrap_or_default()
            };
            let delta = state.delta();

            let rows = self.fetch_rows(&completion_sql, &state.branch_name).await?;
            let completion = rows.first().map(board::parse_completion_row);
            let rows = self.fetch_rows(&stamp_sql, &state.branch_name).await?;
            let stamp = rows.first().and_then(board::parse_stamp_row);

            let pr_url = if !state.branch_name.is_empty() {
                self.provider.find_pr("", "", &self.rig_handle, &state.branch_name).await?.map(|(url, _)| url)
            } else {
                None
            };

            let branch_actions = item
                .as_ref()
                .map(|i| lifecycle::available_transitions(i, &self.rig_handle).into_iter().map(|t| t.name().to_string()).collect())
                .unwrap_or_default();

            return Ok(WantedDetail {
                item,
                completion,
                stamp,
                branch: state.branch_name,
                main_status,
                pr_url,
                branch_actions,
                delta,
            });
        }

        let rows = self.fetch_rows(&item_sql, "").await?;
        let item = rows.first().and_then(|r| board::parse_wanted_row(r).ok());
        let rows = self.fetch_rows(&completion_sql, "").await?;
        let completion = rows.first().map(board::parse_completion_row);
        let rows = self.fetch_rows(&stamp_sql, "").await?;
        let stamp = rows.first().and_then(board::parse_stamp_row);
        let main_status = item.as_ref().map(|i| i.status.as_str().to_string()).unwrap_or_default();
        let branch_actions = item
            .as_ref()
            .map(|i| lifecycle::available_transitions(i, &self.rig_handle).into_iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default();

        Ok(WantedDetail {
            item,
            completion,
            stamp,
            branch: String::new(),
            main_status,
            pr_url: None,
            branch_actions,
            delta: None,
        })
    }

    pub async fn dashboard(&self) -> Result<DashboardData, WastelandError> {
        let (claimed_sql, awaiting_sql, recent_sql) = board::build_dashboard_queries(&self.rig_handle);
        let claimed_by_me = self.fetch_rows(&claimed_sql, "").await?.iter().filter_map(|r| board::parse_wanted_row(r).ok()).collect();
        let awaiting_my_review = self.fetch_rows(&awaiting_sql, "").await?.iter().filter_map(|r| board::parse_wanted_row(r).ok()).collect();
        let my_recent_completions = self.fetch_rows(&recent_sql, "").await?.iter().filter_map(|r| board::parse_wanted_row(r).ok()).collect();
        Ok(DashboardData {
            claimed_by_me,
            awaiting_my_review,
            my_recent_completions,
        })
    }

    async fn main_status_of(&self, id: &str) -> Result<WantedStatus, WastelandError> {
        let sql = format!("SELECT status FROM wanted WHERE id = {}", sql_literal(id));
        let rows = self.fetch_rows(&sql, "").await?;
        rows.first()
            .and_then(|r| r.get("status"))
            .and_then(|s| WantedStatus::parse(s))
            .ok_or_else(|| WastelandError::nothing_to_commit(format!("wanted item {id} does not exist")))
    }

    async fn main_item(&self, id: &str) -> Result<Option<WantedItem>, WastelandError> {
        let sql = format!(
            "SELECT id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at FROM wanted WHERE id = {}",
            sql_literal(id)
        );
        let rows = self.fetch_rows(&sql, "").await?;
        Ok(rows.first().and_then(|r| board::parse_wanted_row(r).ok()))
    }

    /// Checks `t`'s permission rule against the main-branch item before a
    /// mutation runs, for rules the predicate-guarded UPDATE can't express
    /// on its own (an actor-relative check, not just a status match).
    async fn check_permission(&self, id: &str, t: Transition) -> Result<(), WastelandError> {
        if let Some(item) = self.main_item(id).await? {
            if item.status == t.from_to().0 && !lifecycle::can_perform_transition(&item, t, &self.rig_handle) {
                return Err(WastelandError::precondition(format!("cannot {}: {} may not stamp their own work", t.name(), self.rig_handle)));
            }
        }
        Ok(())
    }

    /// Runs `stmts` through the configured workflow mode's mutation pipeline
    /// (§4.7). `stmts` perform the DML; `t` identifies the lifecycle
    /// transition for permission/delta purposes.
    async fn mutate(&self, id: &str, t: Transition, stmts: Vec<String>) -> Result<MutationResult, WastelandError> {
        match self.mode {
            WorkflowMode::WildWest => self.mutate_on_main(id, stmts).await,
            WorkflowMode::Pr => self.mutate_on_branch(id, t, stmts).await,
        }
    }

    async fn mutate_on_main(&self, id: &str, stmts: Vec<String>) -> Result<MutationResult, WastelandError> {
        let msg = format!("wasteland: {id}");
        self.db.exec("", &msg, self.signing, &stmts).await?;
        let _ = self.db.push_with_sync().await;
        let detail = self.detail(id).await?;
        Ok(MutationResult {
            detail,
            branch: String::new(),
            branch_equals_main: true,
        })
    }

    async fn mutate_on_branch(&self, id: &str, _t: Transition, stmts: Vec<String>) -> Result<MutationResult, WastelandError> {
        let branch = Branch {
            rig_handle: self.rig_handle.clone(),
            wanted_id: id.to_string(),
        };
        let branch_name = branch.name();

        let main_status = self.main_status_of(id).await.ok();

        let msg = format!("wasteland: {id}");
        self.db.exec(&branch_name, &msg, self.signing, &stmts).await?;

        let state = overlay::resolve_item_state(self.db.as_ref(), &self.rig_handle, id).await?;
        let branch_status = state.branch.as_ref().map(|i| i.status);
        let branch_equals_main = main_status.is_some() && main_status == branch_status;

        let existing_pr = self.provider.find_pr("", "", &self.rig_handle, &branch_name).await?;
        let pr_url = existing_pr.as_ref().map(|(url, _)| url.clone());

        let _ = self.db.push_branch(&branch_name).await;

        let item = state.effective().cloned();
        let delta = state.delta();
        let branch_actions = item
            .as_ref()
            .map(|i| lifecycle::available_transitions(i, &self.rig_handle).into_iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default();

        let (_, completion_sql, stamp_sql) = board::build_wanted_detail_query(id);
        let rows = self.fetch_rows(&completion_sql, &branch_name).await?;
        let completion = rows.first().map(board::parse_completion_row);
        let rows = self.fetch_rows(&stamp_sql, &branch_name).await?;
        let stamp = rows.first().and_then(board::parse_stamp_row);

        let detail = WantedDetail {
            item,
            completion,
            stamp,
            branch: branch_name.clone(),
            main_status: main_status.map(|s| s.as_str().to_string()).unwrap_or_default(),
            pr_url,
            branch_actions,
            delta,
        };

        if branch_equals_main {
            let _ = self.db.delete_branch(&branch_name).await;
            let _ = self.db.delete_remote_branch(&branch_name).await;
            if let Some((_, pr_id)) = &existing_pr {
                let _ = self.provider.close_pr("", "", pr_id).await;
            }
        }

        Ok(MutationResult {
            detail,
            branch: branch_name,
            branch_equals_main,
        })
    }

    pub async fn claim(&self, id: &str) -> Result<MutationResult, WastelandError> {
        let stmt = format!(
            "UPDATE wanted SET status = 'claimed', claimed_by = {} WHERE id = {} AND status = 'open'",
            sql_literal(&self.rig_handle),
            sql_literal(id)
        );
        self.mutate(id, Transition::Claim, vec![stmt]).await
    }

    pub async fn unclaim(&self, id: &str) -> Result<MutationResult, WastelandError> {
        let stmt = format!(
            "UPDATE wanted SET status = 'open', claimed_by = '' WHERE id = {} AND status = 'claimed'",
            sql_literal(id)
        );
        self.mutate(id, Transition::Unclaim, vec![stmt]).await
    }

    pub async fn done(&self, id: &str, evidence: &str) -> Result<MutationResult, WastelandError> {
        if evidence.trim().is_empty() {
            return Err(WastelandError::validation("evidence must not be empty"));
        }
        let completion_id = ids::generate_completion_id(id);
        let status_stmt = format!(
            "UPDATE wanted SET status = 'in_review' WHERE id = {} AND status = 'claimed'",
            sql_literal(id)
        );
        let completion_stmt = format!(
            "INSERT INTO completions (id, wanted_id, completed_by, evidence, completed_at) \
             SELECT {}, {}, {}, {}, NOW() WHERE NOT EXISTS (SELECT 1 FROM completions WHERE wanted_id = {})",
            sql_literal(&completion_id),
            sql_literal(id),
            sql_literal(&self.rig_handle),
            sql_literal(evidence),
            sql_literal(id)
        );
        self.mutate(id, Transition::Done, vec![status_stmt, completion_stmt]).await
    }

    pub async fn accept(
        &self,
        id: &str,
        quality: u8,
        reliability: u8,
        severity: Severity,
        skills: &[String],
        message: Option<&str>,
    ) -> Result<MutationResult, WastelandError> {
        let valence = Valence { quality, reliability };
        let valence_json = serde_json::to_string(&valence)?;
        let stamp_id = ids::generate_stamp_id(id);
        let status_stmt = format!(
            "UPDATE wanted SET status = 'completed' WHERE id = {} AND status = 'in_review'",
            sql_literal(id)
        );
        let stamp_stmt = format!(
            "INSERT INTO stamps (id, author, subject, valence, severity, context_id, context_type, skill_tags, message, created_at) \
             VALUES ({}, {}, {}, {}, {}, {}, 'completion', {}, {}, NOW())",
            sql_literal(&stamp_id),
            sql_literal(&self.rig_handle),
            sql_literal(id),
            sql_literal(&valence_json),
            sql_literal(severity.as_str()),
            sql_literal(id),
            format_tags(skills),
            message.map(sql_literal).unwrap_or_else(|| "NULL".to_string())
        );
        let link_stmt = format!(
            "UPDATE completions SET validated_by = {}, stamp_id = {}, validated_at = NOW() WHERE wanted_id = {}",
            sql_literal(&self.rig_handle),
            sql_literal(&stamp_id),
            sql_literal(id)
        );
        self.check_permission(id, Transition::Accept).await?;
        self.mutate(id, Transition::Accept, vec![status_stmt, stamp_stmt, link_stmt]).await
    }

    pub async fn reject(&self, id: &str, reason: &str) -> Result<MutationResult, WastelandError> {
        let status_stmt = format!(
            "UPDATE wanted SET status = 'claimed' WHERE id = {} AND status = 'in_review'",
            sql_literal(id)
        );
        let delete_stmt = format!("DELETE FROM completions WHERE wanted_id = {}", sql_literal(id));
        let _ = reason;
        self.mutate(id, Transition::Reject, vec![status_stmt, delete_stmt]).await
    }

    pub async fn close(&self, id: &str) -> Result<MutationResult, WastelandError> {
        let stmt = format!(
            "UPDATE wanted SET status = 'completed' WHERE id = {} AND status = 'in_review'",
            sql_literal(id)
        );
        self.mutate(id, Transition::Close, vec![stmt]).await
    }

    pub async fn delete(&self, id: &str) -> Result<MutationResult, WastelandError> {
        let stmt = format!(
            "UPDATE wanted SET status = 'withdrawn' WHERE id = {} AND status = 'open'",
            sql_literal(id)
        );
        self.mutate(id, Transition::Delete, vec![stmt]).await
    }

    pub async fn update(&self, id: &str, title: Option<&str>, description: Option<&str>, priority: Option<i32>) -> Result<MutationResult, WastelandError> {
        let mut assignments = Vec::new();
        if let Some(title) = title {
            if title.trim().is_empty() {
                return Err(WastelandError::validation("title must not be empty"));
            }
            assignments.push(format!("title = {}", sql_literal(title)));
        }
        if let Some(description) = description {
            assignments.push(format!("description = {}", sql_literal(description)));
        }
        if let Some(priority) = priority {
            assignments.push(format!("priority = {priority}"));
        }
        if assignments.is_empty() {
            return Err(WastelandError::validation("update requires at least one field"));
        }
        let stmt = format!(
            "UPDATE wanted SET {} WHERE id = {} AND status = 'open'",
            assignments.join(", "),
            sql_literal(id)
        );
        self.mutate(id, Transition::Update, vec![stmt]).await
    }

    pub async fn post(&self, title: &str, description: &str, project: &str, kind: crate::model::WantedType, priority: i32, tags: &[String], effort_level: &str, sandbox_required: bool) -> Result<WantedItem, WastelandError> {
        if title.trim().is_empty() {
            return Err(WastelandError::validation("title must not be empty"));
        }
        let id = ids::generate_wanted_id(title);
        let stmt = format!(
            "INSERT INTO wanted (id, title, description, project, type, priority, tags, posted_by, claimed_by, status, effort_level, sandbox_required, created_at, updated_at) \
             VALUES ({}, {}, {}, {}, {}, {priority}, {}, {}, '', 'open', {}, {}, NOW(), NOW())",
            sql_literal(&id),
            sql_literal(title),
            sql_literal(description),
            sql_literal(project),
            sql_literal(kind.as_str()),
            format_tags(tags),
            sql_literal(&self.rig_handle),
            sql_literal(effort_level),
            if sandbox_required { 1 } else { 0 }
        );
        self.db.exec("", &format!("wasteland: post {id}"), self.signing, &[stmt]).await?;
        let _ = self.db.push_with_sync().await;
        self.detail(&id).await?.item.ok_or_else(|| WastelandError::backend("post", "item missing after insert"))
    }

    pub async fn apply_branch(&self, branch: &str) -> Result<(), WastelandError> {
        self.db.merge_branch(branch).await?;
        self.db.delete_branch(branch).await?;
        self.db.push_main().await?;
        Ok(())
    }

    pub async fn discard_branch(&self, branch: &str) -> Result<(), WastelandError> {
        self.db.delete_branch(branch).await?;
        let _ = self.db.delete_remote_branch(branch).await;
        Ok(())
    }

    pub async fn submit_pr(&self, branch: &str) -> Result<String, WastelandError> {
        let Some(parsed) = Branch::parse(branch) else {
            return Err(WastelandError::validation(format!("{branch} is not a wl/ branch")));
        };
        match self
            .provider
            .create_pr("", "", &parsed.wanted_id, branch, &format!("wasteland: {}", parsed.wanted_id), "")
            .await
        {
            Ok(url) => Ok(url),
            Err(_) => self
                .provider
                .find_pr("", "", &self.rig_handle, branch)
                .await?
                .map(|(url, _)| url)
                .ok_or_else(|| WastelandError::backend("submit pr", "provider reported conflict but no existing PR was found")),
        }
    }

    pub async fn branch_diff(&self, branch: &str) -> Result<String, WastelandError> {
        self.db.diff(branch).await
    }

    pub async fn list_pending_items(&self) -> Result<std::collections::HashSet<String>, WastelandError> {
        self.provider.list_pending_wanted_ids("", "").await
    }

    pub async fn leaderboard(&self, limit: Option<u32>) -> Result<Vec<LeaderboardEntry>, WastelandError> {
        let sql = board::build_leaderboard_queries(limit);
        let rows = self.fetch_rows(&sql, "").await?;
        let mut entries: Vec<LeaderboardEntry> = rows
            .iter()
            .map(|r| LeaderboardEntry {
                rig: r.get("rig").cloned().unwrap_or_default(),
                validated_completions: r.get("validated_completions").and_then(|v| v.parse().ok()).unwrap_or(0),
                avg_quality: r.get("avg_quality").and_then(|v| v.parse().ok()).unwrap_or(0.0),
                avg_reliability: r.get("avg_reliability").and_then(|v| v.parse().ok()).unwrap_or(0.0),
                top_skills: Vec::new(),
            })
            .collect();

        let rigs = entries.iter().map(|e| e.rig.clone()).collect::<Vec<_>>();
        if let Some(skills_sql) = board::build_skill_tags_query(&rigs) {
            let skill_rows = self.fetch_rows(&skills_sql, "").await?;
            let mut by_rig: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();
            for row in &skill_rows {
                let rig = row.get("rig").cloned().unwrap_or_default();
                let tags = crate::backend::sql::parse_tags(row.get("skill_tags").map(String::as_str).unwrap_or(""));
                by_rig.entry(rig).or_default().extend(tags);
            }
            for entry in &mut entries {
                if let Some(tags) = by_rig.get(&entry.rig) {
                    entry.top_skills = board::top_n_by_frequency(tags, 5);
                }
            }
        }

        Ok(entries)
    }

    pub async fn save_config(&self, store: &crate::config::ConfigStore, mut config: crate::config::Config, mode: WorkflowMode, signing: bool) -> Result<(), WastelandError> {
        config.mode = match mode {
            WorkflowMode::WildWest => crate::config::Mode::WildWest,
            WorkflowMode::Pr => crate::config::Mode::Pr,
        };
        config.signing = signing;
        store.save(&config)
    }
}
