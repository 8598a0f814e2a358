//! Remote backend (C3, §4.3) — drives a hosted REST API. Reads route to the
//! upstream database on main, to the fork on a branch; every write routes to
//! the fork and auto-commits, so multi-statement mutations join with `;`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{csv, sql, Csv, DB};
use crate::error::WastelandError;

const POLL_START: Duration = Duration::from_millis(500);
const POLL_CAP: Duration = Duration::from_secs(8);
const POLL_DEADLINE: Duration = Duration::from_secs(120);
const POLL_MAX_CONSECUTIVE_ERRORS: u32 = 5;
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub struct RemoteBackend {
    client: reqwest::Client,
    pub base_url: String,
    pub upstream_org: String,
    pub db: String,
    pub fork_org: String,
}

#[derive(Debug, Deserialize)]
struct WriteAccepted {
    operation_name: String,
    #[serde(default)]
    query_execution_status: Option<String>,
    #[serde(default)]
    query_execution_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Success,
    Error(String),
    Timeout,
}

/// Pulls a status/message pair out of either a flat or nested poll payload
/// (§4.3 notes the hosted API has returned both shapes historically).
fn extract_status_message(value: &Value) -> (Option<String>, Option<String>) {
    let status = value
        .get("query_execution_status")
        .or_else(|| value.get("status"))
        .or_else(|| value.pointer("/query_execution/status"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = value
        .get("query_execution_message")
        .or_else(|| value.get("message"))
        .or_else(|| value.pointer("/query_execution/message"))
        .and_then(Value::as_str)
        .map(str::to_string);
    (status, message)
}

fn is_success_status(status: &str) -> bool {
    matches!(status.to_ascii_lowercase().as_str(), "success" | "successwithwarning")
}

/// Polls `poll_once` with exponential backoff until a terminal status, the
/// deadline elapses, or too many consecutive transport errors occur.
/// Extracted as a free function so the backoff/deadline/fast-fail policy is
/// unit-testable against a scripted sequence of poll responses.
pub async fn poll_until_terminal<F, Fut>(mut poll_once: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Value, String>>,
{
    let deadline = tokio::time::Instant::now() + POLL_DEADLINE;
    let mut backoff = POLL_START;
    let mut consecutive_errors = 0u32;

    loop {
        if tokio::time::Instant::now() >= deadline {
            return PollOutcome::Timeout;
        }

        match poll_once().await {
            Ok(value) => {
                consecutive_errors = 0;
                let (status, message) = extract_status_message(&value);
                match status {
                    Some(s) if is_success_status(&s) => return PollOutcome::Success,
                    Some(s) if s.eq_ignore_ascii_case("error") => {
                        return PollOutcome::Error(message.unwrap_or(s));
                    }
                    _ => {}
                }
            }
            Err(_) => {
                consecutive_errors += 1;
                if consecutive_errors >= POLL_MAX_CONSECUTIVE_ERRORS {
                    return PollOutcome::Timeout;
                }
            }
        }

        tokio::time::sleep(backoff.min(POLL_CAP)).await;
        backoff = (backoff * 2).min(POLL_CAP);
    }
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>, upstream_org: impl Into<String>, db: impl Into<String>, fork_org: impl Into<String>) -> Result<Self, WastelandError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(WastelandError::from)?;
        Ok(RemoteBackend {
            client,
            base_url: base_url.into(),
            upstream_org: upstream_org.into(),
            db: db.into(),
            fork_org: fork_org.into(),
        })
    }

    fn read_url(&self, org: &str, branch: &str, sql: &str) -> String {
        format!(
            "{}/{}/{}/{}?q={}",
            self.base_url,
            org,
            self.db,
            branch,
            urlencoding(sql)
        )
    }

    fn write_url(&self, from: &str, to: &str, sql: &str) -> String {
        format!(
            "{}/{}/{}/write/{}/{}?q={}",
            self.base_url, self.fork_org, self.db, from, to, urlencoding(sql)
        )
    }

    fn poll_url(&self, operation_name: &str) -> String {
        format!(
            "{}/{}/{}/write?operationName={}",
            self.base_url, self.fork_org, self.db, urlencoding(operation_name)
        )
    }

    async fn rows_to_csv(&self, rows: Vec<Value>) -> Csv {
        if rows.is_empty() {
            return String::new();
        }
        let header: Vec<String> = match rows[0].as_object() {
            Some(obj) => obj.keys().cloned().collect(),
            None => Vec::new(),
        };
        let data_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                header
                    .iter()
                    .map(|key| {
                        row.get(key)
                            .map(|v| match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        csv::encode(&header, &data_rows)
    }

    async fn fork_has_branch(&self, name: &str) -> bool {
        self.branches(name).await.map(|b| b.contains(&name.to_string())).unwrap_or(false)
    }

    async fn submit_write(&self, from: &str, to: &str, sql: &str) -> Result<(), WastelandError> {
        let resp = self
            .client
            .post(self.write_url(from, to, sql))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(WastelandError::backend("remote write", resp.status()));
        }
        let accepted: WriteAccepted = resp.json().await?;

        if let Some(status) = &accepted.query_execution_status {
            if is_success_status(status) {
                return Ok(());
            }
            if status.eq_ignore_ascii_case("error") {
                let msg = accepted.query_execution_message.unwrap_or_default();
                return Err(classify_write_error(&msg));
            }
        }

        let operation_name = accepted.operation_name.clone();
        let outcome = poll_until_terminal(|| {
            let url = self.poll_url(&operation_name);
            let client = self.client.clone();
            async move {
                let resp = client.get(url).send().await.map_err(|e| e.to_string())?;
                resp.json::<Value>().await.map_err(|e| e.to_string())
            }
        })
        .await;

        match outcome {
            PollOutcome::Success => Ok(()),
            PollOutcome::Error(msg) => Err(classify_write_error(&msg)),
            PollOutcome::Timeout => Err(WastelandError::backend(
                "remote write",
                "timed out waiting for write to complete",
            )),
        }
    }
}

fn classify_write_error(msg: &str) -> WastelandError {
    if msg.to_ascii_lowercase().contains("nothing to commit") || msg.contains("0 rows affected") {
        WastelandError::nothing_to_commit(msg.to_string())
    } else {
        WastelandError::Backend(msg.to_string())
    }
}

fn urlencoding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[async_trait]
impl DB for RemoteBackend {
    async fn query(&self, sql: &str, branch_ref: &str) -> Result<Csv, WastelandError> {
        let (org, branch) = if branch_ref.is_empty() || branch_ref == "main" {
            (self.upstream_org.as_str(), "main")
        } else {
            (self.fork_org.as_str(), branch_ref)
        };
        let resp = self.client.get(self.read_url(org, branch, sql)).send().await?;
        if !resp.status().is_success() {
            return Err(WastelandError::backend("remote query", resp.status()));
        }
        let rows: Vec<Value> = resp.json().await?;
        Ok(self.rows_to_csv(rows).await)
    }

    async fn exec(&self, branch: &str, _msg: &str, _signed: bool, stmts: &[String]) -> Result<(), WastelandError> {
        let to = if branch.is_empty() { "main" } else { branch };
        let from = if to == "main" {
            "main"
        } else if self.fork_has_branch(to).await {
            to
        } else {
            "main"
        };
        let sql = stmts.join(";");
        self.submit_write(from, to, &sql).await
    }

    async fn branches(&self, prefix: &str) -> Result<Vec<String>, WastelandError> {
        let query_sql = format!(
            "SELECT name FROM dolt_branches WHERE name LIKE '{}%' ORDER BY name",
            sql::escape_sql(prefix)
        );
        let csv = self.query(&query_sql, "main").await?;
        let (_, rows) = csv::parse(&csv);
        Ok(rows.into_iter().filter_map(|r| r.first().cloned()).collect())
    }

    async fn delete_branch(&self, name: &str) -> Result<(), WastelandError> {
        if name.is_empty() || name == "main" {
            return Ok(());
        }
        let write_sql = format!("CALL DOLT_BRANCH('-D', '{}')", sql::escape_sql(name));
        self.submit_write("main", "main", &write_sql).await
    }

    async fn push_branch(&self, _name: &str) -> Result<(), WastelandError> {
        // Writes already land on the fork via the write endpoint; nothing
        // further to push for this backend.
        Ok(())
    }

    async fn push_main(&self) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn push_with_sync(&self) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn sync(&self) -> Result<(), WastelandError> {
        // Best-effort advisory per §9; the hosted API may not support it.
        Ok(())
    }

    async fn merge_branch(&self, name: &str) -> Result<(), WastelandError> {
        let write_sql = format!("CALL DOLT_MERGE('{}')", sql::escape_sql(name));
        self.submit_write("main", "main", &write_sql).await
    }

    async fn delete_remote_branch(&self, name: &str) -> Result<(), WastelandError> {
        self.delete_branch(name).await
    }

    async fn diff(&self, name: &str) -> Result<String, WastelandError> {
        let stat_sql = format!("SELECT * FROM dolt_diff_stat('main', '{}')", sql::escape_sql(name));
        let stat_csv = self.query(&stat_sql, "main").await?;
        let tables = csv::parse_rows_as_maps(&stat_csv);

        let mut report = String::new();
        for table in tables {
            let Some(table_name) = table.get("table_name") else { continue };
            report.push_str(&format!("## {table_name}\n"));
            let diff_sql = format!(
                "SELECT * FROM dolt_diff('main', '{}', '{}')",
                sql::escape_sql(name),
                sql::escape_sql(table_name)
            );
            let diff_csv = self.query(&diff_sql, "main").await?;
            for row in csv::parse_rows_as_maps(&diff_csv) {
                for (key, from_value) in &row {
                    let Some(field) = key.strip_prefix("from_") else { continue };
                    let to_key = format!("to_{field}");
                    if let Some(to_value) = row.get(&to_key) {
                        if from_value != to_value {
                            report.push_str(&format!("  {field}: {from_value} \u{2192} {to_value}\n"));
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    fn can_wild_west(&self) -> Result<(), WastelandError> {
        Err(WastelandError::precondition(
            "wild-west mode requires direct upstream write access, which the hosted API does not grant from a fork",
        ))
    }
}
