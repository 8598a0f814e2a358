//! Local backend (C2, §4.2) — drives an embedded versioned-DB CLI (`dolt`)
//! as a subprocess: SQL scripts written to temp files, branch/commit via the
//! CLI's procedural SQL functions, push/pull via the CLI's own subcommands.
//! The subprocess-wrapping idiom (temp file + `Stdio::piped()` + captured
//! stderr) mirrors how this crate's lineage drives external CLI tools for
//! LLM backends.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::backend::{csv, sql, Csv, DB};
use crate::error::WastelandError;

const READ_TIMEOUT: Duration = Duration::from_secs(15);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const PUSH_PULL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct LocalBackend {
    pub cli_bin: PathBuf,
    pub local_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        LocalBackend {
            cli_bin: PathBuf::from("dolt"),
            local_dir: local_dir.into(),
        }
    }

    pub fn with_cli_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.cli_bin = bin.into();
        self
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, WastelandError> {
        let mut cmd = Command::new(&self.cli_bin);
        cmd.current_dir(&self.local_dir)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            WastelandError::backend("dolt spawn", format!("failed to spawn {}: {e}", self.cli_bin.display()))
        })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| WastelandError::backend("dolt", "command timed out"))?
            .map_err(|e| WastelandError::backend("dolt", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WastelandError::Backend(format!("dolt {}: {}", args.join(" "), stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_query_csv(&self, sql: &str, timeout: Duration) -> Result<String, WastelandError> {
        self.run(&["sql", "-r", "csv", "-q", sql], timeout).await
    }

    fn write_script(stmts: &[String]) -> Result<NamedTempFile, WastelandError> {
        let mut file = NamedTempFile::new()?;
        for stmt in stmts {
            writeln!(file, "{stmt};")?;
        }
        file.flush()?;
        Ok(file)
    }

    /// Creates `branch` if it doesn't already exist (§4.2: branches are
    /// created lazily on first PR-mode mutation of an item).
    async fn ensure_branch(&self, branch: &str) -> Result<(), WastelandError> {
        let stmt = format!("CALL DOLT_BRANCH('{}')", sql::escape_sql(branch));
        match self.run(&["sql", "-q", &stmt], WRITE_TIMEOUT).await {
            Ok(_) => Ok(()),
            Err(WastelandError::Backend(msg)) if msg.contains("already exists") => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl DB for LocalBackend {
    async fn query(&self, query: &str, branch_ref: &str) -> Result<Csv, WastelandError> {
        let sql = if branch_ref.is_empty() {
            query.to_string()
        } else {
            format!("{query} AS OF '{}'", sql::escape_sql(branch_ref))
        };
        self.run_query_csv(&sql, READ_TIMEOUT).await
    }

    async fn exec(
        &self,
        branch: &str,
        msg: &str,
        signed: bool,
        stmts: &[String],
    ) -> Result<(), WastelandError> {
        let mut script = Vec::new();
        if !branch.is_empty() && branch != "main" {
            self.ensure_branch(branch).await?;
            script.push(format!(
                "CALL DOLT_CHECKOUT('{}')",
                sql::escape_sql(branch)
            ));
        }
        script.extend(stmts.iter().cloned());
        script.push("CALL DOLT_ADD('-A')".to_string());

        let commit_args = if signed {
            format!("'-S','-m','{}'", sql::escape_sql(msg))
        } else {
            format!("'-m','{}'", sql::escape_sql(msg))
        };
        script.push(format!("CALL DOLT_COMMIT({commit_args})"));

        let file = Self::write_script(&script)?;
        let path = file.path().to_string_lossy().into_owned();
        let result = self.run(&["sql", "--file", &path], WRITE_TIMEOUT).await;

        match result {
            Ok(_) => Ok(()),
            Err(WastelandError::Backend(msg)) if msg.contains("nothing to commit") => {
                Err(WastelandError::nothing_to_commit(format!(
                    "nothing to commit on branch '{branch}'"
                )))
            }
            Err(e) => Err(e),
        }
    }

    async fn branches(&self, prefix: &str) -> Result<Vec<String>, WastelandError> {
        let query = format!(
            "SELECT name FROM dolt_branches WHERE name LIKE '{}%' ORDER BY name",
            sql::escape_sql(prefix)
        );
        let csv = self.run_query_csv(&query, READ_TIMEOUT).await?;
        let (_, rows) = csv::parse(&csv);
        Ok(rows.into_iter().filter_map(|r| r.first().cloned()).collect())
    }

    async fn delete_branch(&self, name: &str) -> Result<(), WastelandError> {
        if name.is_empty() || name == "main" {
            return Ok(());
        }
        let stmt = format!("CALL DOLT_BRANCH('-D', '{}')", sql::escape_sql(name));
        self.run(&["sql", "-q", &stmt], WRITE_TIMEOUT).await.map(|_| ())
    }

    async fn push_branch(&self, name: &str) -> Result<(), WastelandError> {
        self.run(&["push", "origin", name], PUSH_PULL_TIMEOUT).await.map(|_| ())
    }

    async fn push_main(&self) -> Result<(), WastelandError> {
        self.run(&["push", "origin", "main"], PUSH_PULL_TIMEOUT).await.map(|_| ())
    }

    async fn push_with_sync(&self) -> Result<(), WastelandError> {
        let mut last_err = None;
        for remote in ["upstream", "origin"] {
            match self.run(&["push", remote, "main"], PUSH_PULL_TIMEOUT).await {
                Ok(_) => continue,
                Err(e) => {
                    let _ = self.run(&["pull", remote, "main"], PUSH_PULL_TIMEOUT).await;
                    if let Err(retry_err) = self.run(&["push", remote, "main"], PUSH_PULL_TIMEOUT).await {
                        last_err = Some((remote, e, retry_err));
                    }
                }
            }
        }
        if let Some((remote, first, retry)) = last_err {
            return Err(WastelandError::partial_success(
                format!("push to {remote} failed after pull-and-retry: {retry}"),
                format!("local commit is durable; original failure: {first}"),
            ));
        }
        Ok(())
    }

    async fn sync(&self) -> Result<(), WastelandError> {
        let _ = self.run(&["pull", "upstream", "main"], PUSH_PULL_TIMEOUT).await;
        Ok(())
    }

    async fn merge_branch(&self, name: &str) -> Result<(), WastelandError> {
        let stmt = format!("CALL DOLT_MERGE('{}')", sql::escape_sql(name));
        self.run(&["sql", "-q", &stmt], WRITE_TIMEOUT).await.map(|_| ())
    }

    async fn delete_remote_branch(&self, name: &str) -> Result<(), WastelandError> {
        let _ = self.run(&["push", "origin", "--delete", name], PUSH_PULL_TIMEOUT).await;
        Ok(())
    }

    async fn diff(&self, name: &str) -> Result<String, WastelandError> {
        self.run(&["diff", "main", name], READ_TIMEOUT).await
    }

    fn can_wild_west(&self) -> Result<(), WastelandError> {
        Ok(())
    }
}
