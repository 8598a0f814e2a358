//! `VcsOps` for the `dolt` CLI (§4.8 `Join`'s `CLI.*` steps), shelling out
//! the same way [`wasteland_core::backend::local::LocalBackend`] does.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use wasteland_core::backend::sql::escape_sql;
use wasteland_core::federation::VcsOps;
use wasteland_core::WastelandError;

const CLONE_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DoltVcs {
    cli_bin: String,
}

impl DoltVcs {
    pub fn new() -> Self {
        DoltVcs { cli_bin: "dolt".to_string() }
    }

    async fn run_in(&self, dir: &str, args: &[&str], timeout: Duration) -> Result<(), WastelandError> {
        let mut cmd = Command::new(&self.cli_bin);
        cmd.current_dir(dir).args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
        let child = cmd
            .spawn()
            .map_err(|e| WastelandError::backend("dolt spawn", format!("failed to spawn {}: {e}", self.cli_bin)))?;
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| WastelandError::backend("dolt", "command timed out"))?
            .map_err(|e| WastelandError::backend("dolt", e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WastelandError::Backend(format!("dolt {}: {}", args.join(" "), stderr.trim())));
        }
        Ok(())
    }
}

#[async_trait]
impl VcsOps for DoltVcs {
    async fn clone(&self, remote_url: &str, local_dir: &str) -> Result<(), WastelandError> {
        let mut cmd = Command::new(&self.cli_bin);
        cmd.args(["clone", remote_url, local_dir]).stdout(Stdio::piped()).stderr(Stdio::piped());
        let child = cmd
            .spawn()
            .map_err(|e| WastelandError::backend("dolt spawn", format!("failed to spawn {}: {e}", self.cli_bin)))?;
        let output = tokio::time::timeout(CLONE_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| WastelandError::backend("dolt", "clone timed out"))?
            .map_err(|e| WastelandError::backend("dolt", e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WastelandError::Backend(format!("dolt clone: {}", stderr.trim())));
        }
        Ok(())
    }

    async fn add_upstream_remote(&self, local_dir: &str, upstream_url: &str) -> Result<(), WastelandError> {
        self.run_in(local_dir, &["remote", "add", "upstream", upstream_url], WRITE_TIMEOUT).await
    }

    async fn checkout_branch(&self, local_dir: &str, branch: &str) -> Result<(), WastelandError> {
        self.run_in(local_dir, &["checkout", "-b", branch], WRITE_TIMEOUT).await
    }

    async fn register_rig(
        &self,
        local_dir: &str,
        rig_handle: &str,
        display_name: &str,
        email: &str,
        version: &str,
        anonymous: bool,
        signing: bool,
    ) -> Result<(), WastelandError> {
        let mut sql = format!(
            "INSERT INTO wl_identities (rig_handle, display_name, email, version, anonymous) VALUES ('{}', '{}', '{}', '{}', {})",
            escape_sql(rig_handle),
            escape_sql(display_name),
            escape_sql(email),
            escape_sql(version),
            if anonymous { 1 } else { 0 }
        );
        let commit_msg = format!("register rig {}", escape_sql(rig_handle));
        let commit_args = if signing {
            format!("'-S','-m','{commit_msg}'")
        } else {
            format!("'-m','{commit_msg}'")
        };
        sql.push_str(&format!("; CALL DOLT_ADD('-A'); CALL DOLT_COMMIT({commit_args})"));
        self.run_in(local_dir, &["sql", "-q", &sql], WRITE_TIMEOUT).await
    }

    async fn push(&self, local_dir: &str) -> Result<(), WastelandError> {
        self.run_in(local_dir, &["push", "origin", "main"], WRITE_TIMEOUT).await
    }

    async fn push_branch(&self, local_dir: &str, branch: &str) -> Result<(), WastelandError> {
        self.run_in(local_dir, &["push", "origin", branch], WRITE_TIMEOUT).await
    }

    async fn checkout_main(&self, local_dir: &str) -> Result<(), WastelandError> {
        self.run_in(local_dir, &["checkout", "main"], WRITE_TIMEOUT).await
    }

    async fn remove_local_dir(&self, local_dir: &str) -> Result<(), WastelandError> {
        tokio::fs::remove_dir_all(local_dir).await.or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(WastelandError::from(e))
            }
        })
    }
}
