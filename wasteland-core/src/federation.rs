//! Federation onboarder (C8, §4.8) — the `Join` sequence that forks,
//! clones, registers a rig identity, and opens the onboarding PR.

use async_trait::async_trait;

use crate::config::{Config, ConfigStore, Mode};
use crate::error::WastelandError;
use crate::provider::Provider;

const CLONE_MAX_ATTEMPTS: u32 = 3;
const CLONE_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// The CLI-level clone/remote/branch operations `Join` drives, distinct from
/// the query/exec surface of [`crate::backend::DB`] — grounded in the same
/// externally-invoked-binary idiom as the local backend (§4.2).
#[async_trait]
pub trait VcsOps: Send + Sync {
    async fn clone(&self, remote_url: &str, local_dir: &str) -> Result<(), WastelandError>;
    async fn add_upstream_remote(&self, local_dir: &str, upstream_url: &str) -> Result<(), WastelandError>;
    async fn checkout_branch(&self, local_dir: &str, branch: &str) -> Result<(), WastelandError>;
    async fn register_rig(
        &self,
        local_dir: &str,
        rig_handle: &str,
        display_name: &str,
        email: &str,
        version: &str,
        anonymous: bool,
        signing: bool,
    ) -> Result<(), WastelandError>;
    async fn push(&self, local_dir: &str) -> Result<(), WastelandError>;
    async fn push_branch(&self, local_dir: &str, branch: &str) -> Result<(), WastelandError>;
    async fn checkout_main(&self, local_dir: &str) -> Result<(), WastelandError>;
    /// Best-effort cleanup of a local clone that failed partway through.
    async fn remove_local_dir(&self, local_dir: &str) -> Result<(), WastelandError>;
}

fn is_permission_denied(err: &WastelandError) -> bool {
    matches!(err, WastelandError::Backend(msg) if msg.to_lowercase().contains("permission denied"))
}

/// Clones with bounded retry on permission-denied (new fork visibility lag,
/// §4.8 step 4); any other error is fatal immediately.
async fn clone_with_retry(vcs: &dyn VcsOps, remote_url: &str, local_dir: &str) -> Result<(), WastelandError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match vcs.clone(remote_url, local_dir).await {
            Ok(()) => return Ok(()),
            Err(err) if is_permission_denied(&err) && attempt < CLONE_MAX_ATTEMPTS => {
                tokio::time::sleep(CLONE_RETRY_DELAY * attempt).await;
                continue;
            }
            Err(err) => {
                let _ = vcs.remove_local_dir(local_dir).await;
                return Err(err);
            }
        }
    }
}

pub struct JoinRequest<'a> {
    pub upstream: &'a str,
    pub fork_org: &'a str,
    pub rig_handle: &'a str,
    pub display_name: &'a str,
    pub email: &'a str,
    pub version: &'a str,
    pub anonymous: bool,
    pub direct: bool,
    pub signing: bool,
    pub local_dir: &'a str,
}

/// Runs the onboarding sequence, §4.8 steps 1-11. Side effects from step 3
/// onward (fork, onboarding branch) are idempotent and left in place on
/// failure; the local clone is rolled back on clone failure only.
pub async fn join(
    store: &ConfigStore,
    provider: &dyn Provider,
    vcs: &dyn VcsOps,
    req: JoinRequest<'_>,
) -> Result<Config, WastelandError> {
    let (upstream_org, upstream_db) = req
        .upstream
        .split_once('/')
        .filter(|(org, db)| !org.is_empty() && !db.is_empty())
        .ok_or_else(|| WastelandError::validation(format!("invalid upstream {:?}, expected org/db", req.upstream)))?;

    if let Some(existing) = store.load(req.upstream)? {
        return Ok(existing);
    }

    if !req.direct {
        provider.fork(upstream_org, upstream_db, req.fork_org).await?;
    }

    let remote_url = provider.database_url(req.fork_org, upstream_db);
    let upstream_url = provider.database_url(upstream_org, upstream_db);

    clone_with_retry(vcs, &remote_url, req.local_dir).await?;

    let mode = if req.direct { Mode::WildWest } else { Mode::Pr };
    if matches!(mode, Mode::Pr) {
        vcs.add_upstream_remote(req.local_dir, &upstream_url).await?;
    }

    let onboarding_branch = format!("wl/{}/onboard", req.rig_handle);
    if matches!(mode, Mode::Pr) {
        vcs.checkout_branch(req.local_dir, &onboarding_branch).await?;
    }

    vcs.register_rig(
        req.local_dir,
        req.rig_handle,
        req.display_name,
        req.email,
        req.version,
        req.anonymous,
        req.signing,
    )
    .await?;

    if matches!(mode, Mode::Pr) {
        vcs.push_branch(req.local_dir, &onboarding_branch).await?;
    } else {
        vcs.push(req.local_dir).await?;
    }

    vcs.checkout_main(req.local_dir).await?;

    if !req.direct {
        provider
            .create_pr(
                req.fork_org,
                upstream_org,
                upstream_db,
                &onboarding_branch,
                &format!("Register rig {}", req.rig_handle),
                &format!("Onboarding {} as a rig on {}.", req.rig_handle, req.upstream),
            )
            .await?;
    }

    let config = Config {
        upstream: req.upstream.to_string(),
        fork_org: req.fork_org.to_string(),
        fork_db: upstream_db.to_string(),
        local_dir: req.local_dir.to_string(),
        rig_handle: req.rig_handle.to_string(),
        mode,
        signing: req.signing,
        provider_type: provider.provider_type().as_str().to_string(),
        upstream_url,
        joined_at: chrono::Utc::now(),
    };
    store.save(&config)?;
    Ok(config)
}
