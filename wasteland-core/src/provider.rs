//! Provider capability interface (§6) — the injected collaborator a
//! deployment wires to a concrete hosting service (DoltHub, GitHub, a local
//! filesystem shim, or bare git). Modeled as a trait object rather than raw
//! closures per §9's "structured concurrency" alternative.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::WastelandError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderType {
    DoltHub,
    GitHub,
    File,
    Git,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::DoltHub => "dolthub",
            ProviderType::GitHub => "github",
            ProviderType::File => "file",
            ProviderType::Git => "git",
        }
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    fn database_url(&self, org: &str, db: &str) -> String;

    /// Idempotent: a 409/"already exists" response is treated as success.
    async fn fork(&self, from_org: &str, from_db: &str, to_org: &str) -> Result<(), WastelandError>;

    async fn create_pr(
        &self,
        fork_org: &str,
        upstream_org: &str,
        db: &str,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<String, WastelandError>;

    async fn find_pr(
        &self,
        upstream_org: &str,
        db: &str,
        fork_org: &str,
        branch: &str,
    ) -> Result<Option<(String, String)>, WastelandError>;

    async fn close_pr(&self, upstream_org: &str, db: &str, pr_id: &str) -> Result<(), WastelandError>;

    async fn list_pending_wanted_ids(
        &self,
        upstream_org: &str,
        db: &str,
    ) -> Result<HashSet<String>, WastelandError>;
}
