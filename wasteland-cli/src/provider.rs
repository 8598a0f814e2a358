//! The `file` provider (§6 `Type() -> "file"`): a no-op capability
//! implementation for direct/wild-west deployments where there is no
//! hosting service to fork or open PRs against.

use std::collections::HashSet;

use async_trait::async_trait;
use wasteland_core::provider::{Provider, ProviderType};
use wasteland_core::WastelandError;

pub struct FileProvider {
    base_dir: String,
}

impl FileProvider {
    pub fn new(base_dir: impl Into<String>) -> Self {
        FileProvider { base_dir: base_dir.into() }
    }
}

#[async_trait]
impl Provider for FileProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::File
    }

    fn database_url(&self, org: &str, db: &str) -> String {
        format!("{}/{org}/{db}", self.base_dir)
    }

    async fn fork(&self, _from_org: &str, _from_db: &str, _to_org: &str) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn create_pr(
        &self,
        _fork_org: &str,
        _upstream_org: &str,
        _db: &str,
        _branch: &str,
        _title: &str,
        _body: &str,
    ) -> Result<String, WastelandError> {
        Err(WastelandError::backend("create pr", "the file provider has no PR surface; apply the branch directly"))
    }

    async fn find_pr(
        &self,
        _upstream_org: &str,
        _db: &str,
        _fork_org: &str,
        _branch: &str,
    ) -> Result<Option<(String, String)>, WastelandError> {
        Ok(None)
    }

    async fn close_pr(&self, _upstream_org: &str, _db: &str, _pr_id: &str) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn list_pending_wanted_ids(&self, _upstream_org: &str, _db: &str) -> Result<HashSet<String>, WastelandError> {
        Ok(HashSet::new())
    }
}
