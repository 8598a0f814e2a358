//! In-memory `Provider` for tests — tracks opened PRs per branch instead of
//! calling a real hosting API.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use wasteland_core::provider::{Provider, ProviderType};
use wasteland_core::WastelandError;

pub struct FakeProvider {
    prs: Mutex<HashMap<String, String>>,
    pending: HashSet<String>,
    fail_create_pr: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider {
            prs: Mutex::new(HashMap::new()),
            pending: HashSet::new(),
            fail_create_pr: false,
        }
    }

    pub fn with_pending(mut self, ids: impl IntoIterator<Item = &'static str>) -> Self {
        self.pending = ids.into_iter().map(String::from).collect();
        self
    }

    pub fn with_failing_create_pr(mut self) -> Self {
        self.fail_create_pr = true;
        self
    }

    pub fn open_prs(&self) -> Vec<String> {
        self.prs.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::GitHub
    }

    fn database_url(&self, org: &str, db: &str) -> String {
        format!("https://example.test/{org}/{db}")
    }

    async fn fork(&self, _from_org: &str, _from_db: &str, _to_org: &str) -> Result<(), WastelandError> {
        Ok(())
    }

    async fn create_pr(&self, _fork_org: &str, _upstream_org: &str, _db: &str, branch: &str, _title: &str, _body: &str) -> Result<String, WastelandError> {
        if self.fail_create_pr {
            return Err(WastelandError::backend("create pr", "provider unavailable"));
        }
        let url = format!("https://example.test/pr/{branch}");
        self.prs.lock().unwrap().insert(branch.to_string(), url.clone());
        Ok(url)
    }

    async fn find_pr(&self, _upstream_org: &str, _db: &str, _fork_org: &str, branch: &str) -> Result<Option<(String, String)>, WastelandError> {
        Ok(self.prs.lock().unwrap().get(branch).map(|url| (url.clone(), branch.to_string())))
    }

    async fn close_pr(&self, _upstream_org: &str, _db: &str, pr_id: &str) -> Result<(), WastelandError> {
        // This fake's "pr_id" is the branch name `find_pr` returned it under.
        self.prs.lock().unwrap().remove(pr_id);
        Ok(())
    }

    async fn list_pending_wanted_ids(&self, _upstream_org: &str, _db: &str) -> Result<HashSet<String>, WastelandError> {
        Ok(self.pending.clone())
    }
}
