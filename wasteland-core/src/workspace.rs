//! Workspace resolver (C9, §4.9) — caches one [`Workspace`] per hosted
//! session connection behind a double-checked lock, matching the
//! `parking_lot::Mutex`-guarded shared-state idiom this crate's lineage
//! already uses for its capture console.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::DB;
use crate::client::WastelandClient;
use crate::config::Config;
use crate::error::WastelandError;
use crate::lifecycle::WorkflowMode;
use crate::provider::Provider;

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub type ConnectionId = String;

/// Credential + per-wasteland metadata fetched from the identity provider on
/// a cache miss (§4.9).
#[derive(Clone, Debug)]
pub struct SessionMetadata {
    pub wastelands: Vec<Config>,
}

/// The identity provider lookup and the metadata-endpoint read-modify-write
/// `SaveConfig` performs, injected so the resolver stays backend-agnostic.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch_metadata(&self, connection_id: &str) -> Result<SessionMetadata, WastelandError>;
}

/// One resolved SDK client per joined wasteland, keyed by `"{org}/{db}"`.
#[derive(Debug)]
pub struct Workspace {
    pub clients: HashMap<String, Arc<WastelandClient>>,
}

struct CacheEntry {
    workspace: Arc<Workspace>,
    expires_at: Instant,
}

/// Builds one [`WastelandClient`] per wasteland in a connection's metadata,
/// given a backend/provider factory.
pub trait ClientFactory: Send + Sync {
    fn build(&self, config: &Config) -> Result<(Arc<dyn DB>, Arc<dyn Provider>), WastelandError>;
}

pub struct WorkspaceResolver {
    cache: Mutex<HashMap<ConnectionId, CacheEntry>>,
    identity: Arc<dyn IdentityProvider>,
    factory: Arc<dyn ClientFactory>,
}

impl WorkspaceResolver {
    pub fn new(identity: Arc<dyn IdentityProvider>, factory: Arc<dyn ClientFactory>) -> Self {
        WorkspaceResolver {
            cache: Mutex::new(HashMap::new()),
            identity,
            factory,
        }
    }

    /// Fast path: an unexpired cache hit. Otherwise fetches metadata, then
    /// re-checks the cache under the lock to collapse racing lookups before
    /// building fresh clients.
    pub async fn resolve(&self, connection_id: &str) -> Result<Arc<Workspace>, WastelandError> {
        if let Some(workspace) = self.cached(connection_id) {
            return Ok(workspace);
        }

        let metadata = self.identity.fetch_metadata(connection_id).await?;
        if metadata.wastelands.is_empty() {
            return Err(WastelandError::NotJoined(format!(
                "connection {connection_id} has no joined wastelands"
            )));
        }

        if let Some(workspace) = self.cached(connection_id) {
            return Ok(workspace);
        }

        let mut clients = HashMap::new();
        for config in &metadata.wastelands {
            let (db, provider) = self.factory.build(config)?;
            let mode = match config.mode {
                crate::config::Mode::WildWest => WorkflowMode::WildWest,
                crate::config::Mode::Pr => WorkflowMode::Pr,
            };
            let client = Arc::new(WastelandClient::new(db, provider, mode, config.rig_handle.clone(), config.signing));
            clients.insert(config.upstream.clone(), client);
        }
        let workspace = Arc::new(Workspace { clients });

        let mut cache = self.cache.lock();
        cache.entry(connection_id.to_string()).or_insert_with(|| CacheEntry {
            workspace: workspace.clone(),
            expires_at: Instant::now() + CACHE_TTL,
        });
        Ok(cache.get(connection_id).unwrap().workspace.clone())
    }

    fn cached(&self, connection_id: &str) -> Option<Arc<Workspace>> {
        let cache = self.cache.lock();
        let entry = cache.get(connection_id)?;
        if entry.expires_at > Instant::now() {
            Some(entry.workspace.clone())
        } else {
            None
        }
    }

    /// Evicts one entry on credential rotation.
    pub fn invalidate_connection(&self, connection_id: &str) {
        self.cache.lock().remove(connection_id);
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }
}
