//! Backend contract (C1, §4.1) — the capability interface every storage
//! adapter satisfies, plus the shared SQL/CSV helpers both adapters use.

pub mod csv;
pub mod local;
pub mod remote;
pub mod sql;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use async_trait::async_trait;

use crate::error::WastelandError;

/// A single query result set, CSV-encoded: header row then data rows, with
/// quoted fields and doubled `""` for embedded quotes (§4.1).
pub type Csv = String;

#[async_trait]
pub trait DB: Send + Sync {
    /// `branch_ref` empty means current/main, otherwise a branch or commit
    /// reference (AS-OF syntax is the backend's concern).
    async fn query(&self, sql: &str, branch_ref: &str) -> Result<Csv, WastelandError>;

    /// Executes `stmts` in order on `branch`, recorded under commit message
    /// `msg`. `signed` requests a GPG-signed commit where supported.
    async fn exec(
        &self,
        branch: &str,
        msg: &str,
        signed: bool,
        stmts: &[String],
    ) -> Result<(), WastelandError>;

    /// Lists branch names matching `{prefix}%`, sorted.
    async fn branches(&self, prefix: &str) -> Result<Vec<String>, WastelandError>;

    /// No-op for `""` and `"main"`.
    async fn delete_branch(&self, name: &str) -> Result<(), WastelandError>;

    /// Best-effort; failures are logged by the caller, never fatal.
    async fn push_branch(&self, name: &str) -> Result<(), WastelandError>;

    async fn push_main(&self) -> Result<(), WastelandError>;

    /// Attempts a push; on rejection, pulls and retries once.
    async fn push_with_sync(&self) -> Result<(), WastelandError>;

    /// Best-effort fast-forward of fork/main from upstream/main.
    async fn sync(&self) -> Result<(), WastelandError>;

    async fn merge_branch(&self, name: &str) -> Result<(), WastelandError>;

    async fn delete_remote_branch(&self, name: &str) -> Result<(), WastelandError>;

    /// Human-readable multi-table diff versus main.
    async fn diff(&self, name: &str) -> Result<String, WastelandError>;

    /// Errors when wild-west mode is unsupported on this backend.
    fn can_wild_west(&self) -> Result<(), WastelandError>;
}
