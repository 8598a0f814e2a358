//! Error taxonomy (§7): Validation, Precondition, NotFound/NothingToCommit,
//! Ambiguous/NotJoined, Backend, PartialSuccess. Each variant renders a
//! single-line message prefixed with the failing operation, matching the
//! hand-rolled `Display`-based error enums this crate's lineage favors over
//! `thiserror`/`anyhow`.

use std::fmt;

#[derive(Debug)]
pub enum WastelandError {
    /// Empty or malformed input; returned before any side effect.
    Validation(String),
    /// The lifecycle state machine or a permission rule rejected the action.
    Precondition(String),
    /// The backend's predicate-guarded write matched zero rows.
    NothingToCommit(String),
    /// No config resolves the request, or more than one does.
    NotJoined(String),
    Ambiguous(String),
    /// Network, timeout, parse, or policy failure from a backend or provider.
    Backend(String),
    /// A local commit succeeded but a subsequent push failed. The commit is
    /// durable; `hint` describes how the caller can recover.
    PartialSuccess { message: String, hint: String },
}

impl WastelandError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WastelandError::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        WastelandError::Precondition(msg.into())
    }

    pub fn nothing_to_commit(msg: impl Into<String>) -> Self {
        WastelandError::NothingToCommit(msg.into())
    }

    pub fn backend(op: &str, msg: impl fmt::Display) -> Self {
        WastelandError::Backend(format!("{op}: {msg}"))
    }

    pub fn partial_success(message: impl Into<String>, hint: impl Into<String>) -> Self {
        WastelandError::PartialSuccess {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// `true` for the subset of errors §5 allows the caller to blindly retry.
    pub fn is_partial_success(&self) -> bool {
        matches!(self, WastelandError::PartialSuccess { .. })
    }
}

impl fmt::Display for WastelandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WastelandError::Validation(msg) => write!(f, "invalid input: {msg}"),
            WastelandError::Precondition(msg) => write!(f, "{msg}"),
            WastelandError::NothingToCommit(msg) => write!(f, "{msg}"),
            WastelandError::NotJoined(msg) => write!(f, "not joined: {msg}"),
            WastelandError::Ambiguous(msg) => write!(f, "ambiguous: {msg}"),
            WastelandError::Backend(msg) => write!(f, "backend error: {msg}"),
            WastelandError::PartialSuccess { message, hint } => {
                write!(f, "{message} (hint: {hint})")
            }
        }
    }
}

impl std::error::Error for WastelandError {}

impl From<std::io::Error> for WastelandError {
    fn from(err: std::io::Error) -> Self {
        WastelandError::Backend(format!("io: {err}"))
    }
}

impl From<serde_json::Error> for WastelandError {
    fn from(err: serde_json::Error) -> Self {
        WastelandError::Backend(format!("json: {err}"))
    }
}

impl From<reqwest::Error> for WastelandError {
    fn from(err: reqwest::Error) -> Self {
        WastelandError::Backend(format!("http: {err}"))
    }
}
