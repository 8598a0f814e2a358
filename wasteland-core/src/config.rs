//! Per-wasteland config persistence (C-ambient, §3, §6): one JSON file under
//! `wasteland/wastelands/{upstreamOrg}/{upstreamDB}.json`, located via the
//! XDG base-directory spec with the usual platform fallbacks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::WastelandError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    WildWest,
    Pr,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::WildWest => "wild-west",
            Mode::Pr => "pr",
        }
    }
}

/// Persisted entry for one joined wasteland (§3 `Config`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub upstream: String,
    pub fork_org: String,
    pub fork_db: String,
    pub local_dir: String,
    pub rig_handle: String,
    pub mode: Mode,
    pub signing: bool,
    pub provider_type: String,
    pub upstream_url: String,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl Config {
    /// Splits `upstream` (`"org/db"`) into its two path segments.
    pub fn upstream_parts(&self) -> Option<(&str, &str)> {
        self.upstream.split_once('/')
    }
}

/// Resolves the base config directory following the XDG base-directory spec,
/// with fallbacks for platforms that don't export `XDG_CONFIG_HOME`.
pub fn base_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join(".config"));
        }
    }

    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join("AppData").join("Roaming"));
        }
    }

    None
}

/// Resolves the base data directory (`XDG_DATA_HOME`, falling back the same
/// way as `base_config_dir`). Not currently written to by this crate, but
/// exposed for the CLI to place per-wasteland scratch/log data under.
pub fn base_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join(".local").join("share"));
        }
    }

    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join("AppData").join("Local"));
        }
    }

    None
}

/// Reads and writes the `wasteland/wastelands/{org}/{db}.json` config tree
/// rooted at a resolved (or explicitly overridden) base config directory.
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Uses `base_config_dir()` joined with `wasteland/wastelands`.
    pub fn from_env() -> Result<Self, WastelandError> {
        let base = base_config_dir()
            .ok_or_else(|| WastelandError::backend("resolve config dir", "no XDG_CONFIG_HOME, HOME, or USERPROFILE set"))?;
        Ok(ConfigStore {
            root: base.join("wasteland").join("wastelands"),
        })
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        ConfigStore { root: root.into() }
    }

    fn path_for(&self, upstream_org: &str, upstream_db: &str) -> PathBuf {
        self.root.join(upstream_org).join(format!("{upstream_db}.json"))
    }

    /// Loads the config for `"{org}/{db}"`; `Ok(None)` when no file exists.
    pub fn load(&self, upstream: &str) -> Result<Option<Config>, WastelandError> {
        let (org, db) = upstream
            .split_once('/')
            .ok_or_else(|| WastelandError::validation(format!("invalid upstream {upstream:?}, expected org/db")))?;
        let path = self.path_for(org, db);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(Some(config))
    }

    pub fn save(&self, config: &Config) -> Result<(), WastelandError> {
        let (org, db) = config
            .upstream_parts()
            .ok_or_else(|| WastelandError::validation(format!("invalid upstream {:?}, expected org/db", config.upstream)))?;
        let path = self.path_for(org, db);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(config)?;
        std::fs::write(&path, serialized)?;
        Ok(())
    }

    /// Removes the config file for `"{org}/{db}"`; a no-op if already absent.
    pub fn delete(&self, upstream: &str) -> Result<(), WastelandError> {
        let (org, db) = upstream
            .split_once('/')
            .ok_or_else(|| WastelandError::validation(format!("invalid upstream {upstream:?}, expected org/db")))?;
        let path = self.path_for(org, db);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WastelandError::from(e)),
        }
    }

    /// Lists every joined wasteland as `(org, db)` pairs, sorted.
    pub fn list_joined(&self) -> Result<Vec<(String, String)>, WastelandError> {
        let mut joined = Vec::new();
        if !self.root.is_dir() {
            return Ok(joined);
        }
        for org_entry in std::fs::read_dir(&self.root)? {
            let org_entry = org_entry?;
            if !org_entry.file_type()?.is_dir() {
                continue;
            }
            let org = org_entry.file_name().to_string_lossy().into_owned();
            for db_entry in std::fs::read_dir(org_entry.path())? {
                let db_entry = db_entry?;
                let name = db_entry.file_name().to_string_lossy().into_owned();
                if let Some(db) = name.strip_suffix(".json") {
                    joined.push((org.clone(), db.to_string()));
                }
            }
        }
        joined.sort();
        Ok(joined)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// §4.8's `ResolveConfig`: explicit selection wins; with none given, exactly
/// one joined wasteland auto-selects; zero is `NotJoined`, more than one
/// without an explicit choice is `Ambiguous`.
pub fn resolve(store: &ConfigStore, explicit: Option<&str>) -> Result<Config, WastelandError> {
    if let Some(upstream) = explicit {
        return store
            .load(upstream)?
            .ok_or_else(|| WastelandError::NotJoined(upstream.to_string()));
    }

    let joined = store.list_joined()?;
    match joined.len() {
        0 => Err(WastelandError::NotJoined("no wasteland joined".to_string())),
        1 => {
            let (org, db) = &joined[0];
            let upstream = format!("{org}/{db}");
            store
                .load(&upstream)?
                .ok_or_else(|| WastelandError::NotJoined(upstream.clone()))
        }
        _ => {
            let names = joined
                .iter()
                .map(|(org, db)| format!("{org}/{db}"))
                .collect::<Vec<_>>()
                .join(", ");
            Err(WastelandError::Ambiguous(format!(
                "multiple wastelands joined ({names}); specify one explicitly"
            )))
        }
    }
}
