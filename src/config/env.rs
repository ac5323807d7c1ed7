//! Dotenv layering.
//!
//! Precedence, low to high:
//!
//! 1. `.env`
//! 2. `.env.local`
//! 3. `.env.course`
//! 4. `.env.course.local`
//! 5. the process environment captured at startup
//!
//! The process environment is snapshotted once and never written back, so a
//! value loaded from a file can never masquerade as an explicit override on
//! the next reload.

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::debug;
use crate::source::{ContentSource, DEFAULT_CONTENT_SOURCE, SourceError};

/// Env files in precedence order (later wins).
pub const ENV_FILES: [&str; 4] = [".env", ".env.local", ".env.course", ".env.course.local"];

/// Content source descriptor (`github:owner/repo#ref` or a local path).
pub const CONTENT_SOURCE_KEY: &str = "COURSE_CONTENT_SOURCE";
/// Local content directory; wins over `COURSE_CONTENT_SOURCE`.
pub const CONTENT_DIR_KEY: &str = "COURSE_CONTENT_DIR";
/// Child dev server selector (`stub` or `next`).
pub const DEV_INNER_KEY: &str = "COURSE_DOCS_SITE_DEV_INNER";
/// Revision token injected into the child dev server.
pub const DEV_REVISION_KEY: &str = "COURSE_DOCS_SITE_DEV_REVISION";

/// Process environment captured at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: FxHashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment (non-UTF-8 entries are skipped).
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    #[cfg(test)]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

/// Effective key/value configuration of a working tree.
#[derive(Debug, Clone, Default)]
pub struct EnvLayers {
    values: FxHashMap<String, String>,
}

impl EnvLayers {
    /// Read the env files under `root` and overlay the process snapshot.
    pub fn load(root: &Path, process: &EnvSnapshot) -> Self {
        let mut values = FxHashMap::default();
        for name in ENV_FILES {
            values.extend(read_env_file(&root.join(name)));
        }
        values.extend(process.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { values }
    }

    /// Trimmed, non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The fields that decide which content source is active.
    pub fn content_selection(&self) -> ContentSelection {
        ContentSelection {
            source: self.get(CONTENT_SOURCE_KEY).map(str::to_string),
            dir: self.get(CONTENT_DIR_KEY).map(str::to_string),
        }
    }
}

/// Source-relevant configuration, compared by the watcher between reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSelection {
    pub source: Option<String>,
    pub dir: Option<String>,
}

impl ContentSelection {
    /// Resolve to a content source.
    ///
    /// `COURSE_CONTENT_DIR` always names a local directory, whatever its shape.
    pub fn resolve(&self) -> Result<ContentSource, SourceError> {
        if let Some(dir) = &self.dir {
            return Ok(ContentSource::Local { dir: dir.clone() });
        }
        ContentSource::parse(self.source.as_deref().unwrap_or(DEFAULT_CONTENT_SOURCE))
    }
}

/// Parse one dotenv file. Missing or malformed files contribute nothing.
fn read_env_file(path: &Path) -> FxHashMap<String, String> {
    if !path.is_file() {
        return FxHashMap::default();
    }

    let parsed = dotenvy::from_path_iter(path)
        .and_then(|iter| iter.collect::<Result<FxHashMap<_, _>, _>>());

    match parsed {
        Ok(values) => values,
        Err(e) => {
            debug!("env"; "ignoring {}: {}", path.display(), e);
            FxHashMap::default()
        }
    }
}
