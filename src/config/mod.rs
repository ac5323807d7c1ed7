//! Working-tree layout and dotenv configuration.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── env.rs    # dotenv layering (EnvLayers, EnvSnapshot, ContentSelection)
//! └── mod.rs    # Workspace paths (this file)
//! ```
//!
//! # Layout
//!
//! | Path                                | Owner                          |
//! |-------------------------------------|--------------------------------|
//! | `content/`                          | synchronizer (materialized)    |
//! | `public/`                           | synchronizer (materialized)    |
//! | `site.config.ts`                    | synchronizer (copied)          |
//! | `.next/`                            | child dev server build cache   |
//! | `.course-content/repo/`             | shallow clone of remote source |
//! | `.course-content/active-source.txt` | last synchronized identity     |

mod env;

pub use env::{
    ContentSelection, DEV_INNER_KEY, DEV_REVISION_KEY, ENV_FILES, EnvLayers, EnvSnapshot,
};

use std::path::{Path, PathBuf};

/// Materialized content directory name.
pub const CONTENT_DIR: &str = "content";
/// Materialized static assets directory name.
pub const PUBLIC_DIR: &str = "public";
/// Site configuration file consumed by the docs framework.
pub const SITE_CONFIG_FILE: &str = "site.config.ts";
/// Build cache of the child dev server.
pub const BUILD_CACHE_DIR: &str = ".next";
/// Scratch directory for synchronizer state.
pub const WORK_DIR: &str = ".course-content";

/// Paths of a course-docs working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    /// Base URL remote sources are cloned from.
    git_base: String,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            git_base: crate::sync::DEFAULT_GIT_BASE.to_string(),
        }
    }

    /// Clone remote sources from another host.
    #[cfg(test)]
    pub fn with_git_base(mut self, base: impl Into<String>) -> Self {
        self.git_base = base.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git_base(&self) -> &str {
        &self.git_base
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(CONTENT_DIR)
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join(PUBLIC_DIR)
    }

    pub fn site_config(&self) -> PathBuf {
        self.root.join(SITE_CONFIG_FILE)
    }

    pub fn build_cache(&self) -> PathBuf {
        self.root.join(BUILD_CACHE_DIR)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR)
    }

    pub fn clone_dir(&self) -> PathBuf {
        self.work_dir().join("repo")
    }

    pub fn state_file(&self) -> PathBuf {
        self.work_dir().join("active-source.txt")
    }
}
