//! Content synchronization.
//!
//! Materializes a course's `content/`, `public/` and `site.config.ts` into
//! the working tree:
//!
//! ```text
//! resolve source root ─► identity ─► invalidate .next on switch ─► persist identity
//!        │
//!        └─► verify required paths ─► content/ ─► site.config.ts ─► public/
//! ```
//!
//! Local sources are linked (copy fallback), remote sources are shallow-cloned
//! and copied. The destination trees are always replaced wholesale.

mod error;
mod fetch;


pub use error::SyncError;
pub use fetch::DEFAULT_GIT_BASE;

use std::path::{Path, PathBuf};

use crate::config::{CONTENT_DIR, PUBLIC_DIR, SITE_CONFIG_FILE, Workspace};
use crate::source::{ContentSource, SourceIdentity};
use crate::utils::fs::{self as ufs, CopyFilter};
use crate::{debug, log, warn};

/// Search index build output, never copied from a source.
pub const SEARCH_INDEX_DIR: &str = "_pagefind";
/// Student submissions under `public/`, served by a separate route.
pub const STUDENT_WORKS_DIR: &str = "student-works";
/// Marker file written into materialized directories.
pub const KEEP_FILE: &str = ".keep";

const COPY_FILTER: CopyFilter = CopyFilter {
    skip_everywhere: &[SEARCH_INDEX_DIR],
    skip_in_dir: Some((PUBLIC_DIR, &[STUDENT_WORKS_DIR])),
};

/// Result of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub identity: SourceIdentity,
    /// The previous sync used a different source (build cache was cleared).
    pub switched: bool,
}

/// Synchronize `source` into `workspace`. Safe to call repeatedly.
pub fn sync_content(workspace: &Workspace, source: &ContentSource) -> Result<SyncOutcome, SyncError> {
    let source_root = resolve_source_root(workspace, source)?;
    let identity = source.identity(workspace.root());
    debug!("sync"; "source root {}", source_root.display());

    let switched = invalidate_on_switch(workspace, &identity)?;
    persist_identity(workspace, &identity)?;

    verify_required(&source_root)?;

    let linkable = source.is_local();

    let content_to = workspace.content_dir();
    mirror_dir(&source_root.join(CONTENT_DIR), &content_to, linkable, CONTENT_DIR)?;
    ufs::ensure_dir_with_marker(&content_to, KEEP_FILE).map_err(|e| SyncError::io(&content_to, e))?;

    let site_config_to = workspace.site_config();
    ufs::copy_file(&source_root.join(SITE_CONFIG_FILE), &site_config_to)
        .map_err(|e| SyncError::io(&site_config_to, e))?;

    let public_from = source_root.join(PUBLIC_DIR);
    if public_from.exists() {
        let public_to = workspace.public_dir();
        mirror_dir(&public_from, &public_to, linkable, PUBLIC_DIR)?;
        ufs::ensure_dir_with_marker(&public_to, KEEP_FILE).map_err(|e| SyncError::io(&public_to, e))?;
    }

    log!("sync"; "materialized {}", source);
    Ok(SyncOutcome { identity, switched })
}

/// Where the files of `source` live on disk, fetching remote sources first.
fn resolve_source_root(workspace: &Workspace, source: &ContentSource) -> Result<PathBuf, SyncError> {
    match source {
        ContentSource::Local { .. } => {
            let root = source
                .local_root(workspace.root())
                .unwrap_or_else(|| workspace.root().to_path_buf());
            if !root.is_dir() {
                return Err(SyncError::SourceUnavailable(root));
            }
            Ok(root)
        }
        ContentSource::Remote { repo, git_ref } => {
            let clone_dir = workspace.clone_dir();
            fetch::clone_shallow(workspace.git_base(), repo, git_ref, &clone_dir)?;
            Ok(clone_dir)
        }
    }
}

/// Clear the build cache when the identity differs from the persisted one.
fn invalidate_on_switch(workspace: &Workspace, identity: &SourceIdentity) -> Result<bool, SyncError> {
    let previous = SourceIdentity::from_persisted(&ufs::read_text_if_exists(&workspace.state_file()));
    let switched = previous.as_ref().is_some_and(|prev| prev != identity);

    if switched {
        let cache = workspace.build_cache();
        log!("sync"; "content source changed, clearing {}", cache.display());
        ufs::remove_path(&cache).map_err(|e| SyncError::io(&cache, e))?;
    }
    Ok(switched)
}

fn persist_identity(workspace: &Workspace, identity: &SourceIdentity) -> Result<(), SyncError> {
    let state_file = workspace.state_file();
    ufs::write_text_file(&state_file, identity.as_str()).map_err(|e| SyncError::io(&state_file, e))
}

fn verify_required(source_root: &Path) -> Result<(), SyncError> {
    for (label, rel) in [(CONTENT_DIR, CONTENT_DIR), (SITE_CONFIG_FILE, SITE_CONFIG_FILE)] {
        let path = source_root.join(rel);
        if !path.exists() {
            return Err(SyncError::MissingContent { label, path });
        }
    }
    Ok(())
}

/// Replace `to` with a link to (or a copy of) `from`.
fn mirror_dir(from: &Path, to: &Path, linkable: bool, label: &str) -> Result<(), SyncError> {
    ufs::remove_path(to).map_err(|e| SyncError::io(to, e))?;

    if linkable {
        match ufs::link_dir(from, to) {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!("sync"; "failed to link {} directory, falling back to copy ({})", label, e);
                ufs::remove_path(to).map_err(|e| SyncError::io(to, e))?;
            }
        }
    }

    ufs::copy_dir(from, to, COPY_FILTER).map_err(|e| SyncError::io(to, e))
}
