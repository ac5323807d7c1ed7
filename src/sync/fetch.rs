//! Shallow clone of remote sources.
//!
//! git is an external collaborator: the only contract is
//! `git clone --depth 1 --branch <ref> <url> <dir>` succeeding or failing.

use std::path::Path;

use super::SyncError;
use crate::log;
use crate::utils::exec::{Cmd, FilterRule};
use crate::utils::fs::remove_path;

/// Host remote `owner/name` repositories are cloned from.
pub const DEFAULT_GIT_BASE: &str = "https://github.com";

/// Progress chatter git prints on stderr even on success.
static GIT_FILTER: FilterRule = FilterRule::new(&["Cloning into", "remote:", "Receiving", "Resolving"]);

/// Clone URL for `repo` on `base`.
pub fn repository_url(base: &str, repo: &str) -> String {
    format!("{}/{}.git", base.trim_end_matches('/'), repo)
}

/// Replace `dest` with a fresh single-branch, depth-1 clone.
pub fn clone_shallow(base: &str, repo: &str, git_ref: &str, dest: &Path) -> Result<(), SyncError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    remove_path(dest).map_err(|e| SyncError::io(dest, e))?;

    let url = repository_url(base, repo);
    log!("sync"; "cloning {}#{}", url, git_ref);

    let git = which::which("git").unwrap_or_else(|_| "git".into());
    Cmd::new(git)
        .args(["clone", "--depth", "1", "--single-branch", "--branch", git_ref])
        .arg(&url)
        .arg(dest)
        .envs([("GIT_TERMINAL_PROMPT", "0")])
        .filter(&GIT_FILTER)
        .run()
        .map(|_| ())
        .map_err(|source| SyncError::Fetch {
            url,
            code: source.code(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_url() {
        assert_eq!(
            repository_url(DEFAULT_GIT_BASE, "metyatech/javascript-course-docs"),
            "https://github.com/metyatech/javascript-course-docs.git"
        );
        assert_eq!(repository_url("file:///srv/git/", "a/b"), "file:///srv/git/a/b.git");
    }
}
