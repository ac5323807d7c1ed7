//! Synchronization error types.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::source::SourceError;

/// Content synchronization errors. All of them are fatal to the daemon.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] SourceError),

    #[error("content source points to a non-directory path: {}", .0.display())]
    SourceUnavailable(PathBuf),

    #[error("missing required path in content source: {label} ({})", .path.display())]
    MissingContent { label: &'static str, path: PathBuf },

    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        code: Option<i32>,
        #[source]
        source: crate::utils::exec::CmdError,
    },

    #[error("a content sync is already running")]
    InProgress,

    #[error("IO error at `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
}

impl SyncError {
    pub(super) fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io(path.to_path_buf(), err)
    }

    /// Exit code the daemon propagates for this failure.
    ///
    /// Fetch failures keep git's own exit code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fetch { code: Some(code), .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::exec::CmdError;

    #[test]
    fn test_exit_codes() {
        let fetch = SyncError::Fetch {
            url: "https://github.com/a/b.git".into(),
            code: Some(128),
            source: CmdError::Failed {
                program: "git".into(),
                status: "exit status: 128".into(),
                code: Some(128),
                detail: String::new(),
            },
        };
        assert_eq!(fetch.exit_code(), 128);

        let missing = SyncError::MissingContent {
            label: "content",
            path: PathBuf::from("/src/content"),
        };
        assert_eq!(missing.exit_code(), 1);
        assert!(missing.to_string().contains("content"));

        let config = SyncError::from(SourceError::Empty);
        assert_eq!(config.exit_code(), 1);
    }
}
