//! Content source descriptors.
//!
//! A course's content comes either from a local directory or from a GitHub
//! repository at a given ref:
//!
//! ```text
//! ../javascript-course-docs            -> Local
//! C:\work\course                       -> Local
//! github:metyatech/course-docs#master  -> Remote { repo, git_ref: "master" }
//! github:metyatech/course-docs         -> Remote { repo, git_ref: "main" }
//! ```
//!
//! Parsing is pure; resolving a local path against the working tree happens
//! later, when the identity is derived.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Prefix of remote descriptors.
pub const GITHUB_PREFIX: &str = "github:";

/// Ref used when a remote descriptor omits `#ref`.
pub const DEFAULT_GITHUB_REF: &str = "main";

/// Source used when neither `COURSE_CONTENT_DIR` nor `COURSE_CONTENT_SOURCE` is set.
pub const DEFAULT_CONTENT_SOURCE: &str = "github:metyatech/javascript-course-docs#master";

/// Invalid content source descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("content source must not be empty")]
    Empty,

    #[error("invalid content source \"{0}\": use \"github:owner/repo#ref\" or a local path")]
    Invalid(String),

    #[error("invalid GitHub source \"{0}\": expected format github:owner/repo#ref")]
    InvalidRemote(String),
}

/// Where course content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// A directory on disk, kept exactly as written (may be relative).
    Local { dir: String },
    /// A GitHub repository (`owner/name`) at a branch or tag.
    Remote { repo: String, git_ref: String },
}

impl ContentSource {
    /// Parse a descriptor string.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(SourceError::Empty);
        }

        if is_local_path_like(value) {
            return Ok(Self::Local {
                dir: value.to_string(),
            });
        }

        let Some(rest) = value.strip_prefix(GITHUB_PREFIX) else {
            return Err(SourceError::Invalid(value.to_string()));
        };

        let (repo, git_ref) = match rest.trim().split_once('#') {
            Some((repo, git_ref)) => (repo.trim(), git_ref.trim()),
            None => (rest.trim(), ""),
        };

        if repo.is_empty() || !repo.contains('/') {
            return Err(SourceError::InvalidRemote(value.to_string()));
        }

        let git_ref = if git_ref.is_empty() {
            DEFAULT_GITHUB_REF
        } else {
            git_ref
        };

        Ok(Self::Remote {
            repo: repo.to_string(),
            git_ref: git_ref.to_string(),
        })
    }

    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// Absolute directory of a local source, resolved against `base`.
    ///
    /// Returns `None` for remote sources.
    pub fn local_root(&self, base: &Path) -> Option<PathBuf> {
        match self {
            Self::Local { dir } => Some(absolutize(base, Path::new(dir))),
            Self::Remote { .. } => None,
        }
    }

    /// Identity used to detect source switches between syncs.
    pub fn identity(&self, base: &Path) -> SourceIdentity {
        match self {
            Self::Local { dir } => {
                let root = absolutize(base, Path::new(dir));
                SourceIdentity(format!("dir:{}", root.display()))
            }
            Self::Remote { repo, git_ref } => SourceIdentity(format!("repo:{repo}#{git_ref}")),
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { dir } => f.write_str(dir),
            Self::Remote { repo, git_ref } => write!(f, "{GITHUB_PREFIX}{repo}#{git_ref}"),
        }
    }
}

impl FromStr for ContentSource {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalized, comparable name of a content source.
///
/// `dir:<absolute path>` or `repo:<owner/name>#<ref>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceIdentity(String);

impl SourceIdentity {
    /// Wrap a previously persisted identity.
    pub fn from_persisted(text: &str) -> Option<Self> {
        let text = text.trim();
        (!text.is_empty()).then(|| Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `.`, `/`, `\` or a drive letter (`C:\`, `d:/`).
fn is_local_path_like(value: &str) -> bool {
    if value.starts_with(['.', '/', '\\']) {
        return true;
    }
    let bytes = value.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

/// Join `path` onto `base` when relative and fold `.`/`..` lexically.
///
/// The directory does not need to exist, so `canonicalize` is not an option.
fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_round_trip() {
        for raw in [
            "github:metyatech/javascript-course-docs#master",
            "github:owner/repo#v1.2.0",
            "github:owner/repo#feature/x",
        ] {
            let source = ContentSource::parse(raw).unwrap();
            assert_eq!(source.to_string(), raw);
        }
    }

    #[test]
    fn test_remote_default_ref() {
        let source = ContentSource::parse("github:owner/repo").unwrap();
        assert_eq!(
            source,
            ContentSource::Remote {
                repo: "owner/repo".into(),
                git_ref: DEFAULT_GITHUB_REF.into(),
            }
        );

        let source = ContentSource::parse("github:owner/repo#  ").unwrap();
        assert_eq!(source.to_string(), "github:owner/repo#main");
    }

    #[test]
    fn test_remote_trims_parts() {
        let source = ContentSource::parse("  github: owner/repo # dev ").unwrap();
        assert_eq!(source.to_string(), "github:owner/repo#dev");
    }

    #[test]
    fn test_local_variants_keep_input() {
        for raw in ["./course", "../course", ".", "/abs/course", "\\\\server\\share", "C:\\course", "d:/course"] {
            assert_eq!(
                ContentSource::parse(raw).unwrap(),
                ContentSource::Local { dir: raw.into() },
                "{raw}"
            );
        }
    }

    #[test]
    fn test_invalid_descriptors() {
        assert_eq!(ContentSource::parse("   "), Err(SourceError::Empty));
        assert!(matches!(
            ContentSource::parse("course-docs"),
            Err(SourceError::Invalid(_))
        ));
        assert!(matches!(
            ContentSource::parse("gitlab:owner/repo"),
            Err(SourceError::Invalid(_))
        ));
        assert!(matches!(
            ContentSource::parse("C:course"),
            Err(SourceError::Invalid(_))
        ));
        assert!(matches!(
            ContentSource::parse("github:repo-only#main"),
            Err(SourceError::InvalidRemote(_))
        ));
        assert!(matches!(
            ContentSource::parse("github:#main"),
            Err(SourceError::InvalidRemote(_))
        ));
    }

    #[test]
    fn test_invalid_message_names_formats() {
        let err = ContentSource::parse("nope").unwrap_err().to_string();
        assert!(err.contains("github:owner/repo#ref"));
        assert!(err.contains("local path"));
    }

    #[cfg(unix)]
    #[test]
    fn test_identity() {
        let base = Path::new("/work/site");
        let local = ContentSource::parse("../course-a/./").unwrap();
        assert_eq!(local.identity(base).as_str(), "dir:/work/course-a");

        let remote = ContentSource::parse("github:owner/repo").unwrap();
        assert_eq!(remote.identity(base).as_str(), "repo:owner/repo#main");
        assert_eq!(remote.local_root(base), None);
    }

    #[test]
    fn test_persisted_identity() {
        assert_eq!(SourceIdentity::from_persisted("  \n"), None);
        assert_eq!(
            SourceIdentity::from_persisted("repo:a/b#main\n").unwrap().as_str(),
            "repo:a/b#main"
        );
    }
}
