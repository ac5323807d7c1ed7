//! URL routing and filesystem lookups.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use super::revision::{RELOAD_SCRIPT_PATH, REVISION_PATH, STREAM_PATH};

pub const HEALTH_PATH: &str = "/healthz";

/// Doc index files, in lookup order.
const DOC_INDEX_FILES: [&str; 2] = ["index.mdx", "index.md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Health,
    /// `/docs/<slug>/` (trailing slash required)
    Doc(&'a str),
    Revision,
    RevisionStream,
    ReloadScript,
    /// Anything else, looked up under `public/`
    Static(&'a str),
}

impl<'a> Route<'a> {
    /// Route a request URL (query string ignored).
    pub fn from_url(url: &'a str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        match path {
            HEALTH_PATH => Self::Health,
            REVISION_PATH => Self::Revision,
            STREAM_PATH => Self::RevisionStream,
            RELOAD_SCRIPT_PATH => Self::ReloadScript,
            _ => match doc_slug(path) {
                Some(slug) => Self::Doc(slug),
                None => Self::Static(path),
            },
        }
    }
}

fn doc_slug(path: &str) -> Option<&str> {
    let slug = path.strip_prefix("/docs/")?.strip_suffix('/')?;
    (!slug.is_empty() && !slug.contains('/')).then_some(slug)
}

/// Whether `content/docs/<slug>/` holds an index page.
pub fn has_doc(docs_root: &Path, slug: &str) -> bool {
    if slug == "." || slug == ".." || slug.contains('\\') {
        return false;
    }
    let dir = docs_root.join(slug);
    dir.is_dir() && DOC_INDEX_FILES.iter().any(|name| dir.join(name).is_file())
}

/// Resolve a URL path to a file under `public_root`, or `None`.
///
/// Directories resolve to their `index.html`. The result never escapes the
/// root, not even through symlinks.
pub fn resolve_static(path: &str, public_root: &Path) -> Option<PathBuf> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let relative = decoded.trim_matches('/');
    if relative.split(['/', '\\']).any(|part| part == "..") {
        return None;
    }

    let root = public_root.canonicalize().ok()?;
    let target = root.join(relative).canonicalize().ok()?;
    if !target.starts_with(&root) {
        return None;
    }

    if target.is_file() {
        return Some(target);
    }
    let index = target.join("index.html");
    index.is_file().then_some(index)
}
