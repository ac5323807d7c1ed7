//! Filesystem primitives for materializing a content tree.
//!
//! - `remove_path` unlinks symlinks instead of following them
//! - `link_dir` creates a directory symlink
//! - `copy_dir` copies a tree, honoring a `CopyFilter`
//!
//! Removal is best-effort in the sense that a path which is already gone is
//! not an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name-based exclusions for `copy_dir`.
#[derive(Debug, Clone, Copy)]
pub struct CopyFilter {
    /// Skipped at every depth.
    pub skip_everywhere: &'static [&'static str],
    /// Skipped only directly inside a destination directory with this name.
    pub skip_in_dir: Option<(&'static str, &'static [&'static str])>,
}

impl CopyFilter {
    fn excludes(&self, name: &str, dest_parent: &Path) -> bool {
        if self.skip_everywhere.contains(&name) {
            return true;
        }
        match self.skip_in_dir {
            Some((dir_name, names)) => {
                dest_parent.file_name().is_some_and(|n| n == dir_name) && names.contains(&name)
            }
            None => false,
        }
    }
}

/// Remove a file, directory tree, or symlink. Missing paths are fine.
///
/// A symlink (or junction) is unlinked; its target is left untouched.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if meta.file_type().is_symlink() {
        // Windows directory links need remove_dir
        fs::remove_file(path).or_else(|_| fs::remove_dir(path))
    } else if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Replace `link` with a directory symlink pointing at `target`.
pub fn link_dir(target: &Path, link: &Path) -> io::Result<()> {
    remove_path(link)?;
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_dir(target, link)
    }
}

/// Recursively copy `from` into `to`, creating directories as needed.
pub fn copy_dir(from: &Path, to: &Path, filter: CopyFilter) -> io::Result<()> {
    fs::create_dir_all(to)?;

    let root = from.to_path_buf();
    let dest_root = to.to_path_buf();
    let walker = jwalk::WalkDir::new(from)
        .skip_hidden(false)
        .follow_links(true)
        .sort(true)
        .process_read_dir(move |_depth, dir, _state, children| {
            let dest_parent = dest_path(&root, &dest_root, dir);
            children.retain(|entry| match entry {
                Ok(entry) => !filter.excludes(&entry.file_name.to_string_lossy(), &dest_parent),
                Err(_) => true,
            });
        });

    for entry in walker {
        let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
        let src = entry.path();
        let dst = dest_path(from, to, &src);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst)?;
        } else {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dst)?;
        }
    }
    Ok(())
}

/// Copy a single file, creating the destination's parent directory.
///
/// The destination is always a regular file, even when `from` is a symlink.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    remove_path(to)?;
    fs::copy(from, to).map(|_| ())
}

/// Read a file as trimmed text; unreadable files read as empty.
pub fn read_text_if_exists(path: &Path) -> String {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Write a text file, creating parent directories.
pub fn write_text_file(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)
}

/// Make sure `dir` exists and, when it is a real directory, holds a marker file.
///
/// Symlinked directories are left alone so the marker never lands in the
/// linked source.
pub fn ensure_dir_with_marker(dir: &Path, marker: &str) -> io::Result<()> {
    if fs::symlink_metadata(dir).is_ok_and(|m| m.file_type().is_symlink()) {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    fs::write(dir.join(marker), "")
}

/// Map `path` (inside `from`) to the matching path inside `to`.
fn dest_path(from: &Path, to: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(from) {
        Ok(rel) => to.join(rel),
        Err(_) => to.to_path_buf(),
    }
}
