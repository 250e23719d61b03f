//! Repository discovery.
//!
//! Expands a filesystem path into the set of git repositories it names. A
//! path is either a repository itself (its top level carries `.git`
//! metadata), a plain directory to scan, or a wildcard root whose last
//! component contains `**`. Scanning never descends into a repository it
//! has found, so no discovered path is ever nested inside another.

use std::path::{Path, PathBuf};

use crate::source::error::DiscoverError;

/// Marker in a path's last component that requests a recursive scan of the
/// parent directory.
pub const WILDCARD: &str = "**";

/// Whether a directory is a git repository: `.git` present at its top
/// level (a directory for working copies, a file for linked worktrees).
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Expand `path` into concrete repository directories.
///
/// The result is deterministic: entries are visited in name order, so
/// repeated runs over an unchanged tree discover the same paths in the
/// same order.
pub fn discover(path: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    let wildcard = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(WILDCARD));

    if wildcard {
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        require_dir(root)?;
        let mut found = Vec::new();
        scan(root, &mut found)?;
        return Ok(found);
    }

    require_dir(path)?;

    if is_repository(path) {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut found = Vec::new();
    scan(path, &mut found)?;
    Ok(found)
}

fn require_dir(path: &Path) -> Result<(), DiscoverError> {
    if !path.exists() {
        return Err(DiscoverError::PathNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(DiscoverError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Walk `dir`, yielding repositories and recursing into plain directories.
/// Entries whose name carries a dot marker (hidden or metadata directories
/// such as `.git` itself) are skipped outright.
fn scan(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), DiscoverError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DiscoverError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoverError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let skip = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_none_or(|name| name.contains('.'));
        if skip {
            continue;
        }
        dirs.push(path);
    }
    dirs.sort();

    for path in dirs {
        if is_repository(&path) {
            found.push(path);
        } else {
            scan(&path, found)?;
        }
    }

    Ok(())
}
