//! Filesystem helpers for staging directories and snapshots.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use super::errors::CacheError;

/// Updates the modification time of `path` to now.
pub(crate) fn touch(path: &Path) -> Result<(), CacheError> {
    filetime::set_file_mtime(path, FileTime::now()).map_err(|error| CacheError::storage(path, error))
}

/// Recursively copies `source` to `destination`.
///
/// A missing `source` yields an empty `destination`. Entries removed while
/// the walk is in progress are skipped.
pub(crate) fn copy_tree(source: &Path, destination: &Path) -> Result<(), CacheError> {
    fs::create_dir_all(destination).map_err(|error| CacheError::storage(destination, error))?;
    if !source.exists() {
        return Ok(());
    }

    for entry in WalkDir::new(source).follow_links(true).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if vanished(error.io_error()) => continue,
            Err(error) => {
                let path = error.path().unwrap_or(source).to_path_buf();
                return Err(CacheError::storage(path, error.into()));
            }
        };
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|error| CacheError::storage(entry.path(), io::Error::other(error)))?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|error| CacheError::storage(&target, error))?;
        } else {
            match fs::copy(entry.path(), &target) {
                Ok(_) => {}
                Err(error) if vanished(Some(&error)) => {}
                Err(error) => return Err(CacheError::storage(&target, error)),
            }
        }
    }
    Ok(())
}

fn vanished(error: Option<&io::Error>) -> bool {
    error.is_some_and(|error| error.kind() == io::ErrorKind::NotFound)
}

/// Joins a server-provided relative path onto `root`, refusing any path
/// that would land outside it.
pub(crate) fn contained_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}
