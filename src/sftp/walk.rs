//! Local directory walk with name-based pruning
//!
//! Shared by the size estimate and the upload so both see exactly the same
//! set of files. Excluded directories are pruned before descent.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::path_utils::local_basename;

/// One step of a pruned walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEntry {
    /// A directory to mirror; always yielded before anything inside it
    Dir(PathBuf),
    /// A regular file (or a symlink resolving to one)
    File(PathBuf),
    /// A file or directory skipped by name; directories are not descended
    Excluded { path: PathBuf, is_dir: bool },
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        match self {
            WalkEntry::Dir(p) | WalkEntry::File(p) => p,
            WalkEntry::Excluded { path, .. } => path,
        }
    }
}

/// Excluded entry covering a top-level selection, if any.
///
/// Every component of `path` below `common_root` is matched, nearest the root
/// first, so a selected file inside an excluded folder is skipped the same way
/// the walk would skip it. A selection equal to the common root is matched by
/// its own name.
pub fn excluded_entry(
    path: &Path,
    common_root: &Path,
    exclusions: &BTreeSet<String>,
) -> Option<PathBuf> {
    if exclusions.is_empty() {
        return None;
    }

    if let Ok(relative) = path.strip_prefix(common_root) {
        let mut current = common_root.to_path_buf();
        for component in relative.components() {
            current.push(component);
            if let Component::Normal(name) = component {
                if exclusions.contains(name.to_string_lossy().as_ref()) {
                    return Some(current);
                }
            }
        }
    }

    exclusions
        .contains(&local_basename(path))
        .then(|| path.to_path_buf())
}

/// Lazy pre-order walk of one selected directory.
///
/// The root itself is never excluded here: top-level selections are checked
/// by the caller. Symlinks are not followed into directories; a symlink to a
/// directory is skipped.
pub struct SelectionWalker<'a> {
    inner: walkdir::IntoIter,
    exclusions: &'a BTreeSet<String>,
}

impl<'a> SelectionWalker<'a> {
    pub fn new(root: &Path, exclusions: &'a BTreeSet<String>) -> Self {
        Self {
            inner: WalkDir::new(root).sort_by_file_name().into_iter(),
            exclusions,
        }
    }
}

impl Iterator for SelectionWalker<'_> {
    type Item = Result<WalkEntry, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };

            let file_type = entry.file_type();
            let excluded = entry.depth() > 0
                && self
                    .exclusions
                    .contains(entry.file_name().to_string_lossy().as_ref());

            if excluded {
                if file_type.is_dir() {
                    self.inner.skip_current_dir();
                }
                return Some(Ok(WalkEntry::Excluded {
                    path: entry.into_path(),
                    is_dir: file_type.is_dir(),
                }));
            }

            if file_type.is_dir() {
                return Some(Ok(WalkEntry::Dir(entry.into_path())));
            }

            if file_type.is_symlink() && !entry.path().is_file() {
                continue;
            }

            return Some(Ok(WalkEntry::File(entry.into_path())));
        }
    }
}
