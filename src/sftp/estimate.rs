//! Dry-run size estimate of a local selection

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::path_utils::common_root;
use super::types::{LogLevel, TransferObserver};
use super::walk::{excluded_entry, SelectionWalker, WalkEntry};

/// Computes the byte total of a selection, honoring exclusions.
///
/// Unreadable entries are reported as warnings and skipped; the estimate is
/// advisory and never fails.
pub struct SizeEstimator<'a> {
    observer: &'a dyn TransferObserver,
}

impl<'a> SizeEstimator<'a> {
    pub fn new(observer: &'a dyn TransferObserver) -> Self {
        Self { observer }
    }

    pub fn estimate(&self, selected_paths: &[PathBuf], exclusions: &BTreeSet<String>) -> u64 {
        let Some(root) = common_root(selected_paths, Path::is_file) else {
            return 0;
        };
        let mut total = 0u64;

        for path in selected_paths {
            if excluded_entry(path, &root, exclusions).is_some() {
                continue;
            }

            if path.is_dir() {
                total += self.estimate_dir(path, exclusions);
            } else if let Some(size) = self.file_size(path) {
                total += size;
            }
        }

        debug!("Estimated {} bytes for {} selected paths", total, selected_paths.len());
        total
    }

    fn estimate_dir(&self, root: &Path, exclusions: &BTreeSet<String>) -> u64 {
        let mut total = 0u64;
        for entry in SelectionWalker::new(root, exclusions) {
            match entry {
                Ok(WalkEntry::File(path)) => {
                    if let Some(size) = self.file_size(&path) {
                        total += size;
                    }
                }
                Ok(_) => {}
                Err(e) => self.skip(&e.path().unwrap_or(root).display().to_string(), &e),
            }
        }
        total
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        match std::fs::metadata(path) {
            Ok(meta) => Some(meta.len()),
            Err(e) => {
                self.skip(&path.display().to_string(), &e);
                None
            }
        }
    }

    fn skip(&self, path: &str, err: &dyn std::fmt::Display) {
        warn!("Error getting size for {}: {}", path, err);
        self.observer.on_log(
            &format!("Error getting size for {}: {}", path, err),
            LogLevel::Warning,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::types::NullObserver;
    use std::fs;

    fn names(set: &[&str]) -> BTreeSet<String> {
        set.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        fs::create_dir_all(a.join("sub")).unwrap();
        fs::write(a.join("x.txt"), b"12345").unwrap();
        fs::write(a.join("sub/y.txt"), b"0123456789").unwrap();
        dir
    }

    #[test]
    fn test_estimate_mixed_selection() {
        let dir = fixture();
        let a = dir.path().join("a");
        let estimator = SizeEstimator::new(&NullObserver);

        let total = estimator.estimate(
            &[a.join("x.txt"), a.join("sub")],
            &BTreeSet::new(),
        );
        assert_eq!(total, 15);
    }

    #[test]
    fn test_excluded_directory_is_pruned() {
        let dir = fixture();
        let a = dir.path().join("a");
        let estimator = SizeEstimator::new(&NullObserver);

        assert_eq!(estimator.estimate(&[a.clone()], &BTreeSet::new()), 15);
        assert_eq!(estimator.estimate(&[a.clone()], &names(&["sub"])), 5);
        // Top-level selection excluded by name
        assert_eq!(estimator.estimate(&[a.join("sub")], &names(&["sub"])), 0);
    }

    #[test]
    fn test_selected_files_under_excluded_folder_are_not_counted() {
        let dir = fixture();
        let a = dir.path().join("a");
        let estimator = SizeEstimator::new(&NullObserver);
        let selection = [a.join("x.txt"), a.join("sub/y.txt")];

        assert_eq!(estimator.estimate(&selection, &BTreeSet::new()), 15);
        assert_eq!(estimator.estimate(&selection, &names(&["sub"])), 5);
    }

    #[test]
    fn test_excluded_file_is_not_counted() {
        let dir = fixture();
        let a = dir.path().join("a");
        let estimator = SizeEstimator::new(&NullObserver);

        assert_eq!(estimator.estimate(&[a.clone()], &names(&["y.txt"])), 5);
        assert_eq!(estimator.estimate(&[a.join("x.txt")], &names(&["x.txt"])), 0);
    }

    #[test]
    fn test_missing_file_is_skipped_with_warning() {
        let dir = fixture();
        let a = dir.path().join("a");
        let (observer, mut rx) = crate::sftp::types::ChannelObserver::new();
        let estimator = SizeEstimator::new(&observer);

        let total = estimator.estimate(&[a.join("x.txt"), a.join("gone.bin")], &BTreeSet::new());
        assert_eq!(total, 5);

        match rx.try_recv().unwrap() {
            crate::sftp::types::TransferEvent::Log { message, level } => {
                assert_eq!(level, LogLevel::Warning);
                assert!(message.contains("gone.bin"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_empty_estimate_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let estimator = SizeEstimator::new(&NullObserver);
        assert_eq!(estimator.estimate(&[dir.path().to_path_buf()], &BTreeSet::new()), 0);
    }
}
