//! Path utilities for SFTP operations
//!
//! Local paths follow host OS conventions; remote SFTP paths always use `/`.
//! [`PathMapper`] is the only place where one is converted into the other.

use std::path::{Component, Path, PathBuf};

use super::error::SftpError;

/// Check if a remote SFTP path is absolute.
///
/// Remote SFTP paths always use `/` as separator (per SFTP protocol).
/// Even Windows SSH servers present paths in Unix style.
pub fn is_absolute_remote_path(path: &str) -> bool {
    path.starts_with('/')
}

/// Join remote SFTP path components using `/` separator.
///
/// Remote paths always use `/` regardless of the local or remote OS.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.is_empty() {
        component.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Parent of a remote path (`/a/b` -> `/a`, `/a` -> `/`, `a` -> ``)
pub fn remote_parent(path: &str) -> String {
    let trimmed = trim_remote(path);
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => String::new(),
    }
}

/// Last segment of a remote path (`/a/b/` -> `b`)
pub fn remote_basename(path: &str) -> &str {
    let trimmed = trim_remote(path);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Strip trailing separators, keeping a lone `/`
pub fn trim_remote(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Basename of a local path as UTF-8 (lossy), empty for roots
pub fn local_basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Deepest common ancestor of `paths`, component-wise.
///
/// When the common path is itself a file (a single selected file), its
/// parent directory is returned instead. `is_file` is the only probe.
pub fn common_root<P, F>(paths: &[P], is_file: F) -> Option<PathBuf>
where
    P: AsRef<Path>,
    F: Fn(&Path) -> bool,
{
    let (first, rest) = paths.split_first()?;
    let mut common: Vec<Component> = first.as_ref().components().collect();

    for path in rest {
        let shared = common
            .iter()
            .zip(path.as_ref().components())
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }

    let root: PathBuf = common.iter().collect();
    if is_file(&root) {
        return root.parent().map(Path::to_path_buf);
    }
    Some(root)
}

/// Maps local paths under a multi-root selection onto a remote destination.
#[derive(Debug, Clone)]
pub struct PathMapper {
    common_root: PathBuf,
}

impl PathMapper {
    /// Compute the common root of the selection (probes the filesystem once)
    pub fn new<P: AsRef<Path>>(selected_paths: &[P]) -> Result<Self, SftpError> {
        let common_root = common_root(selected_paths, Path::is_file).ok_or_else(|| {
            SftpError::InvalidRequest("cannot compute common root of an empty selection".into())
        })?;
        Ok(Self { common_root })
    }

    /// Use an already known common root
    pub fn with_root(common_root: impl Into<PathBuf>) -> Self {
        Self {
            common_root: common_root.into(),
        }
    }

    pub fn common_root(&self) -> &Path {
        &self.common_root
    }

    /// Path of `path` relative to the common root; empty for the root itself
    pub fn relativize(&self, path: &Path) -> Result<PathBuf, SftpError> {
        path.strip_prefix(&self.common_root)
            .map(Path::to_path_buf)
            .map_err(|_| {
                SftpError::InvalidPath(format!(
                    "{} is not under {}",
                    path.display(),
                    self.common_root.display()
                ))
            })
    }

    /// Append a relative local path to `destination_root` with `/` separators
    pub fn to_remote(relative: &Path, destination_root: &str) -> String {
        let mut remote = trim_remote(destination_root).to_string();
        for component in relative.components() {
            if let Component::Normal(name) = component {
                remote = join_remote_path(&remote, &name.to_string_lossy());
            }
        }
        remote
    }

    /// Remote counterpart of a local path under the selection
    pub fn remote_path_for(&self, path: &Path, destination_root: &str) -> Result<String, SftpError> {
        let relative = self.relativize(path)?;
        Ok(Self::to_remote(&relative, destination_root))
    }
}
