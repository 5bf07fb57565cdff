//! In-memory remote filesystem for exercising the engine without a server

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use vps_transfer::sftp::path_utils::{remote_basename, remote_parent};
use vps_transfer::sftp::{
    BytesCallback, CancellationToken, ChannelObserver, RemoteEntry, RemoteFs, SftpError,
    TransferEvent,
};

/// One recorded call, in the order it was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Stat(String),
    List(String),
    Exists(String),
    Mkdir(String),
    Get(String),
    Put(String),
    Rename(String, String),
    Remove(String),
    Rmdir(String),
}

#[derive(Default)]
struct State {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    calls: Vec<Call>,
    failing: HashSet<String>,
    puts: usize,
    cancel_after_puts: Option<(usize, CancellationToken)>,
    extra_bytes_per_put: u64,
}

pub struct MemoryFs {
    state: Mutex<State>,
}

impl MemoryFs {
    /// Empty remote with only `/`
    pub fn new() -> Self {
        let mut state = State::default();
        state.dirs.insert("/".to_string());
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state.lock().dirs.insert(path.to_string());
        self
    }

    pub fn with_file(self, path: &str, content: &[u8]) -> Self {
        self.state
            .lock()
            .files
            .insert(path.to_string(), content.to_vec());
        self
    }

    /// Every operation touching `path` fails
    pub fn fail_on(self, path: &str) -> Self {
        self.state.lock().failing.insert(path.to_string());
        self
    }

    /// Cancel `token` right after the `n`th successful put
    pub fn cancel_after_puts(self, n: usize, token: CancellationToken) -> Self {
        self.state.lock().cancel_after_puts = Some((n, token));
        self
    }

    /// Report `n` more bytes per put than the local file holds, as if it
    /// grew after the size estimate
    pub fn grow_each_put_by(self, n: u64) -> Self {
        self.state.lock().extra_bytes_per_put = n;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn files(&self) -> Vec<String> {
        self.state.lock().files.keys().cloned().collect()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().dirs.contains(path)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call, path: &str) -> Result<(), SftpError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.failing.contains(path) {
            return Err(SftpError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    async fn stat(&self, path: &str) -> Result<RemoteEntry, SftpError> {
        self.record(Call::Stat(path.to_string()), path)?;
        let state = self.state.lock();
        let entry = |is_dir: bool, size: u64| RemoteEntry {
            name: remote_basename(path).to_string(),
            path: path.to_string(),
            is_dir,
            size,
        };
        if state.dirs.contains(path) {
            Ok(entry(true, 0))
        } else if let Some(data) = state.files.get(path) {
            Ok(entry(false, data.len() as u64))
        } else {
            Err(SftpError::FileNotFound(path.to_string()))
        }
    }

    async fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        self.record(Call::List(path.to_string()), path)?;
        let state = self.state.lock();
        if !state.dirs.contains(path) {
            return Err(SftpError::DirectoryNotFound(path.to_string()));
        }

        let dirs = state
            .dirs
            .iter()
            .filter(|d| d.as_str() != "/" && remote_parent(d) == path)
            .map(|d| (d, true, 0u64));
        let files = state
            .files
            .iter()
            .filter(|(f, _)| remote_parent(f) == path)
            .map(|(f, data)| (f, false, data.len() as u64));

        Ok(dirs
            .chain(files)
            .map(|(p, is_dir, size)| RemoteEntry {
                name: remote_basename(p).to_string(),
                path: p.clone(),
                is_dir,
                size,
            })
            .collect())
    }

    async fn exists(&self, path: &str) -> Result<bool, SftpError> {
        self.record(Call::Exists(path.to_string()), path)?;
        Ok(self.state.lock().dirs.contains(path))
    }

    async fn mkdir(&self, path: &str) -> Result<(), SftpError> {
        self.record(Call::Mkdir(path.to_string()), path)?;
        let mut state = self.state.lock();
        if state.dirs.contains(path) || state.files.contains_key(path) {
            return Err(SftpError::ProtocolError(format!("{} already exists", path)));
        }
        if !state.dirs.contains(&remote_parent(path)) {
            return Err(SftpError::FileNotFound(path.to_string()));
        }
        state.dirs.insert(path.to_string());
        Ok(())
    }

    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64, SftpError> {
        self.record(Call::Get(remote_path.to_string()), remote_path)?;
        let data = self
            .file(remote_path)
            .ok_or_else(|| SftpError::FileNotFound(remote_path.to_string()))?;
        std::fs::write(local_path, &data)?;
        Ok(data.len() as u64)
    }

    async fn put(
        &self,
        local_path: &Path,
        remote_path: &str,
        on_bytes: BytesCallback<'_>,
    ) -> Result<u64, SftpError> {
        self.record(Call::Put(remote_path.to_string()), remote_path)?;
        if !self.has_dir(&remote_parent(remote_path)) {
            return Err(SftpError::FileNotFound(remote_path.to_string()));
        }

        let data = std::fs::read(local_path)?;
        for chunk in data.chunks(4) {
            on_bytes(chunk.len() as u64);
        }
        let extra = self.state.lock().extra_bytes_per_put;
        if extra > 0 {
            on_bytes(extra);
        }

        let mut state = self.state.lock();
        state.files.insert(remote_path.to_string(), data.clone());
        state.puts += 1;
        if let Some((n, token)) = &state.cancel_after_puts {
            if state.puts >= *n {
                token.cancel();
            }
        }
        Ok(data.len() as u64)
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), SftpError> {
        self.record(Call::Rename(old_path.to_string(), new_path.to_string()), old_path)?;
        let mut state = self.state.lock();
        if !state.dirs.contains(&remote_parent(new_path)) {
            return Err(SftpError::DirectoryNotFound(remote_parent(new_path)));
        }
        if let Some(data) = state.files.remove(old_path) {
            state.files.insert(new_path.to_string(), data);
            return Ok(());
        }
        if !state.dirs.contains(old_path) {
            return Err(SftpError::FileNotFound(old_path.to_string()));
        }

        let moved = |p: &String| p == old_path || p.starts_with(&format!("{}/", old_path));
        let rebase = |p: &str| format!("{}{}", new_path, &p[old_path.len()..]);

        let dirs: Vec<String> = state.dirs.iter().filter(|d| moved(*d)).cloned().collect();
        for d in dirs {
            state.dirs.remove(&d);
            state.dirs.insert(rebase(&d));
        }
        let files: Vec<String> = state.files.keys().filter(|f| moved(*f)).cloned().collect();
        for f in files {
            if let Some(data) = state.files.remove(&f) {
                state.files.insert(rebase(&f), data);
            }
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), SftpError> {
        self.record(Call::Remove(path.to_string()), path)?;
        self.state
            .lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| SftpError::FileNotFound(path.to_string()))
    }

    async fn rmdir(&self, path: &str) -> Result<(), SftpError> {
        self.record(Call::Rmdir(path.to_string()), path)?;
        let mut state = self.state.lock();
        let prefix = format!("{}/", path);
        let non_empty = state.dirs.iter().any(|d| d.starts_with(&prefix))
            || state.files.keys().any(|f| f.starts_with(&prefix));
        if non_empty {
            return Err(SftpError::ProtocolError(format!("{} is not empty", path)));
        }
        if !state.dirs.remove(path) {
            return Err(SftpError::DirectoryNotFound(path.to_string()));
        }
        Ok(())
    }
}

/// Local tree used by most tests:
/// `a/x.txt` (5 bytes) and `a/sub/y.txt` (10 bytes)
pub fn sample_tree() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    std::fs::create_dir_all(a.join("sub")).unwrap();
    std::fs::write(a.join("x.txt"), b"hello").unwrap();
    std::fs::write(a.join("sub/y.txt"), b"0123456789").unwrap();
    (dir, a)
}

/// Drain everything an observer has received so far
pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn observer() -> (
    ChannelObserver,
    tokio::sync::mpsc::UnboundedReceiver<TransferEvent>,
) {
    ChannelObserver::new()
}
