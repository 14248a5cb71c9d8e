//! In-memory collaborators for exercising the disk pipeline without touching
//! the real filesystem or wall clock.

use std::{
    collections::{BTreeMap, BTreeSet},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, TimeZone, Utc};

use super::fs::{FileHandle, Filesystem};
use crate::logging::Clock;

#[derive(Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    failing_writes: usize,
    failing_opens: usize,
    failing_renames: usize,
    failing_removes: usize,
    failing_syncs: usize,
    opens: usize,
    syncs: usize,
}

/// Shared, cloneable in-memory filesystem. Clones observe the same files.
#[derive(Clone, Default)]
pub(crate) struct MemoryFs {
    state: Arc<Mutex<State>>,
}

impl MemoryFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_files<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        let fs = Self::new();
        for path in paths {
            let path = path.as_ref();
            fs.put(path, path.to_string_lossy().as_bytes());
        }
        fs
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn put(&self, path: impl AsRef<Path>, contents: &[u8]) {
        self.lock()
            .files
            .insert(path.as_ref().to_path_buf(), contents.to_vec());
    }

    pub(crate) fn paths(&self) -> BTreeSet<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    pub(crate) fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock()
            .files
            .get(path.as_ref())
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }

    pub(crate) fn lines(&self, path: impl AsRef<Path>) -> Vec<String> {
        self.contents(path)
            .map(|contents| contents.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub(crate) fn fail_next_writes(&self, count: usize) {
        self.lock().failing_writes = count;
    }

    pub(crate) fn fail_next_opens(&self, count: usize) {
        self.lock().failing_opens = count;
    }

    pub(crate) fn fail_next_renames(&self, count: usize) {
        self.lock().failing_renames = count;
    }

    pub(crate) fn fail_next_removes(&self, count: usize) {
        self.lock().failing_removes = count;
    }

    pub(crate) fn fail_next_syncs(&self, count: usize) {
        self.lock().failing_syncs = count;
    }

    /// Number of handles successfully opened so far.
    pub(crate) fn opens(&self) -> usize {
        self.lock().opens
    }

    pub(crate) fn syncs(&self) -> usize {
        self.lock().syncs
    }
}

fn injected(what: &str) -> io::Error {
    io::Error::other(format!("injected {} failure", what))
}

impl Filesystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn create(&self, path: &Path) -> io::Result<()> {
        self.lock().files.entry(path.to_path_buf()).or_default();
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.failing_removes > 0 {
            state.failing_removes -= 1;
            return Err(injected("remove"));
        }

        state
            .files
            .remove(path)
            .map(drop)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.failing_renames > 0 {
            state.failing_renames -= 1;
            return Err(injected("rename"));
        }

        let data = state
            .files
            .remove(from)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        state.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn open_append(&self, path: &Path) -> io::Result<Box<dyn FileHandle>> {
        let mut state = self.lock();
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(injected("open"));
        }
        if !state.files.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        state.opens += 1;
        Ok(Box::new(MemoryFile {
            fs: self.clone(),
            path: path.to_path_buf(),
        }))
    }
}

struct MemoryFile {
    fs: MemoryFs,
    path: PathBuf,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.fs.lock();
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(injected("write"));
        }

        let file = state
            .files
            .get_mut(&self.path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        file.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileHandle for MemoryFile {
    fn seek_to_end(&mut self) -> io::Result<u64> {
        self.fs
            .lock()
            .files
            .get(&self.path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut state = self.fs.lock();
        if state.failing_syncs > 0 {
            state.failing_syncs -= 1;
            return Err(injected("sync"));
        }

        state.syncs += 1;
        Ok(())
    }
}

pub(crate) struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        let time = Utc.with_ymd_and_hms(2018, 8, 31, 18, 29, 34).unwrap();
        Self(time + chrono::Duration::milliseconds(748))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
