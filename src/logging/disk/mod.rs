//! Disk-backed sink: an ordered, size-bounded, self-rotating log file writer.
//!
//! ```text
//! [log()] → format line → [unbounded channel] → [worker thread]
//!                                                   ↓
//!                          pending lines → QuotaFile::write (chunks that fit)
//!                                                   ↓ (quota exceeded)
//!                                   close → rotate family → reopen → continue
//! ```
//!
//! Callers only format and enqueue. Pending lines, the open file and rotation are
//! owned by one worker thread, so lines reach the file in the order they were
//! enqueued and no lock guards the sink state. Failures inside the worker are
//! turned into `warning` lines queued behind the pending ones.

mod error;
pub mod fs;
mod quota_file;
mod rotate;

#[cfg(test)]
pub(crate) mod test_support;

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{mpsc as ack, Arc},
    thread::JoinHandle,
};

use chrono::{DateTime, Utc};
use eyre::Context;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub use error::{RotateError, SinkError, WriteError};
pub use fs::{FileHandle, Filesystem, OsFilesystem};
pub use quota_file::QuotaFile;
pub use rotate::{rotate, RotationFamily};

use super::{format_line, Clock, Level, LogSink, SystemClock};

/// Location stamped on warning lines the sink writes about itself.
pub const WARNING_LOCATION: &str = "disklog::disk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSinkConfig {
    pub path: PathBuf,
    /// Size in bytes the live file may reach before it is rotated.
    pub size_limit: u64,
    /// Number of rotated generations kept next to the live file.
    pub rotations: usize,
}

impl DiskSinkConfig {
    pub const DEFAULT_SIZE_LIMIT: u64 = 1024 * 1024;
    pub const DEFAULT_ROTATIONS: usize = 5;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size_limit: Self::DEFAULT_SIZE_LIMIT,
            rotations: Self::DEFAULT_ROTATIONS,
        }
    }

    pub fn with_size_limit(self, size_limit: u64) -> Self {
        Self { size_limit, ..self }
    }

    pub fn with_rotations(self, rotations: usize) -> Self {
        Self { rotations, ..self }
    }
}

enum Command {
    Write(Vec<u8>),
    Flush(ack::SyncSender<()>),
}

pub struct DiskSink {
    sender: Option<UnboundedSender<Command>>,
    worker: Option<JoinHandle<()>>,
    clock: Arc<dyn Clock>,
}

impl DiskSink {
    pub fn new(config: DiskSinkConfig) -> eyre::Result<Self> {
        Self::with_collaborators(config, Box::new(OsFilesystem), Arc::new(SystemClock))
    }

    pub fn with_collaborators(
        config: DiskSinkConfig,
        fs: Box<dyn Filesystem>,
        clock: Arc<dyn Clock>,
    ) -> eyre::Result<Self> {
        eyre::ensure!(
            config.rotations >= 1,
            "Log file {} needs at least one rotation",
            config.path.display()
        );

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Worker {
            family: RotationFamily::new(config.path.clone(), config.rotations),
            path: config.path.clone(),
            size_limit: config.size_limit,
            fs,
            clock: clock.clone(),
            pending: VecDeque::new(),
            state: FileState::NoFileOpen,
        };

        let worker = std::thread::Builder::new()
            .name("disklog-writer".to_string())
            .spawn(move || worker.run(receiver))
            .with_context(|| {
                format!("Failed spawning writer for log file {}", config.path.display())
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            clock,
        })
    }

    /// Logs `message` stamped with the sink's clock.
    pub fn log_now(&self, level: Level, location: &str, message: &str) {
        self.log(self.clock.now(), level, location, message);
    }

    fn enqueue(&self, command: Command) -> bool {
        // Only fails once the worker is gone, and then there is nobody left to
        // write the line anyway.
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(command).is_ok())
    }
}

impl LogSink for DiskSink {
    fn log(&self, time: DateTime<Utc>, level: Level, location: &str, message: &str) {
        let line = format_line(time, level, location, message);
        self.enqueue(Command::Write(line.into_bytes()));
    }

    fn flush(&self) {
        let (done, wait) = ack::sync_channel(1);
        if self.enqueue(Command::Flush(done)) {
            let _ = wait.recv();
        }
    }
}

impl Drop for DiskSink {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is left and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

enum FileState {
    NoFileOpen,
    FileOpen(QuotaFile),
}

struct Worker {
    family: RotationFamily,
    path: PathBuf,
    size_limit: u64,
    fs: Box<dyn Filesystem>,
    clock: Arc<dyn Clock>,
    /// Lines not yet written to the file, in arrival order.
    pending: VecDeque<Vec<u8>>,
    state: FileState,
}

impl Worker {
    fn run(mut self, mut receiver: UnboundedReceiver<Command>) {
        while let Some(command) = receiver.blocking_recv() {
            match command {
                Command::Write(line) => {
                    self.pending.push_back(line);
                    self.drain();
                }
                Command::Flush(done) => {
                    if !self.pending.is_empty() {
                        self.drain();
                    }
                    self.sync();
                    let _ = done.send(());
                }
            }
        }

        if !self.pending.is_empty() {
            self.drain();
        }
        // Nobody is left to read a warning about a failed final close.
        let _ = self.close();
    }

    fn drain(&mut self) {
        let mut errors = Vec::new();
        if let Err(err) = self.try_drain(&mut errors) {
            errors.push(err);
        }
        for err in &errors {
            self.warn(err);
        }
    }

    /// Writes pending lines in chunks that fit the open file, rotating when the
    /// next line does not. Problems that do not stop the drain, such as a line
    /// larger than the size limit, are collected in `errors`.
    fn try_drain(&mut self, errors: &mut Vec<SinkError>) -> Result<(), SinkError> {
        while let Some(line) = self.pending.front() {
            let len = line.len() as u64;
            if len > self.size_limit {
                // Would not fit even in an empty file.
                self.pending.pop_front();
                errors.push(SinkError::Oversized {
                    len,
                    limit: self.size_limit,
                });
                continue;
            }

            self.open()?;
            let count = self.fitting_lines().max(1);

            match self.write_lines(count) {
                Ok(()) => {}
                Err(WriteError::QuotaExceeded { .. }) => self.rotate(errors)?,
                Err(WriteError::Io(source)) => {
                    self.discard();
                    return Err(SinkError::Write {
                        path: self.path.clone(),
                        source,
                    });
                }
            }
        }

        Ok(())
    }

    /// Number of leading pending lines that fit in what is left of the quota.
    fn fitting_lines(&self) -> usize {
        let FileState::FileOpen(file) = &self.state else {
            return 0;
        };

        let mut room = file.limit().saturating_sub(file.size());
        self.pending
            .iter()
            .take_while(|line| {
                let len = line.len() as u64;
                let fits = len <= room;
                if fits {
                    room -= len;
                }
                fits
            })
            .count()
    }

    fn rotate(&mut self, errors: &mut Vec<SinkError>) -> Result<(), SinkError> {
        if let Err(err) = self.close() {
            errors.push(err);
        }

        self.family.rotate(self.fs.as_ref())?;
        Ok(())
    }

    fn open(&mut self) -> Result<(), SinkError> {
        if let FileState::FileOpen(_) = self.state {
            return Ok(());
        }

        let open_error = |source| SinkError::Open {
            path: self.path.clone(),
            source,
        };

        if !self.fs.exists(&self.path) {
            self.fs.create(&self.path).map_err(open_error)?;
        }
        let file =
            QuotaFile::open(self.fs.as_ref(), &self.path, self.size_limit).map_err(open_error)?;

        self.state = FileState::FileOpen(file);
        Ok(())
    }

    /// Writes the first `count` pending lines in one piece, all or nothing.
    fn write_lines(&mut self, count: usize) -> Result<(), WriteError> {
        let FileState::FileOpen(file) = &mut self.state else {
            return Err(WriteError::Io(std::io::Error::other("no log file open")));
        };

        let chunk: Vec<u8> = self.pending.iter().take(count).flatten().copied().collect();
        file.write(&chunk)?;
        self.pending.drain(..count);
        Ok(())
    }

    fn sync(&mut self) {
        let FileState::FileOpen(file) = &mut self.state else {
            return;
        };

        if let Err(source) = file.sync() {
            let err = SinkError::Sync {
                path: self.path.clone(),
                source,
            };
            self.discard();
            self.warn(&err);
        }
    }

    /// Syncs and releases the open file, if any.
    fn close(&mut self) -> Result<(), SinkError> {
        match std::mem::replace(&mut self.state, FileState::NoFileOpen) {
            FileState::NoFileOpen => Ok(()),
            FileState::FileOpen(file) => file.close().map_err(|source| SinkError::Close {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Releases the open file without syncing; the next drain reopens it and
    /// re-reads its length.
    fn discard(&mut self) {
        self.state = FileState::NoFileOpen;
    }

    fn warn(&mut self, err: &SinkError) {
        let message = err.to_string();
        let line = format_line(self.clock.now(), Level::Warning, WARNING_LOCATION, &message);
        self.pending.push_back(line.into_bytes());
    }
}
