use std::{
    io::{self, Write},
    path::Path,
};

use super::{
    error::WriteError,
    fs::{FileHandle, Filesystem},
};

/// An open file paired with a byte budget.
///
/// `size` starts at the file's length when it is opened, so the budget holds
/// across restarts against an existing file. A write either fits and is issued
/// in full, or is rejected before any I/O happens.
pub struct QuotaFile {
    handle: Box<dyn FileHandle>,
    size: u64,
    limit: u64,
}

impl QuotaFile {
    pub fn open(fs: &dyn Filesystem, path: &Path, limit: u64) -> io::Result<Self> {
        let mut handle = fs.open_append(path)?;
        let size = handle.seek_to_end()?;

        Ok(Self {
            handle,
            size,
            limit,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let len = data.len() as u64;
        let fits = self
            .size
            .checked_add(len)
            .is_some_and(|total| total <= self.limit);

        if !fits {
            return Err(WriteError::QuotaExceeded {
                size: self.size,
                len,
                limit: self.limit,
            });
        }

        self.handle.write_all(data)?;
        self.size += len;
        Ok(())
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.handle.sync()
    }

    /// Syncs and releases the handle.
    pub fn close(mut self) -> io::Result<()> {
        self.handle.sync()
    }
}

#[cfg(test)]
#[path = "quota_file_test.rs"]
mod quota_file_test;
