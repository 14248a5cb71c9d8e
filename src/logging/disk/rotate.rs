use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use super::{error::RotateError, fs::Filesystem};

/// The chain of files `path, path.1, ..., path.<rotations>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationFamily {
    path: PathBuf,
    rotations: usize,
}

impl RotationFamily {
    /// # Panics
    ///
    /// When `rotations` is zero.
    pub fn new(path: impl Into<PathBuf>, rotations: usize) -> Self {
        assert!(rotations >= 1, "a rotation family needs at least one rotation");

        Self {
            path: path.into(),
            rotations,
        }
    }

    pub fn rotations(&self) -> usize {
        self.rotations
    }

    /// Generation `index` of the family; 0 is the live file.
    pub fn member(&self, index: usize) -> PathBuf {
        if index == 0 {
            return self.path.clone();
        }

        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    pub fn members(&self) -> impl Iterator<Item = PathBuf> + '_ {
        (0..=self.rotations).map(|index| self.member(index))
    }

    /// Shifts every existing generation up by one suffix, discarding the oldest,
    /// so that nothing is left at the live path.
    ///
    /// Existence is checked against the filesystem on every call, so a rotation
    /// that aborted halfway is picked up correctly by the next one.
    pub fn rotate(&self, fs: &dyn Filesystem) -> Result<(), RotateError> {
        let oldest = self.member(self.rotations);
        if fs.exists(&oldest) {
            fs.remove(&oldest).map_err(|source| RotateError::Remove {
                path: oldest.clone(),
                source,
            })?;
        }

        for index in (0..self.rotations).rev() {
            let from = self.member(index);
            if !fs.exists(&from) {
                continue;
            }

            let to = self.member(index + 1);
            fs.rename(&from, &to)
                .map_err(|source| RotateError::Rename { from, to, source })?;
        }

        Ok(())
    }
}

pub fn rotate(fs: &dyn Filesystem, path: &Path, rotations: usize) -> Result<(), RotateError> {
    RotationFamily::new(path, rotations).rotate(fs)
}

#[cfg(test)]
#[path = "rotate_test.rs"]
mod rotate_test;
