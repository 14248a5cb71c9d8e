use std::path::PathBuf;

use eyre::Context;

use crate::{logging::DiskSinkConfig, utils::parse_size};

pub const PATH_VAR: &str = "DISKLOG_PATH";
pub const SIZE_LIMIT_VAR: &str = "DISKLOG_SIZE_LIMIT";
pub const ROTATIONS_VAR: &str = "DISKLOG_ROTATIONS";

pub trait ConfigManager: Sized + Clone + Send + Sync {
    fn get_log_path(&self) -> eyre::Result<PathBuf>;
    fn get_size_limit(&self) -> eyre::Result<u64>;
    fn get_rotations(&self) -> eyre::Result<usize>;

    fn disk_sink_config(&self) -> eyre::Result<DiskSinkConfig> {
        Ok(DiskSinkConfig::new(self.get_log_path()?)
            .with_size_limit(self.get_size_limit()?)
            .with_rotations(self.get_rotations()?))
    }
}

/// Resolves settings from the process environment, falling back to defaults.
#[derive(Default, Clone, Debug)]
pub struct LocalConfigManager {}

impl LocalConfigManager {
    pub fn new() -> Self {
        Self {}
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(not(target_os = "windows"))]
pub fn home_dir() -> eyre::Result<PathBuf> {
    let home = std::env::var("HOME").context("$HOME not found")?;
    Ok(PathBuf::from(home))
}

#[cfg(target_os = "windows")]
pub fn home_dir() -> eyre::Result<PathBuf> {
    let home = std::env::var("USERPROFILE").context("%userprofile% not found")?;
    Ok(PathBuf::from(home))
}

pub fn data_dir() -> eyre::Result<PathBuf> {
    let data_dir = match var("XDG_DATA_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => home_dir()?.join(".local").join("share"),
    };

    Ok(data_dir.join("disklog"))
}

impl ConfigManager for LocalConfigManager {
    fn get_log_path(&self) -> eyre::Result<PathBuf> {
        match var(PATH_VAR) {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(data_dir()?.join("disklog.log")),
        }
    }

    fn get_size_limit(&self) -> eyre::Result<u64> {
        match var(SIZE_LIMIT_VAR) {
            Some(size) => parse_size(&size).with_context(|| format!("Invalid ${}", SIZE_LIMIT_VAR)),
            None => Ok(DiskSinkConfig::DEFAULT_SIZE_LIMIT),
        }
    }

    fn get_rotations(&self) -> eyre::Result<usize> {
        let Some(rotations) = var(ROTATIONS_VAR) else {
            return Ok(DiskSinkConfig::DEFAULT_ROTATIONS);
        };

        let rotations: usize = rotations
            .trim()
            .parse()
            .with_context(|| format!("Invalid ${}", ROTATIONS_VAR))?;
        eyre::ensure!(rotations >= 1, "${} must be at least 1", ROTATIONS_VAR);

        Ok(rotations)
    }
}
