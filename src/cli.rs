use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use clap::Parser;
use eyre::Context;
use log::LevelFilter;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    config::{ConfigManager, LocalConfigManager},
    logging::{self, DiskSinkConfig, Level, LogSink},
    utils::parse_size,
};

#[derive(Parser, Debug)]
#[command(version, long_version = "")]
#[command(about = "Append messages to a size-bounded, self-rotating log file.", long_about = None)]
pub struct Cli {
    #[arg(
        long,
        short,
        help = "The log file to write. Defaults to $DISKLOG_PATH or disklog/disklog.log in the XDG data directory."
    )]
    pub path: Option<PathBuf>,

    #[arg(
        long,
        short,
        value_parser = parse_size,
        help = "Size the log file may reach before it is rotated, e.g. 4096, 64K or 10MiB. Defaults to $DISKLOG_SIZE_LIMIT or 1MiB."
    )]
    pub size_limit: Option<u64>,

    #[arg(
        long,
        short,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Number of rotated files to keep. Defaults to $DISKLOG_ROTATIONS or 5."
    )]
    pub rotations: Option<u64>,

    #[arg(long, short, default_value_t = Level::Informational, help = "Level to log messages at.")]
    pub level: Level,

    #[arg(long, help = "Also echo every line to stderr.")]
    pub stderr: bool,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        help = "Log diagnostics about disklog itself; repeat for more detail.",
        display_order = 999
    )]
    pub verbose: u8,

    #[arg(
        value_name = "MESSAGE",
        help = "Messages to log. Lines are read from stdin when none are given."
    )]
    pub messages: Vec<String>,
}

impl Cli {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            5_u8..=u8::MAX => LevelFilter::Trace,
        }
    }

    fn sink_config(&self, config: &impl ConfigManager) -> eyre::Result<DiskSinkConfig> {
        let mut sink_config = match &self.path {
            // Only consult the environment for what the flags leave open.
            Some(path) => DiskSinkConfig::new(path)
                .with_size_limit(config.get_size_limit()?)
                .with_rotations(config.get_rotations()?),
            None => config.disk_sink_config()?,
        };

        if let Some(size_limit) = self.size_limit {
            sink_config.size_limit = size_limit;
        }
        if let Some(rotations) = self.rotations {
            sink_config.rotations =
                usize::try_from(rotations).context("Rotation count does not fit in memory")?;
        }

        Ok(sink_config)
    }

    fn setup_logging(&self, sink_config: DiskSinkConfig) -> eyre::Result<Arc<dyn LogSink>> {
        let mut builder = logging::Builder::new()
            .with_level(self.log_filter())
            .with_disk_sink(sink_config);

        if self.stderr {
            builder = builder.with_stderr_sink();
        }

        let logger = builder.build()?;
        let sink = logger.sink();
        logger.init()?;

        Ok(sink)
    }

    pub fn run(self) -> eyre::Result<()> {
        let config = LocalConfigManager::new();
        let sink_config = self.sink_config(&config)?;
        let summary = format!(
            "{} (limit {} bytes, {} rotations)",
            sink_config.path.display(),
            sink_config.size_limit,
            sink_config.rotations
        );
        let sink = self.setup_logging(sink_config)?;

        log::info!(target: "disklog", "disklog starting up");
        log::debug!(target: "disklog", "writing to {}", summary);

        let result = if self.messages.is_empty() {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed building runtime")
                .and_then(|runtime| runtime.block_on(self.pipe_stdin(sink.as_ref())))
        } else {
            self.log_messages(sink.as_ref());
            Ok(())
        };

        if let Err(err) = &result {
            log::error!(
                target: "disklog",
                "failed logging input, error={} cause={}",
                err,
                err.root_cause()
            );
        }

        sink.flush();
        result
    }

    fn log_messages(&self, sink: &dyn LogSink) {
        for (index, message) in self.messages.iter().enumerate() {
            sink.log(Utc::now(), self.level, &format!("args:{}", index + 1), message);
        }
        log::trace!(target: "disklog", "logged {} messages from arguments", self.messages.len());
    }

    async fn pipe_stdin(&self, sink: &dyn LogSink) -> eyre::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut count: u64 = 0;

        while let Some(line) = lines.next_line().await.context("Failed reading stdin")? {
            count += 1;
            sink.log(Utc::now(), self.level, &format!("stdin:{}", count), &line);
        }

        log::trace!(target: "disklog", "logged {} lines from stdin", count);
        Ok(())
    }
}
