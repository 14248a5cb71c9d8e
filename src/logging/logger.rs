use std::{fmt, sync::Arc};

use chrono::Utc;
use eyre::Context;
use log::{LevelFilter, Log};

use super::{
    describe_location,
    disk::DiskSinkConfig,
    formatters::DefaultFormatter,
    sinks::{FanoutSink, NullSink, StderrSink},
    DiskSink, Level, LogFormatter, LogSink,
};

/// Text logged in place of a message whose `Display` implementation failed.
const UNFORMATTABLE_MESSAGE: &str = "<message could not be formatted>";

#[derive(Debug, Clone)]
pub struct Config {
    pub enabled: bool,
    pub datetime_format: String,
    pub use_ansi: bool,
}

impl Config {
    pub fn new() -> Self {
        Self {
            enabled: true,
            datetime_format: "%Y-%m-%d %H:%M:%S".to_string(),
            use_ansi: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-end for the `log` facade: turns records into sink calls.
pub struct Logger {
    filter: LevelFilter,
    sink: Arc<dyn LogSink>,
    config: Config,
}

impl Logger {
    pub fn new(filter: LevelFilter, sink: Arc<dyn LogSink>, config: Config) -> Self {
        Self {
            filter,
            sink,
            config,
        }
    }

    /// The sink records end up in, for callers that want to log without going
    /// through the `log` macros.
    pub fn sink(&self) -> Arc<dyn LogSink> {
        Arc::clone(&self.sink)
    }

    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.filter);
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }
}

fn render_message(args: &fmt::Arguments<'_>) -> String {
    let mut message = String::new();
    match fmt::write(&mut message, *args) {
        Ok(()) => message,
        Err(_) => UNFORMATTABLE_MESSAGE.to_string(),
    }
}

fn record_location(record: &log::Record) -> String {
    describe_location(
        record.file().unwrap_or("<unknown>"),
        record.line().unwrap_or(0),
        record.module_path().unwrap_or(record.target()),
    )
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.config.enabled && self.filter >= metadata.level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.sink.log(
                Utc::now(),
                Level::from(record.level()),
                &record_location(record),
                &render_message(record.args()),
            );
        }
    }

    fn flush(&self) {
        self.sink.flush()
    }
}

type SinkConstructor =
    Box<dyn Fn(Box<dyn LogFormatter + 'static>) -> eyre::Result<Box<dyn LogSink + 'static>>>;

pub struct Builder {
    filter: LevelFilter,
    constructors: Vec<SinkConstructor>,
    formatter_builder: Box<dyn Fn(Config) -> Box<dyn LogFormatter + 'static>>,
    config: Config,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            filter: LevelFilter::Off,
            constructors: Vec::new(),
            formatter_builder: Box::new(|config: Config| -> Box<dyn LogFormatter> {
                Box::new(DefaultFormatter::new(config))
            }),
            config: Config::new(),
        }
    }

    pub fn with_level(self, filter: LevelFilter) -> Self {
        Self { filter, ..self }
    }

    pub fn with_config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    pub fn with_disk_sink(mut self, config: DiskSinkConfig) -> Self {
        self.constructors.push(Box::new(
            move |_: Box<dyn LogFormatter>| -> eyre::Result<Box<dyn LogSink>> {
                let sink = DiskSink::new(config.clone()).with_context(|| {
                    format!("Failed creating disk sink for {}", config.path.display())
                })?;
                Ok(Box::new(sink))
            },
        ));
        self
    }

    pub fn with_stderr_sink(mut self) -> Self {
        self.constructors.push(Box::new(
            |formatter: Box<dyn LogFormatter>| -> eyre::Result<Box<dyn LogSink>> {
                Ok(Box::new(StderrSink::new(formatter)))
            },
        ));
        self
    }

    fn build_sink(&self) -> eyre::Result<Arc<dyn LogSink>> {
        let mut sinks = self
            .constructors
            .iter()
            .map(|constructor| constructor((self.formatter_builder)(self.config.clone())))
            .collect::<eyre::Result<Vec<_>>>()?;

        let sink: Arc<dyn LogSink> = match sinks.len() {
            0 => Arc::new(NullSink::new()),
            1 => Arc::from(sinks.remove(0)),
            _ => Arc::new(FanoutSink::new(sinks)),
        };
        Ok(sink)
    }

    pub fn build(&self) -> eyre::Result<Logger> {
        let sink = self.build_sink()?;
        Ok(Logger::new(self.filter, sink, self.config.clone()))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "logger_test.rs"]
mod logger_test;
