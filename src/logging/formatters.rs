use std::{fmt::Write, path::Path};

use chrono::{DateTime, Local, Utc};
use yansi::{Condition, Paint, Painted};

use super::{logger::Config, Level, LogFormatter};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders one line of the on-disk format:
/// `<timestamp> <<level>> <location> <message>\n`, timestamp in UTC.
///
/// Only allocates; it cannot fail, which makes it safe for sinks reporting their
/// own errors.
pub fn format_line(time: DateTime<Utc>, level: Level, location: &str, message: &str) -> String {
    let mut line = String::with_capacity(32 + location.len() + message.len());
    let _ = writeln!(
        line,
        "{} <{}> {} {}",
        time.format(TIMESTAMP_FORMAT),
        level.as_str(),
        location,
        message
    );
    line
}

/// Describes a call site as `<file name>:<line> <function>`, with the file's
/// directory and extension stripped.
pub fn describe_location(file: &str, line: u32, function: &str) -> String {
    let name = Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_else(|| file.into());

    format!("{}:{} {}", name, line, function)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LineFormatter;

impl LogFormatter for LineFormatter {
    fn format(&self, time: DateTime<Utc>, level: Level, location: &str, message: &str) -> String {
        format_line(time, level, location, message)
    }
}

/// Human oriented formatter used for console output.
pub struct DefaultFormatter {
    config: Config,
}

impl DefaultFormatter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn condition(&self) -> Condition {
        if self.config.use_ansi {
            Condition::STDERR_IS_TTY
        } else {
            Condition::NEVER
        }
    }

    fn timestamp(&self, time: DateTime<Utc>) -> String {
        let time = time
            .with_timezone(&Local)
            .format(&self.config.datetime_format)
            .to_string();

        format!("[{}]", time)
            .bright_black()
            .whenever(self.condition())
            .to_string()
    }

    fn format_level(&self, level: Level) -> Painted<&'static str> {
        let painted = match level {
            Level::Emergency | Level::Alert | Level::Critical => "CRT".red().bold(),
            Level::Error => "ERR".red(),
            Level::Warning => "WRN".yellow(),
            Level::Notice => "NOT".cyan(),
            Level::Informational => "INF".green(),
            Level::Debug => "DEB".blue(),
        };
        painted.whenever(self.condition())
    }
}

impl LogFormatter for DefaultFormatter {
    fn format(&self, time: DateTime<Utc>, level: Level, location: &str, message: &str) -> String {
        format!(
            "{} {} {}: {}",
            self.timestamp(time),
            self.format_level(level),
            location.dim().whenever(self.condition()),
            message.bold().whenever(self.condition()),
        )
    }
}

#[cfg(test)]
#[path = "formatters_test.rs"]
mod formatters_test;
