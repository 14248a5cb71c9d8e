mod clock;
pub mod disk;
mod formatters;
mod level;
mod logger;
mod sinks;

use chrono::{DateTime, Utc};

pub use clock::{Clock, SystemClock};
pub use disk::{DiskSink, DiskSinkConfig};
pub use formatters::{describe_location, format_line, DefaultFormatter, LineFormatter};
pub use level::{Level, ParseLevelError};
pub use logger::{Builder, Config, Logger};
pub use sinks::{FanoutSink, NullSink, StderrSink};

pub trait LogFormatter: Sync + Send {
    fn format(&self, time: DateTime<Utc>, level: Level, location: &str, message: &str) -> String;
}

/// A destination for log lines.
///
/// Implementations must never fail the caller: whatever goes wrong while
/// delivering a line is the sink's problem to report or swallow.
pub trait LogSink: Sync + Send {
    fn log(&self, time: DateTime<Utc>, level: Level, location: &str, message: &str);

    /// Blocks until everything logged before the call has reached its destination.
    fn flush(&self);
}
