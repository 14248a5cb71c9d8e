use std::io::Write;

use chrono::{DateTime, Utc};

use super::{Level, LogFormatter, LogSink};

pub struct StderrSink {
    handle: std::io::Stderr,
    formatter: Box<dyn LogFormatter>,
}

impl StderrSink {
    pub fn new(formatter: Box<dyn LogFormatter>) -> Self {
        Self {
            handle: std::io::stderr(),
            formatter,
        }
    }
}

impl LogSink for StderrSink {
    fn log(&self, time: DateTime<Utc>, level: Level, location: &str, message: &str) {
        let line = self.formatter.format(time, level, location, message);
        let mut writer = self.handle.lock();
        let _ = writeln!(writer, "{}", line);
    }

    fn flush(&self) {
        let _ = self.handle.lock().flush();
    }
}

/// Ignores everything it is given.
#[derive(Debug, Default)]
pub struct NullSink {}

impl NullSink {
    pub fn new() -> Self {
        Self {}
    }
}

impl LogSink for NullSink {
    fn log(&self, _time: DateTime<Utc>, _level: Level, _location: &str, _message: &str) {}

    fn flush(&self) {}
}

/// Forwards every call to each of its sinks, in order.
pub struct FanoutSink {
    sinks: Vec<Box<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn LogSink>>) -> Self {
        Self { sinks }
    }
}

impl LogSink for FanoutSink {
    fn log(&self, time: DateTime<Utc>, level: Level, location: &str, message: &str) {
        for sink in &self.sinks {
            sink.log(time, level, location, message);
        }
    }

    fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}
