//! Logging with an asynchronous, size-bounded, self-rotating disk sink.
//!
//! The [`logging`] module holds the sinks and the `log` facade front-end;
//! [`logging::DiskSink`] is the one that writes files.

pub mod cli;
pub mod config;
pub mod logging;
pub mod utils;
