//! Leveled logging over buffered outputs.
//!
//! A [`Logger`] renders each record with a [`Formatter`] and hands the
//! bytes to an [`Output`]. Pairing it with a
//! [`tickio_buffered::BufferedWriter`] keeps logging off the I/O path:
//! records are batched into fixed buffers and flushed to the sink in the
//! background.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tickio_buffered::{AsyncWriteSink, BufferedWriter, Config};
//! use tickio_log::{ElasticBulkFormatter, Logger, Setup, infof};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let file = tokio::fs::File::create("app.ndjson").await?;
//! let writer = std::sync::Arc::new(BufferedWriter::new(
//!     AsyncWriteSink::new(file),
//!     Config::new().with_flush_interval(Duration::from_secs(1)),
//! )?);
//!
//! let logger = Logger::new(vec![Setup::new(
//!     ElasticBulkFormatter::new("app-", "log"),
//!     writer.clone(),
//! )]);
//! infof!(logger, "listening on {}", 8080);
//!
//! writer.close().await?;
//! # Ok(())
//! # }
//! ```

mod elastic;
mod error;
mod formatter;
mod level;
mod logger;
mod output;

pub use elastic::ElasticBulkFormatter;
pub use error::{Error, Result};
pub use formatter::{Fields, Formatter, JsonFormatter, TextFormatter, to_fields};
pub use level::Level;
pub use logger::{Logger, Setup};
pub use output::Output;

/// Logs a formatted message at the given level.
///
/// ```
/// # use tickio_log::{Level, Logger, logf};
/// # let logger = Logger::new(Vec::new());
/// logf!(logger, Level::Warning, "retry {} of {}", 1, 3);
/// ```
#[macro_export]
macro_rules! logf {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_fmt($level, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! fatalf {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logf!($logger, $crate::Level::Fatal, $($arg)+)
    };
}

#[macro_export]
macro_rules! errorf {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logf!($logger, $crate::Level::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! warningf {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logf!($logger, $crate::Level::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! infof {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logf!($logger, $crate::Level::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! debugf {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logf!($logger, $crate::Level::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! verbosef {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logf!($logger, $crate::Level::Verbose, $($arg)+)
    };
}
