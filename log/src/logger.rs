//! Leveled logger.

use std::fmt;
use std::io;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::formatter::{Fields, Formatter, TextFormatter};
use crate::level::Level;
use crate::output::Output;

/// A formatter paired with the output its records go to.
#[derive(Clone)]
pub struct Setup {
    pub formatter: Arc<dyn Formatter>,
    pub output: Arc<dyn Output>,
}

impl Setup {
    pub fn new(formatter: impl Formatter + 'static, output: impl Output + 'static) -> Self {
        Self {
            formatter: Arc::new(formatter),
            output: Arc::new(output),
        }
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setup").finish_non_exhaustive()
    }
}

/// Leveled logger writing every record to each of its setups.
///
/// Fatal records go to the fatal setups only. Loggers are cheap to clone;
/// derived loggers from [`Logger::with_fields`] share the same outputs.
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use tickio_log::{Level, Logger, Setup, TextFormatter};
///
/// let out = Arc::new(Mutex::new(Vec::new()));
/// let logger = Logger::new(vec![Setup::new(TextFormatter::plain(), out.clone())])
///     .with_max_level(Level::Info)
///     .with_field("service", "api");
///
/// logger.info("started");
/// logger.debug("hidden");
/// assert_eq!(&*out.lock(), b"INFO started service=api\n");
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    setups: Vec<Setup>,
    fatal_setups: Vec<Setup>,
    fields: Fields,
    max_level: Level,
}

impl Logger {
    /// Creates a logger using `setups` for every level, fatal included.
    pub fn new(setups: Vec<Setup>) -> Self {
        Self {
            fatal_setups: setups.clone(),
            setups,
            fields: Fields::new(),
            max_level: Level::Verbose,
        }
    }

    /// Colored text on stdout.
    pub fn stdout() -> Self {
        Self::new(vec![Setup::new(TextFormatter::default(), io::stdout())])
    }

    pub fn with_fatal_setups(mut self, setups: Vec<Setup>) -> Self {
        self.fatal_setups = setups;
        self
    }

    /// Records less severe than `level` are discarded.
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }

    /// Returns a logger adding `fields` to every record; later keys win.
    pub fn with_fields(&self, fields: Fields) -> Self {
        let mut logger = self.clone();
        logger.fields.extend(fields);
        logger
    }

    pub fn with_field(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut logger = self.clone();
        logger.fields.insert(key.into(), value.into());
        logger
    }

    pub fn max_level(&self) -> Level {
        self.max_level
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    pub fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let setups = if level == Level::Fatal {
            &self.fatal_setups
        } else {
            &self.setups
        };

        let mut buf = Vec::with_capacity(128);
        for setup in setups {
            buf.clear();
            setup.formatter.format(&mut buf, level, message, &self.fields);
            if let Err(e) = setup.output.write(&buf) {
                debug!("log output rejected {} bytes: {}", buf.len(), e);
            }
        }
    }

    /// Formats lazily: arguments are only rendered when `level` is enabled.
    pub fn log_fmt(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        match args.as_str() {
            Some(message) => self.log(level, message),
            None => self.log(level, &args.to_string()),
        }
    }

    pub fn fatal(&self, message: &str) {
        self.log(Level::Fatal, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn verbose(&self, message: &str) {
        self.log(Level::Verbose, message);
    }
}
