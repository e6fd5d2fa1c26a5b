//! Error types for tickio-httpio.

use std::io;

use reqwest::StatusCode;

/// Result type alias for tickio-httpio.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for HTTP sink requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure: connect, TLS, timeout or body read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("http status {status} from {url}")]
    Status { status: StatusCode, url: String },

    /// A header name or value that is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Http(e) if e.is_timeout() => io::ErrorKind::TimedOut,
            Error::Http(e) if e.is_connect() => io::ErrorKind::ConnectionRefused,
            Error::InvalidHeader(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
