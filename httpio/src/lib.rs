//! HTTP request sink for tickio buffered writers.
//!
//! [`HttpSink`] turns each buffer drained by a
//! [`tickio_buffered::BufferedWriter`] into one HTTP request, which makes
//! batched shipping to collectors such as the Elastic `_bulk` endpoint a
//! matter of wiring a sink.

mod error;
mod sink;

pub use error::{Error, Result};
pub use sink::HttpSink;

pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Client, Method};
