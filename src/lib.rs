//! Implements a fluent builder for outbound HTTP requests.
//!
//! A [`Request`] accumulates method, URL, query parameters, headers, body,
//! timeout, redirect policy, and raw transport overrides through chained
//! calls, then materializes a single request when a terminal operation runs.
//! The actual network I/O is performed by an injected
//! [`HttpEngine`](engine::HttpEngine); this crate never opens a socket
//! itself.
//!
//! ```no_run
//! use fetchling::request;
//!
//! # async fn run(engine: &reqwest::Client) -> Result<(), Box<dyn std::error::Error>> {
//! let user: serde_json::Value = request("https://api.example.com")?
//!     .path(["users", "42"])
//!     .query("verbose", true)
//!     .auth("tok123")?
//!     .json(engine)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod body;
pub mod engine;
mod error;
pub mod platform;
pub mod prelude;
mod request;
mod target;

pub use body::{BodyInput, EncodeError, Encoding, FormParams, Payload};
pub use error::{BoxedError, Error};
pub use request::{DEFAULT_REDIRECT_CAP, InvalidHeaderError, Redirects, Request, SendError};
pub use target::{IntoTarget, InvalidUrlError, Target};

pub use bytes::Bytes;

/// Creates a request builder targeting `url`.
///
/// Accepts any type that implements [`IntoTarget`], including `&str`,
/// [`String`], [`Url`](url::Url), and [`Target`].
///
/// # Errors
///
/// Returns [`InvalidUrlError`] if `url` is not an absolute, parseable URL.
/// Relative paths, empty strings, and malformed syntax are all rejected
/// here, never at send time.
pub fn request<T: IntoTarget>(url: T) -> Result<Request, T::Error> {
    Request::new(url)
}
