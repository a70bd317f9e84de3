//! HTTP engine and response abstractions.
//!
//! This module defines the traits that decouple the builder from any
//! specific transport. Users provide their own [`HttpEngine`] (e.g. backed
//! by `reqwest`, `hyper`, or a WASM-compatible client); the builder only
//! assembles a [`Dispatch`] and hands it over. Connection pooling, TLS,
//! timeouts, and redirect following are all the engine's concern.

#[cfg(all(not(target_arch = "wasm32"), feature = "engine-reqwest-0_12"))]
mod reqwest_0_12;

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};
use snafu::{ResultExt as _, Snafu};
use url::Url;

use crate::platform::{MaybeSend, MaybeSendSync};

/// A fully assembled request, ready for an engine to put on the wire.
///
/// The builder produces one `Dispatch` per terminal operation and never
/// reuses it. Fields mirror the builder's descriptor after content-type and
/// user-agent derivation and after raw overrides were merged on top.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// The absolute target URL, query string included.
    pub url: Url,
    /// The HTTP verb.
    pub method: Method,
    /// All request headers, names lowercased.
    pub headers: HeaderMap,
    /// The wire-ready body, if any.
    pub body: Option<Bytes>,
    /// The send timeout.
    pub timeout: Duration,
    /// Redirect cap; `0` means do not follow redirects.
    pub max_redirects: u32,
    /// Raw overrides the builder did not recognize. Engine-specific;
    /// engines are free to ignore what they do not understand.
    pub extra: Map<String, Value>,
}

impl Dispatch {
    /// Shallow-merges raw overrides on top of the assembled fields.
    ///
    /// Recognized keys override the matching field: `"method"` (string),
    /// `"body"` (string), `"timeout"` (integer milliseconds), `"redirects"`
    /// (integer cap), and `"headers"` (object, merged entry by entry).
    /// Everything else lands in [`Dispatch::extra`].
    pub(crate) fn apply_overrides(
        &mut self,
        overrides: Map<String, Value>,
    ) -> Result<(), OverrideError> {
        for (key, value) in overrides {
            let recognized = match (key.as_str(), &value) {
                ("method", Value::String(method)) => {
                    self.method = method.parse().context(BadMethodSnafu)?;
                    true
                }
                ("body", Value::String(body)) => {
                    self.body = Some(Bytes::from(body.clone()));
                    true
                }
                ("timeout", number) if number.as_u64().is_some() => {
                    self.timeout = Duration::from_millis(number.as_u64().unwrap_or_default());
                    true
                }
                ("redirects", number) if number.as_u64().is_some() => {
                    let cap = number.as_u64().unwrap_or_default();
                    self.max_redirects = u32::try_from(cap).unwrap_or(u32::MAX);
                    true
                }
                ("headers", Value::Object(entries)) => {
                    for (name, v) in entries {
                        let name =
                            HeaderName::from_bytes(name.as_bytes()).context(BadHeaderNameSnafu)?;
                        let text = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        let value = HeaderValue::from_str(&text).context(BadHeaderValueSnafu)?;
                        self.headers.insert(name, value);
                    }
                    true
                }
                _ => false,
            };

            if !recognized {
                self.extra.insert(key, value);
            }
        }

        Ok(())
    }
}

/// Errors raised while merging raw engine overrides into a [`Dispatch`].
#[derive(Debug, Snafu)]
pub enum OverrideError {
    /// The `"method"` override is not a valid HTTP verb.
    #[snafu(display("method override is not a valid HTTP verb"))]
    BadMethod {
        /// The underlying parse error.
        source: http::method::InvalidMethod,
    },
    /// A `"headers"` override key is not a valid header name.
    #[snafu(display("header override name is invalid"))]
    BadHeaderName {
        /// The underlying parse error.
        source: http::header::InvalidHeaderName,
    },
    /// A `"headers"` override value is not a valid header value.
    #[snafu(display("header override value is invalid"))]
    BadHeaderValue {
        /// The underlying parse error.
        source: http::header::InvalidHeaderValue,
    },
}

impl crate::Error for OverrideError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Defines the common interface for sending assembled requests.
pub trait HttpEngine: MaybeSendSync {
    /// The error type returned by the engine for a failed request.
    type Error: crate::Error;

    /// The associated response type returned by this engine.
    type Response: EngineResponse;

    /// Puts one assembled [`Dispatch`] on the wire.
    ///
    /// Invoked exactly once per terminal builder operation. The engine owns
    /// timeout enforcement and redirect following.
    fn send(
        &self,
        dispatch: Dispatch,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + MaybeSend;
}

/// Defines the common interface for engine responses.
pub trait EngineResponse: MaybeSendSync {
    /// The error type when reading the response body.
    type Error: crate::Error;

    /// Returns the HTTP status code of the response.
    fn status(&self) -> StatusCode;

    /// Returns the response's HTTP headers.
    fn headers(&self) -> HeaderMap;

    /// Consumes the response and asynchronously returns its body.
    fn body(self) -> impl Future<Output = Result<Bytes, Self::Error>> + MaybeSend;
}
