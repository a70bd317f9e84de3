//! The fluent request builder.
//!
//! [`Request`] accumulates a request descriptor through chained calls and
//! hands a fully assembled [`Dispatch`] to an [`HttpEngine`] when a terminal
//! operation runs. Mutators consume and return the builder, so a chain never
//! aliases shared mutable state. Terminal operations consume the builder
//! outright, so every builder is single-shot. Clone it first to send the
//! same request twice.

use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::{HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use snafu::{ResultExt as _, Snafu};

use crate::body::{BodyInput, EncodeError, Encoding, Payload};
use crate::engine::{Dispatch, EngineResponse, HttpEngine, OverrideError};
use crate::target::{IntoTarget, Target};

/// Redirect cap applied when none is set, matching common engine defaults.
pub const DEFAULT_REDIRECT_CAP: u32 = 21;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity string sent as `user-agent` when the caller never sets one.
const DEFAULT_USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (+https://crates.io/crates/",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Redirect-following policy for [`Request::follow`].
///
/// Converts from an exact numeric cap or from a boolean toggle: `true`
/// restores [`DEFAULT_REDIRECT_CAP`], `false` disables following entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirects(u32);

impl Redirects {
    /// The maximum number of redirects the engine may follow.
    #[must_use]
    pub fn cap(self) -> u32 {
        self.0
    }
}

impl From<u32> for Redirects {
    fn from(cap: u32) -> Self {
        Self(cap)
    }
}

impl From<bool> for Redirects {
    fn from(follow: bool) -> Self {
        Self(if follow { DEFAULT_REDIRECT_CAP } else { 0 })
    }
}

/// Errors raised when a header write carries an invalid name or value.
#[derive(Debug, Snafu)]
pub enum InvalidHeaderError {
    /// The header name is not a valid HTTP header name.
    #[snafu(display("invalid header name"))]
    Name {
        /// The underlying parse error.
        source: http::header::InvalidHeaderName,
    },
    /// The header value contains bytes not allowed in an HTTP header.
    #[snafu(display("invalid header value"))]
    Value {
        /// The underlying parse error.
        source: http::header::InvalidHeaderValue,
    },
}

impl crate::Error for InvalidHeaderError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// A chainable request descriptor.
///
/// Construct one with [`crate::request`] or [`Request::new`], chain any
/// number of mutators in any order, then finish with a terminal operation
/// ([`send`](Self::send), [`json`](Self::json), [`text`](Self::text),
/// [`raw`](Self::raw), or [`blob`](Self::blob)). Each terminal call consumes
/// the builder and dispatches exactly one request.
#[derive(Debug, Clone)]
pub struct Request {
    target: Target,
    method: Method,
    payload: Option<Payload>,
    headers: http::HeaderMap,
    timeout: Duration,
    max_redirects: u32,
    options: Map<String, Value>,
}

impl Request {
    /// Creates a builder targeting `url` with defaulted descriptor fields:
    /// `GET`, no payload, a 30 second timeout, and a redirect cap of
    /// [`DEFAULT_REDIRECT_CAP`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUrlError`](crate::InvalidUrlError) if `url` is not
    /// an absolute, parseable URL.
    pub fn new<T: IntoTarget>(url: T) -> Result<Self, T::Error> {
        Ok(Self {
            target: url.into_target()?,
            method: Method::GET,
            payload: None,
            headers: http::HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_REDIRECT_CAP,
            options: Map::new(),
        })
    }

    /// The current target URL, query string included.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The resolved payload, if a body has been set.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    // -- URL mutators --

    /// Appends one query pair. Repeated names are preserved as multiple
    /// entries; escaping is delegated to the URL representation.
    #[must_use]
    pub fn query(mut self, name: impl AsRef<str>, value: impl Display) -> Self {
        self.target
            .append_query_pair(name.as_ref(), &value.to_string());
        self
    }

    /// Appends one query pair per entry, in iteration order.
    #[must_use]
    pub fn query_pairs<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Display,
    {
        pairs
            .into_iter()
            .fold(self, |request, (name, value)| request.query(name, value))
    }

    /// Joins each segment onto the current URL path, left to right, with
    /// filesystem-style semantics: redundant separators collapse and
    /// `.`/`..` resolve lexically, clamping at the root. An empty iterator
    /// is a no-op.
    #[must_use]
    pub fn path<I>(mut self, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for segment in segments {
            self.target.push_path_segment(segment.as_ref());
        }
        self
    }

    // -- Payload mutators --

    /// Sets the request body, resolving its encoding from the input's kind.
    /// Form parameters are form-serialized and structured values are
    /// JSON-serialized; text and bytes pass through as an opaque buffer.
    /// Calling any `body*` method again replaces the previous payload
    /// entirely.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if serializing the payload fails.
    pub fn body(mut self, data: impl Into<BodyInput>) -> Result<Self, EncodeError> {
        self.payload = Some(Payload::resolve(data.into(), None)?);
        Ok(self)
    }

    /// Sets the request body with an explicit encoding. Form parameters
    /// still win over the hint; a structured value with a `Form` hint is
    /// form-serialized; anything else passes through unchanged under the
    /// hinted encoding.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if serializing the payload fails.
    pub fn body_as(
        mut self,
        data: impl Into<BodyInput>,
        encoding: Encoding,
    ) -> Result<Self, EncodeError> {
        self.payload = Some(Payload::resolve(data.into(), Some(encoding))?);
        Ok(self)
    }

    /// Sets a JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if JSON serialization fails.
    pub fn body_json<T: Serialize + ?Sized>(mut self, data: &T) -> Result<Self, EncodeError> {
        self.payload = Some(Payload::json(data)?);
        Ok(self)
    }

    /// Sets a URL-encoded form body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if form serialization fails.
    pub fn body_form<T: Serialize + ?Sized>(mut self, data: &T) -> Result<Self, EncodeError> {
        self.payload = Some(Payload::form(data)?);
        Ok(self)
    }

    // -- Header mutators --

    /// Writes one header. Names are normalized to lowercase, so later
    /// writes overwrite earlier ones for the same logical header regardless
    /// of casing, and explicit writes always beat derived defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderError`] if the name or value is not valid
    /// HTTP header material.
    pub fn header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, InvalidHeaderError> {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes()).context(NameSnafu)?;
        let value = HeaderValue::from_str(value.as_ref()).context(ValueSnafu)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Writes one header per entry, in iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderError`] on the first invalid name or value.
    pub fn headers<I, K, V>(self, entries: I) -> Result<Self, InvalidHeaderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        entries
            .into_iter()
            .try_fold(self, |request, (name, value)| request.header(name, value))
    }

    /// Overwrites the `user-agent` header by joining `fragments` with
    /// single spaces. No default fragments survive this call. The default
    /// identity string is only applied at send time when no `user-agent`
    /// header exists, so the most recently written value always wins.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderError`] if the joined string is not a valid
    /// header value.
    pub fn agent<I>(self, fragments: I) -> Result<Self, InvalidHeaderError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let joined = fragments
            .into_iter()
            .map(|fragment| fragment.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(" ");
        self.header(USER_AGENT.as_str(), joined)
    }

    /// Sets the `authorization` header to `Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderError`] if the token is not valid header
    /// material.
    pub fn auth(self, token: impl AsRef<str>) -> Result<Self, InvalidHeaderError> {
        self.auth_with_scheme(token, "Bearer")
    }

    /// Sets the `authorization` header to `<scheme> <token>`, or to the
    /// bare token when `scheme` is empty. This is an explicit header write
    /// and wins over any derived default.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderError`] if the result is not valid header
    /// material.
    pub fn auth_with_scheme(
        self,
        token: impl AsRef<str>,
        scheme: &str,
    ) -> Result<Self, InvalidHeaderError> {
        let value = if scheme.is_empty() {
            token.as_ref().to_owned()
        } else {
            format!("{scheme} {}", token.as_ref())
        };
        self.header(AUTHORIZATION.as_str(), value)
    }

    // -- Transport mutators --

    /// Sets the send timeout. Stored as a [`Duration`]; engine adapters
    /// scale it to their native unit.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the redirect cap. Accepts an exact count or a boolean toggle
    /// via [`Redirects`]; a cap of `0` means redirects are not followed.
    #[must_use]
    pub fn follow(mut self, redirects: impl Into<Redirects>) -> Self {
        self.max_redirects = redirects.into().cap();
        self
    }

    /// Merges one raw engine override. Overrides are applied last during
    /// assembly, field by field, so a caller who knows the dispatch's
    /// native field names (`method`, `body`, `timeout`, `redirects`,
    /// `headers`) can override anything the builder derived. Unrecognized
    /// keys are forwarded to the engine untouched.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Merges one raw engine override per entry, in iteration order.
    #[must_use]
    pub fn options<I, K, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        entries
            .into_iter()
            .fold(self, |request, (key, value)| request.option(key, value))
    }

    // -- HTTP method mutators --

    /// Sets the HTTP verb directly.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the verb to `GET` (the default).
    #[must_use]
    pub fn get(self) -> Self {
        self.method(Method::GET)
    }

    /// Sets the verb to `POST`.
    #[must_use]
    pub fn post(self) -> Self {
        self.method(Method::POST)
    }

    /// Sets the verb to `PUT`.
    #[must_use]
    pub fn put(self) -> Self {
        self.method(Method::PUT)
    }

    /// Sets the verb to `PATCH`.
    #[must_use]
    pub fn patch(self) -> Self {
        self.method(Method::PATCH)
    }

    /// Sets the verb to `DELETE`.
    #[must_use]
    pub fn delete(self) -> Self {
        self.method(Method::DELETE)
    }

    // -- Send orchestration --

    /// Freezes the descriptor into a [`Dispatch`]: derives a content-type
    /// from the payload encoding when none was written explicitly, fills
    /// the default `user-agent` when none exists, then merges raw overrides
    /// on top of everything.
    fn assemble(mut self) -> Result<Dispatch, OverrideError> {
        if let Some(payload) = &self.payload
            && !self.headers.contains_key(CONTENT_TYPE)
            && let Some(content_type) = payload.encoding().content_type()
        {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        if !self.headers.contains_key(USER_AGENT) {
            self.headers
                .insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }

        let mut dispatch = Dispatch {
            url: self.target.into_url(),
            method: self.method,
            headers: self.headers,
            body: self.payload.map(Payload::into_bytes),
            timeout: self.timeout,
            max_redirects: self.max_redirects,
            extra: Map::new(),
        };
        dispatch.apply_overrides(self.options)?;

        Ok(dispatch)
    }

    /// Assembles the request and dispatches it through `engine`, exactly
    /// once. Consumes the builder; clone it first to send the same request
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Overrides`] if raw overrides could not be
    /// applied, or [`SendError::Transport`] with the engine's own error,
    /// unchanged, if the engine rejects the request.
    pub async fn send<E: HttpEngine>(
        self,
        engine: &E,
    ) -> Result<E::Response, SendError<E::Error, <E::Response as EngineResponse>::Error>> {
        let dispatch = self.assemble().context(OverridesSnafu)?;
        engine.send(dispatch).await.context(TransportSnafu)
    }

    /// Sends the request and decodes the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the send fails, the body cannot be read, or
    /// the body is not valid JSON for `T`.
    pub async fn json<T: DeserializeOwned, E: HttpEngine>(
        self,
        engine: &E,
    ) -> Result<T, SendError<E::Error, <E::Response as EngineResponse>::Error>> {
        let body = self.raw(engine).await?;
        serde_json::from_slice(&body).context(DecodeSnafu)
    }

    /// Sends the request and decodes the response body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the send fails, the body cannot be read, or
    /// the body is not valid UTF-8.
    pub async fn text<E: HttpEngine>(
        self,
        engine: &E,
    ) -> Result<String, SendError<E::Error, <E::Response as EngineResponse>::Error>> {
        let body = self.raw(engine).await?;
        String::from_utf8(body.to_vec()).context(TextSnafu)
    }

    /// Sends the request and returns the response body as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the send fails or the body cannot be read.
    pub async fn raw<E: HttpEngine>(
        self,
        engine: &E,
    ) -> Result<Bytes, SendError<E::Error, <E::Response as EngineResponse>::Error>> {
        let response = self.send(engine).await?;
        response.body().await.context(ReadSnafu)
    }

    /// Sends the request and returns the response body as an owned byte
    /// vector.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the send fails or the body cannot be read.
    pub async fn blob<E: HttpEngine>(
        self,
        engine: &E,
    ) -> Result<Vec<u8>, SendError<E::Error, <E::Response as EngineResponse>::Error>> {
        Ok(self.raw(engine).await?.to_vec())
    }
}

/// Errors that can occur while sending a request and decoding its response.
///
/// Transport and body-read failures carry the engine's own error types
/// through unchanged; the builder adds no retry logic and never downgrades
/// a failure.
#[derive(Debug, Snafu)]
pub enum SendError<EngineErr: crate::Error + 'static, BodyErr: crate::Error + 'static> {
    /// Raw engine overrides could not be applied during assembly.
    #[snafu(display("failed to apply raw engine overrides"))]
    Overrides {
        /// The underlying override error.
        source: OverrideError,
    },
    /// The engine rejected the request (connection failure, timeout
    /// exceeded, too many redirects).
    #[snafu(display("HTTP engine rejected the request"))]
    Transport {
        /// The engine's error, propagated unchanged.
        source: EngineErr,
    },
    /// The response body could not be read.
    #[snafu(display("failed to read response body"))]
    Read {
        /// The underlying error when reading the response body.
        source: BodyErr,
    },
    /// The response body is not valid JSON for the requested type.
    #[snafu(display("failed to decode response body as JSON"))]
    Decode {
        /// The underlying deserialization error.
        source: serde_json::Error,
    },
    /// The response body is not valid UTF-8.
    #[snafu(display("response body is not valid UTF-8"))]
    Text {
        /// The underlying conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl<EngineErr: crate::Error, BodyErr: crate::Error> crate::Error
    for SendError<EngineErr, BodyErr>
{
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source } => source.is_retryable(),
            Self::Read { source } => source.is_retryable(),
            Self::Overrides { .. } | Self::Decode { .. } | Self::Text { .. } => false,
        }
    }
}
