use std::sync::LazyLock;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use super::{Dispatch, EngineResponse, HttpEngine};

impl HttpEngine for reqwest::Client {
    /// The response type is `reqwest::Response`.
    type Response = reqwest::Response;
    /// The error type is `reqwest::Error`.
    type Error = reqwest::Error;

    /// Sends a [`Dispatch`] using the `reqwest::Client`.
    ///
    /// The per-request timeout is applied from the dispatch. The redirect
    /// cap is enforced by `reqwest`'s client-level redirect policy, so
    /// [`Dispatch::max_redirects`] must be mirrored in the client's
    /// configuration; [`Dispatch::extra`] entries are ignored by this
    /// adapter.
    async fn send(&self, dispatch: Dispatch) -> Result<Self::Response, Self::Error> {
        let mut builder = self
            .request(dispatch.method, dispatch.url.as_str())
            .headers(dispatch.headers)
            .timeout(dispatch.timeout);

        if let Some(body) = dispatch.body {
            builder = builder.body(body);
        }

        let request = builder.build()?;
        reqwest::Client::execute(self, request).await
    }
}

impl HttpEngine for LazyLock<reqwest::Client> {
    /// The response type is `reqwest::Response`.
    type Response = reqwest::Response;
    /// The error type is `reqwest::Error`.
    type Error = reqwest::Error;

    /// Sends a [`Dispatch`] using the lazily initialized `reqwest::Client`.
    async fn send(&self, dispatch: Dispatch) -> Result<Self::Response, Self::Error> {
        LazyLock::force(self).send(dispatch).await
    }
}

impl EngineResponse for reqwest::Response {
    type Error = reqwest::Error;

    /// Returns the HTTP status code of the `reqwest::Response`.
    fn status(&self) -> StatusCode {
        self.status()
    }

    /// Returns the `reqwest::Response`'s headers.
    fn headers(&self) -> HeaderMap {
        self.headers().clone()
    }

    /// Consumes the `reqwest::Response` and returns its full body.
    async fn body(self) -> Result<Bytes, Self::Error> {
        self.bytes().await
    }
}

impl crate::Error for reqwest::Error {
    fn is_retryable(&self) -> bool {
        self.is_connect() || self.is_timeout()
    }
}
