//! A validated request target.
//!
//! [`Target`] is a newtype over [`Url`] that guarantees the URL is absolute
//! and was parsed successfully at construction. It can be built from common
//! string and URL types via [`IntoTarget`]. All query and path mutation the
//! builder performs goes through this type; character escaping is delegated
//! to the [`url`] crate.

use std::convert::Infallible;
use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, Snafu};
use url::Url;

/// Error returned when a request target is not an absolute, parseable URL.
#[derive(Debug, Snafu)]
#[snafu(display("only absolute URLs are supported"))]
pub struct InvalidUrlError {
    /// The underlying parse error.
    source: url::ParseError,
}

impl crate::Error for InvalidUrlError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// A validated absolute request target.
///
/// Once constructed, the target can only be mutated through the builder's
/// query and path operations, both of which keep it absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(Url);

impl Serialize for Target {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.into_target().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Target {
    /// Returns the inner [`Url`].
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the target as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Consumes the [`Target`] and returns the inner [`Url`].
    #[must_use]
    pub fn into_url(self) -> Url {
        self.0
    }

    /// Appends one query pair, preserving any existing pairs with the same
    /// name.
    pub(crate) fn append_query_pair(&mut self, name: &str, value: &str) {
        self.0.query_pairs_mut().append_pair(name, value);
    }

    /// Joins `segment` onto the current path, lexically.
    pub(crate) fn push_path_segment(&mut self, segment: &str) {
        let joined = lexical_join(self.0.path(), segment);
        self.0.set_path(&joined);
    }
}

/// Joins `segment` onto `base` with filesystem-style semantics: redundant
/// separators collapse, `.` disappears, and `..` pops the previous segment,
/// clamping at the root. Purely lexical, no disk access.
fn lexical_join(base: &str, segment: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in base.split('/').chain(segment.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let mut path = String::from("/");
    path.push_str(&parts.join("/"));
    path
}

/// Conversion trait for types that can be turned into a [`Target`].
pub trait IntoTarget {
    /// The error type returned if the conversion fails.
    type Error;

    /// Attempts to convert this value into a [`Target`].
    fn into_target(self) -> Result<Target, Self::Error>;
}

impl IntoTarget for Target {
    type Error = Infallible;

    fn into_target(self) -> Result<Target, Self::Error> {
        Ok(self)
    }
}

impl IntoTarget for Url {
    // A `url::Url` is absolute by construction.
    type Error = Infallible;

    fn into_target(self) -> Result<Target, Self::Error> {
        Ok(Target(self))
    }
}

impl IntoTarget for &str {
    type Error = InvalidUrlError;

    fn into_target(self) -> Result<Target, Self::Error> {
        Url::parse(self).map(Target).context(InvalidUrlSnafu)
    }
}

impl IntoTarget for String {
    type Error = InvalidUrlError;

    fn into_target(self) -> Result<Target, Self::Error> {
        self.as_str().into_target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_url_round_trips() {
        let target = "https://api.example.com/v1?x=1".into_target().unwrap();
        assert_eq!(
            target.as_url(),
            &Url::parse("https://api.example.com/v1?x=1").unwrap()
        );
    }

    #[test]
    fn relative_and_malformed_urls_are_rejected() {
        for bad in ["", "users/42", "/users/42", "://nope", "https//x"] {
            let err = bad.into_target().unwrap_err();
            assert_eq!(err.to_string(), "only absolute URLs are supported");
        }
    }

    #[test]
    fn parsed_url_converts_infallibly() {
        let url = Url::parse("https://example.com/a").unwrap();
        let target = url.clone().into_target().unwrap();
        assert_eq!(target.as_url(), &url);
    }

    #[test]
    fn path_join_appends_segments() {
        let mut target = "https://example.com".into_target().unwrap();
        target.push_path_segment("users");
        target.push_path_segment("42");
        assert_eq!(target.as_url().path(), "/users/42");
    }

    #[test]
    fn path_join_collapses_separators_and_dots() {
        let mut target = "https://example.com/a/b".into_target().unwrap();
        target.push_path_segment(".//c");
        assert_eq!(target.as_url().path(), "/a/b/c");
    }

    #[test]
    fn path_join_resolves_parent_segments_lexically() {
        let mut target = "https://example.com/a/b".into_target().unwrap();
        target.push_path_segment("../c");
        assert_eq!(target.as_url().path(), "/a/c");
    }

    #[test]
    fn path_join_clamps_parent_at_root() {
        let mut target = "https://example.com/a".into_target().unwrap();
        target.push_path_segment("../../../b");
        assert_eq!(target.as_url().path(), "/b");
    }

    #[test]
    fn query_pairs_preserve_duplicates() {
        let mut target = "https://example.com".into_target().unwrap();
        target.append_query_pair("a", "1");
        target.append_query_pair("a", "2");
        assert_eq!(target.as_url().query(), Some("a=1&a=2"));
    }
}
