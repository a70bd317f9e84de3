//! Payload model and encoding resolution.
//!
//! A request payload is resolved into a wire-ready [`Payload`] at the moment
//! the builder's `body` call runs, never at send time. The resolution
//! precedence lives in [`Payload::resolve`]. Form parameters always win and
//! structured values default to JSON; everything else passes through as an
//! opaque buffer.

use std::fmt::Display;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::Value;
use snafu::{ResultExt as _, Snafu};

/// The serialization discipline chosen for a request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// JSON-serialized payload, dispatched as `application/json`.
    Json,
    /// URL-encoded pairs, dispatched as `application/x-www-form-urlencoded`.
    Form,
    /// Already-encoded bytes or text; no content-type is derived.
    Buffer,
}

impl Encoding {
    /// The content-type header value derived for this encoding when the
    /// caller has not set one explicitly. Opaque buffers derive none.
    #[must_use]
    pub fn content_type(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("application/json"),
            Self::Form => Some("application/x-www-form-urlencoded"),
            Self::Buffer => None,
        }
    }
}

impl FromStr for Encoding {
    type Err = UnknownEncodingError;

    /// Case-insensitive: `"json"`, `"form"`, and `"buffer"` are recognized.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "form" => Ok(Self::Form),
            "buffer" => Ok(Self::Buffer),
            _ => UnknownEncodingSnafu { name: s }.fail(),
        }
    }
}

/// Error returned when parsing an [`Encoding`] from an unrecognized name.
#[derive(Debug, Snafu)]
#[snafu(display("unknown payload encoding {name:?}"))]
pub struct UnknownEncodingError {
    name: String,
}

/// Ordered `application/x-www-form-urlencoded` key/value pairs.
///
/// A payload built from [`FormParams`] is always form-encoded, regardless of
/// any encoding hint passed alongside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams(Vec<(String, String)>);

impl FormParams {
    /// Creates an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one pair; duplicate names are preserved in order.
    #[must_use]
    pub fn append(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.0.push((name.into(), value.to_string()));
        self
    }

    /// Returns true if no pairs have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn serialized(&self) -> Result<String, EncodeError> {
        serde_html_form::to_string(&self.0).context(FormSnafu)
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |params, (k, v)| params.append(k, v))
    }
}

/// Raw body input, tagged by kind.
///
/// The tag drives the encoding resolution in [`Payload::resolve`]; `From`
/// impls cover the common input types so callers rarely name the variants.
#[derive(Debug, Clone)]
pub enum BodyInput {
    /// URL-encoded form parameters. Always form-encoded.
    Form(FormParams),
    /// A structured value. JSON-encoded unless a hint says otherwise.
    Structured(Value),
    /// Text, passed through unchanged.
    Text(String),
    /// Raw bytes, passed through unchanged.
    Bytes(Bytes),
}

impl From<FormParams> for BodyInput {
    fn from(params: FormParams) -> Self {
        Self::Form(params)
    }
}

impl From<Value> for BodyInput {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<String> for BodyInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for BodyInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for BodyInput {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for BodyInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

impl From<&[u8]> for BodyInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(bytes))
    }
}

/// A wire-ready payload: bytes tagged with the encoding that produced them.
#[derive(Debug, Clone)]
pub struct Payload {
    encoding: Encoding,
    bytes: Bytes,
}

impl Payload {
    /// The encoding this payload was resolved with.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The wire bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub(crate) fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// JSON-serializes any serializable value into a wire-ready payload.
    pub(crate) fn json<T: serde::Serialize + ?Sized>(data: &T) -> Result<Self, EncodeError> {
        Ok(Self {
            encoding: Encoding::Json,
            bytes: Bytes::from(serde_json::to_vec(data).context(JsonSnafu)?),
        })
    }

    /// Form-serializes any serializable value into a wire-ready payload.
    pub(crate) fn form<T: serde::Serialize + ?Sized>(data: &T) -> Result<Self, EncodeError> {
        Ok(Self {
            encoding: Encoding::Form,
            bytes: Bytes::from(serde_html_form::to_string(data).context(FormSnafu)?),
        })
    }

    /// Resolves raw input and an optional encoding hint into a wire-ready
    /// payload. Precedence, first match wins:
    ///
    /// 1. Form parameters are form-serialized; the hint is ignored.
    /// 2. A structured value with no hint is JSON-serialized.
    /// 3. A hint picks the encoding: `Form` with a structured value
    ///    serializes its key/value pairs; otherwise the data passes through
    ///    unchanged as already-encoded bytes.
    /// 4. Text and bytes with no hint pass through as an opaque buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when serialization of a structured payload
    /// fails, or when form encoding is requested for a value without
    /// key/value pairs.
    pub(crate) fn resolve(input: BodyInput, hint: Option<Encoding>) -> Result<Self, EncodeError> {
        match (input, hint) {
            (BodyInput::Form(params), _) => Ok(Self {
                encoding: Encoding::Form,
                bytes: Bytes::from(params.serialized()?),
            }),
            (BodyInput::Structured(value), None | Some(Encoding::Json)) => Ok(Self {
                encoding: Encoding::Json,
                bytes: Bytes::from(serde_json::to_vec(&value).context(JsonSnafu)?),
            }),
            (BodyInput::Structured(value), Some(Encoding::Form)) => Ok(Self {
                encoding: Encoding::Form,
                bytes: Bytes::from(form_from_value(&value)?),
            }),
            // A structured value has no canonical byte form; its JSON text
            // stands in, but the Buffer tag means no content-type is derived.
            (BodyInput::Structured(value), Some(Encoding::Buffer)) => Ok(Self {
                encoding: Encoding::Buffer,
                bytes: Bytes::from(serde_json::to_vec(&value).context(JsonSnafu)?),
            }),
            (BodyInput::Text(text), hint) => Ok(Self {
                encoding: hint.unwrap_or(Encoding::Buffer),
                bytes: Bytes::from(text),
            }),
            (BodyInput::Bytes(bytes), hint) => Ok(Self {
                encoding: hint.unwrap_or(Encoding::Buffer),
                bytes,
            }),
        }
    }
}

/// Serializes a structured value's top-level pairs as a form string. Scalar
/// values are coerced to their string form, matching query-string semantics.
fn form_from_value(value: &Value) -> Result<String, EncodeError> {
    let Some(object) = value.as_object() else {
        return FormPairsSnafu.fail();
    };

    let pairs: Vec<(&str, String)> = object
        .iter()
        .map(|(name, v)| {
            let coerced = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.as_str(), coerced)
        })
        .collect();

    serde_html_form::to_string(&pairs).context(FormSnafu)
}

/// Errors raised while resolving a payload in the builder's `body` call.
#[derive(Debug, Snafu)]
pub enum EncodeError {
    /// JSON serialization of a structured payload failed.
    #[snafu(display("failed to serialize JSON payload"))]
    Json {
        /// The underlying serialization error.
        source: serde_json::Error,
    },
    /// Form serialization of the payload failed.
    #[snafu(display("failed to serialize form payload"))]
    Form {
        /// The underlying serialization error.
        source: serde_html_form::ser::Error,
    },
    /// Form encoding was requested for a value without key/value pairs.
    #[snafu(display("form encoding requires a payload with key/value pairs"))]
    FormPairs,
}

impl crate::Error for EncodeError {
    fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn structured_without_hint_is_json() {
        let payload = Payload::resolve(json!({"x": 1}).into(), None).unwrap();
        assert_eq!(payload.encoding(), Encoding::Json);
        assert_eq!(payload.bytes().as_ref(), br#"{"x":1}"#);
    }

    #[test]
    fn structured_with_form_hint_serializes_pairs() {
        let payload = Payload::resolve(json!({"x": 1}).into(), Some(Encoding::Form)).unwrap();
        assert_eq!(payload.encoding(), Encoding::Form);
        assert_eq!(payload.bytes().as_ref(), b"x=1");
    }

    #[test]
    fn form_params_win_over_any_hint() {
        let params = FormParams::new().append("x", "1");
        for hint in [None, Some(Encoding::Json), Some(Encoding::Buffer)] {
            let payload = Payload::resolve(params.clone().into(), hint).unwrap();
            assert_eq!(payload.encoding(), Encoding::Form);
            assert_eq!(payload.bytes().as_ref(), b"x=1");
        }
    }

    #[test]
    fn form_params_preserve_duplicates_in_order() {
        let params = FormParams::new().append("a", 1).append("a", 2);
        let payload = Payload::resolve(params.into(), None).unwrap();
        assert_eq!(payload.bytes().as_ref(), b"a=1&a=2");
    }

    #[test]
    fn structured_with_buffer_hint_is_not_tagged_json() {
        let payload = Payload::resolve(json!({"x": 1}).into(), Some(Encoding::Buffer)).unwrap();
        assert_eq!(payload.encoding(), Encoding::Buffer);
        assert_eq!(payload.encoding().content_type(), None);
    }

    #[test]
    fn text_and_bytes_default_to_buffer() {
        let payload = Payload::resolve("plain".into(), None).unwrap();
        assert_eq!(payload.encoding(), Encoding::Buffer);
        assert_eq!(payload.bytes().as_ref(), b"plain");

        let payload = Payload::resolve(vec![1u8, 2, 3].into(), None).unwrap();
        assert_eq!(payload.encoding(), Encoding::Buffer);
        assert_eq!(payload.bytes().as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn text_with_form_hint_passes_through_unchanged() {
        let payload = Payload::resolve("a=1&b=2".into(), Some(Encoding::Form)).unwrap();
        assert_eq!(payload.encoding(), Encoding::Form);
        assert_eq!(payload.bytes().as_ref(), b"a=1&b=2");
    }

    #[test]
    fn form_hint_on_a_scalar_is_an_error() {
        let err = Payload::resolve(json!(42).into(), Some(Encoding::Form)).unwrap_err();
        assert!(matches!(err, EncodeError::FormPairs));
    }

    #[test]
    fn typed_values_serialize_to_json_and_form() {
        #[derive(serde::Serialize)]
        struct Login {
            user: &'static str,
            pin: u32,
        }

        let login = Login {
            user: "amy",
            pin: 1234,
        };
        assert_eq!(
            Payload::json(&login).unwrap().bytes().as_ref(),
            br#"{"user":"amy","pin":1234}"#
        );
        assert_eq!(
            Payload::form(&login).unwrap().bytes().as_ref(),
            b"user=amy&pin=1234"
        );
    }

    #[test]
    fn encoding_names_parse_case_insensitively() {
        assert_eq!("JSON".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("Form".parse::<Encoding>().unwrap(), Encoding::Form);
        assert_eq!("buffer".parse::<Encoding>().unwrap(), Encoding::Buffer);
        assert!("yaml".parse::<Encoding>().is_err());
    }

    #[test]
    fn content_types_match_encodings() {
        assert_eq!(Encoding::Json.content_type(), Some("application/json"));
        assert_eq!(
            Encoding::Form.content_type(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(Encoding::Buffer.content_type(), None);
    }
}
