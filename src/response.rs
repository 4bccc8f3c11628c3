//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! JSON bodies are kept as [`serde_json::Value`] until the response is
//! written, so the [envelope](crate::middleware::envelope) can be applied
//! with the final response time.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::middleware::{cors, envelope};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    OctetStream,  // application/octet-stream  (binary / file download)
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

const JSON: &str = "application/json; charset=utf-8";

// ── Response ─────────────────────────────────────────────────────────────────

pub(crate) enum Body {
    Empty,
    Bytes(Bytes),
    Json(Value),
}

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use canopy::Response;
/// use http::StatusCode;
/// use serde_json::json;
///
/// Response::json(json!({ "message": "GET all users" }));
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// Response::error(StatusCode::BAD_REQUEST, "BAD_REQUEST", "username is required");
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use canopy::Response;
/// use http::StatusCode;
/// use serde_json::json;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(json!({ "id": 42 }));
/// ```
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Body,
}

impl Response {
    /// `200 OK` with an enveloped JSON body.
    pub fn json(body: impl Serialize) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with a `text/plain; charset=utf-8` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: Vec::new(), body: Body::Empty }
    }

    /// JSON error in the `{ "error": { "message", "code" } }` shape.
    pub fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self::builder()
            .status(status)
            .json(json!({ "error": { "message": message.into(), "code": code } }))
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }

    /// Serializes the response, applying the envelope to JSON bodies.
    ///
    /// `head` drops the body but keeps the `content-length` it would have had.
    pub(crate) fn into_inner(self, elapsed: Duration, head: bool) -> http::Response<Full<Bytes>> {
        let body = match self.body {
            Body::Empty => Bytes::new(),
            Body::Bytes(bytes) => bytes,
            Body::Json(value) => match serde_json::to_vec(&envelope::wrap(value, elapsed)) {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) => {
                    warn!(target: "http", "failed to encode response body: {e}");
                    return Self::status(StatusCode::INTERNAL_SERVER_ERROR).into_inner(elapsed, head);
                }
            },
        };

        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!(target: "http", header = %name, "dropping invalid response header"),
            }
        }
        cors::decorate(headers);

        if head {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        } else {
            *response.body_mut() = Full::new(body);
        }
        response
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with an enveloped JSON body.
    ///
    /// A value that fails to serialize turns into a `500` error response.
    pub fn json(self, body: impl Serialize) -> Response {
        match serde_json::to_value(body) {
            Ok(value) => self.finish(JSON, Body::Json(value)),
            Err(e) => {
                warn!(target: "http", "failed to serialize response: {e}");
                Response::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERVER_ERROR",
                    "Failed to serialize response",
                )
            }
        }
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into().into_bytes())
    }

    /// Terminate with a raw body. The envelope is not applied.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type.as_str(), Body::Bytes(body.into()))
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Body::Empty }
    }

    fn finish(self, content_type: &str, body: Body) -> Response {
        let mut headers = vec![(CONTENT_TYPE.as_str().to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, headers, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response { Response::json(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}
