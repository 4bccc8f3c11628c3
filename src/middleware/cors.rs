//! Permissive CORS: any origin, the common methods, automatic preflight.

use http::{HeaderMap, StatusCode};

use crate::response::Response;

pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
pub const ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
pub const REQUEST_METHOD: &str = "access-control-request-method";
pub const REQUEST_HEADERS: &str = "access-control-request-headers";

const METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Answers a preflight request, if `headers` describe one.
pub fn preflight(headers: &HeaderMap) -> Option<Response> {
    headers.get(REQUEST_METHOD)?;

    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW_METHODS, METHODS)
        .header("vary", REQUEST_HEADERS);
    if let Some(requested) = headers.get(REQUEST_HEADERS).and_then(|v| v.to_str().ok()) {
        builder = builder.header(ALLOW_HEADERS, requested);
    }
    Some(builder.no_body())
}

/// Adds the origin header every response carries.
pub fn decorate(headers: &mut HeaderMap) {
    headers.insert(ALLOW_ORIGIN, http::HeaderValue::from_static("*"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_options_is_not_a_preflight() {
        assert!(preflight(&HeaderMap::new()).is_none());
    }

    #[test]
    fn preflight_echoes_requested_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_METHOD, "POST".parse().unwrap());
        headers.insert(REQUEST_HEADERS, "content-type,authorization".parse().unwrap());

        let response = preflight(&headers).unwrap();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(
            response
                .headers
                .iter()
                .any(|(k, v)| k == ALLOW_HEADERS && v == "content-type,authorization")
        );
    }
}
