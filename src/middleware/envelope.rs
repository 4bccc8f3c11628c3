//! JSON response envelope.
//!
//! Every JSON body leaves the server as
//!
//! ```text
//! { "responseTime": "1.52ms", "error": null, "message": "ok", "data": { … } }
//! ```
//!
//! `error` and `message` are lifted out of the handler's payload, whatever
//! else the payload carries ends up in `data`. A payload with
//! `"overwrite": true` skips the envelope: the marker is dropped and the
//! remaining fields are sent as they are.
//!
//! The envelope is applied when the response is serialized, which happens
//! exactly once per response.

use std::time::Duration;

use serde_json::{Map, Value, json};

/// Field that opts a payload out of the envelope.
pub const OVERWRITE: &str = "overwrite";

/// Wraps `payload` in the envelope, stamping it with `elapsed`.
pub fn wrap(payload: Value, elapsed: Duration) -> Value {
    let mut fields = match payload {
        Value::Object(fields) => fields,
        Value::Null => Map::new(),
        other => return envelope(elapsed, Value::Null, Value::Null, other),
    };

    if fields.get(OVERWRITE) == Some(&Value::Bool(true)) {
        fields.shift_remove(OVERWRITE);
        return Value::Object(fields);
    }

    let error = fields.shift_remove("error").unwrap_or(Value::Null);
    let message = fields.shift_remove("message").unwrap_or(Value::Null);
    let data = if fields.is_empty() { Value::Null } else { Value::Object(fields) };
    envelope(elapsed, error, message, data)
}

fn envelope(elapsed: Duration, error: Value, message: Value, data: Value) -> Value {
    json!({
        "responseTime": format_elapsed(elapsed),
        "error": error,
        "message": message,
        "data": data,
    })
}

/// Renders a duration in the largest unit below the next 1000x boundary.
///
/// Nanoseconds are whole numbers; every other unit has two decimals.
pub fn format_elapsed(elapsed: Duration) -> String {
    let nanos = elapsed.as_nanos();
    let n = nanos as f64;
    if nanos < 1_000 {
        format!("{nanos}ns")
    } else if nanos < 1_000_000 {
        format!("{:.2}µs", n / 1e3)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", n / 1e6)
    } else {
        format!("{:.2}s", n / 1e9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_only_payload() {
        let body = wrap(json!({ "message": "ok" }), Duration::from_micros(500));
        assert_eq!(
            body,
            json!({ "responseTime": "500.00µs", "error": null, "message": "ok", "data": null })
        );
    }

    #[test]
    fn overwrite_bypasses_envelope() {
        let body = wrap(json!({ "overwrite": true, "foo": 1 }), Duration::from_millis(3));
        assert_eq!(body, json!({ "foo": 1 }));
    }

    #[test]
    fn overwrite_must_be_literally_true() {
        let body = wrap(json!({ "overwrite": "yes" }), Duration::from_nanos(10));
        assert_eq!(body["data"], json!({ "overwrite": "yes" }));
    }

    #[test]
    fn remaining_fields_become_data_in_order() {
        let body = wrap(
            json!({ "username": "octo", "error": null, "count": 2 }),
            Duration::from_nanos(12),
        );
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["message"], Value::Null);
        let keys: Vec<_> = body["data"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["username", "count"]);

        let top: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
        assert_eq!(top, ["responseTime", "error", "message", "data"]);
    }

    #[test]
    fn error_payload_populates_error() {
        let body = wrap(
            json!({ "error": { "message": "nope", "code": "NOT_FOUND" } }),
            Duration::from_secs(2),
        );
        assert_eq!(body["responseTime"], "2.00s");
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["data"], Value::Null);
    }

    #[test]
    fn null_and_scalar_payloads() {
        let empty = wrap(Value::Null, Duration::ZERO);
        assert_eq!(empty["data"], Value::Null);
        assert_eq!(empty["responseTime"], "0ns");

        let list = wrap(json!([1, 2]), Duration::ZERO);
        assert_eq!(list["data"], json!([1, 2]));
    }

    #[test]
    fn unit_boundaries() {
        assert_eq!(format_elapsed(Duration::from_nanos(999)), "999ns");
        assert_eq!(format_elapsed(Duration::from_nanos(1_000)), "1.00µs");
        assert_eq!(format_elapsed(Duration::from_nanos(1_234_567)), "1.23ms");
        assert_eq!(format_elapsed(Duration::from_millis(999)), "999.00ms");
        assert_eq!(format_elapsed(Duration::from_millis(1_500)), "1.50s");
    }
}
