use canopy::{Message, Request, Response, WebSocket};
use chrono::{SecondsFormat, Utc};
use http::StatusCode;
use serde_json::{Value, json};
use tracing::warn;

// GET /users
pub async fn list(_req: Request) -> Response {
    Response::json(json!({ "message": "GET all users" }))
}

// POST /users
//
// Echoes the JSON body back under `data`.
pub async fn create(req: Request) -> Response {
    let body: Value = if req.body().is_empty() {
        Value::Null
    } else {
        match req.json() {
            Ok(body) => body,
            Err(e) => {
                return Response::error(StatusCode::BAD_REQUEST, "BAD_REQUEST", format!("Invalid JSON body: {e}"));
            }
        }
    };
    Response::json(json!({ "message": "User created", "data": body }))
}

// WS /users
//
// Answers every text message with `{ echo, timestamp }`. Messages that are
// valid JSON are echoed as JSON, anything else as a string.
pub async fn echo(mut ws: WebSocket, _req: Request) {
    while let Some(message) = ws.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(target: "ws", conn = ws.id(), path = ws.path(), "read failed: {e}");
                break;
            }
        };

        let echo = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        let reply = json!({
            "echo": echo,
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        if ws.send_json(&reply).await.is_err() {
            break;
        }
    }
    // Flushes the reply to a peer's close frame; fails harmlessly if the peer is gone.
    let _ = ws.close().await;
}
