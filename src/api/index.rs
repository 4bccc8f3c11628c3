use canopy::{Request, Response};
use serde_json::json;

// GET /
pub async fn get(_req: Request) -> Response {
    Response::json(json!({ "success": true }))
}
