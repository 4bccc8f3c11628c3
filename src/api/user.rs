use canopy::{Request, Response};
use serde_json::json;

// GET /users/:id
pub async fn get(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(json!({ "message": "GET user", "id": id }))
}
