use actix_session::SessionExt;
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

use super::session;

/// Guard for the `/api/v1` scopes other than `/session`.
///
/// A request whose session carries no signed-in username is answered with
/// `401` and `{"error": "Authentication required"}` before reaching a
/// handler; permission checks happen per handler.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if session::current_actor(&req.get_session()).is_err() {
        let response = HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Authentication required"
        }));
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
