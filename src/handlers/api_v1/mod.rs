pub mod steps;
pub mod types;
pub mod work_items;
pub mod workflows;

use actix_web::{
    web, Error, HttpRequest, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    error::JsonPayloadError,
    middleware::{from_fn, Next},
};

use crate::auth::middleware::require_auth;
use crate::errors::AppError;
use crate::handlers::auth_handlers;
use crate::state::{Alerts, Cases};

/// CSRF protection for REST API mutation endpoints.
///
/// Rejects POST/PUT/PATCH/DELETE requests that don't have
/// Content-Type: application/json. Browsers cannot send cross-origin JSON
/// with cookies via a simple form POST, so the header check doubles as a
/// CSRF guard. GET requests are exempt.
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    use actix_web::http::Method;

    let method = req.method().clone();

    if method == Method::POST
        || method == Method::PUT
        || method == Method::PATCH
        || method == Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Malformed JSON bodies become the same 400 shape as validation failures.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    AppError::Validation(vec![err.to_string()]).into()
}

/// JSON extractor settings for the API scope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error)
}

/// Configure API v1 routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());

    cfg.service(
        web::scope("/session")
            .wrap(from_fn(require_json_content_type))
            .route("", web::post().to(auth_handlers::login))
            .route("", web::delete().to(auth_handlers::logout)),
    );
    cfg.service(
        web::scope("/steps")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::get().to(steps::list))
            .route("", web::post().to(steps::create))
            .route("/{id}", web::get().to(steps::read))
            .route("/{id}", web::put().to(steps::update))
            .route("/{id}", web::patch().to(steps::patch))
            .route("/{id}", web::delete().to(steps::delete))
            .route("/{id}/transitions", web::get().to(steps::transitions)),
    );
    cfg.service(
        web::scope("/workflows")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::get().to(workflows::list))
            .route("", web::post().to(workflows::create))
            .route("/{id}", web::delete().to(workflows::delete)),
    );
    // bulk-step-change BEFORE /{id} to avoid routing conflict
    cfg.service(
        web::scope("/alerts")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("/bulk-step-change", web::post().to(work_items::bulk_step_change::<Alerts>))
            .route("", web::post().to(work_items::create::<Alerts>))
            .route("/{id}", web::get().to(work_items::read::<Alerts>))
            .route("/{id}/step", web::post().to(work_items::change_step::<Alerts>))
            .route("/{id}/history", web::get().to(work_items::history::<Alerts>)),
    );
    cfg.service(
        web::scope("/cases")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("/bulk-step-change", web::post().to(work_items::bulk_step_change::<Cases>))
            .route("", web::post().to(work_items::create::<Cases>))
            .route("/{id}", web::get().to(work_items::read::<Cases>))
            .route("/{id}/step", web::post().to(work_items::change_step::<Cases>))
            .route("/{id}/history", web::get().to(work_items::history::<Cases>)),
    );
}
