use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::{password, rate_limit::RateLimiter, session};
use crate::errors::AppError;
use crate::handlers::api_v1::types::{LoginRequest, SessionResponse};
use crate::state::AppState;

/// POST /api/v1/session - Log in with username and password
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<LoginRequest>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    // Rate-limit check BEFORE any database access
    let ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    if limiter.is_blocked(ip) {
        log::warn!("Login blocked for {ip}: too many failed attempts");
        return Ok(HttpResponse::TooManyRequests().json(serde_json::json!({
            "error": "Too many failed login attempts. Please try again later."
        })));
    }

    let found = state.users.find_by_username(body.username.trim()).await?;
    let verified = match &found {
        Some(u) => password::verify_password(&body.password, &u.password_hash)?,
        None => false,
    };

    match found {
        Some(user) if verified => {
            limiter.clear(ip);
            session::sign_in(&session, &user)?;
            log::info!("User {} logged in", user.username);

            let permissions = session::Permissions::from_csv(&user.permissions).0;
            Ok(HttpResponse::Ok().json(SessionResponse {
                username: user.username,
                permissions,
            }))
        }
        _ => {
            limiter.record_failure(ip);
            log::warn!("Failed login for '{}' from {ip}", body.username);
            Err(AppError::Unauthorized)
        }
    }
}

/// DELETE /api/v1/session - Log out
pub async fn logout(session: Session) -> Result<HttpResponse, AppError> {
    if let Ok(actor) = session::current_actor(&session) {
        log::info!("User {actor} logged out");
    }
    session.purge();
    Ok(HttpResponse::NoContent().finish())
}
