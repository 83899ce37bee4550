use actix_session::Session;

use crate::errors::AppError;
use crate::models::user::User;

const USERNAME_KEY: &str = "username";
const PERMISSIONS_KEY: &str = "permissions";

/// Permission codes held by the logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(pub Vec<String>);

impl Permissions {
    pub fn has(&self, code: &str) -> bool {
        self.0.iter().any(|p| p == code)
    }

    pub fn from_csv(csv: &str) -> Self {
        let codes = csv
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Permissions(codes)
    }
}

/// Store the user's identity and permissions in the session.
pub fn sign_in(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    session
        .insert(USERNAME_KEY, &user.username)
        .and_then(|_| session.insert(PERMISSIONS_KEY, &user.permissions))
        .map_err(|e| AppError::Session(e.to_string()))
}

/// Username of the logged-in user, used as the actor on audit and history
/// records.
pub fn current_actor(session: &Session) -> Result<String, AppError> {
    match session.get::<String>(USERNAME_KEY) {
        Ok(Some(username)) => Ok(username),
        Ok(None) => Err(AppError::Unauthorized),
        Err(e) => Err(AppError::Session(e.to_string())),
    }
}

pub fn get_permissions(session: &Session) -> Result<Permissions, AppError> {
    match session.get::<String>(PERMISSIONS_KEY) {
        Ok(Some(csv)) => Ok(Permissions::from_csv(&csv)),
        Ok(None) => Err(AppError::Unauthorized),
        Err(e) => Err(AppError::Session(e.to_string())),
    }
}

/// Check permission and return the actor; fails with `Unauthorized` when no
/// one is logged in and `PermissionDenied` when the code is missing.
pub fn require_permission(session: &Session, code: &str) -> Result<String, AppError> {
    let actor = current_actor(session)?;
    if get_permissions(session)?.has(code) {
        Ok(actor)
    } else {
        Err(AppError::PermissionDenied(code.to_string()))
    }
}
