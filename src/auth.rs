use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{db, models::SessionRow, state::AppState};

pub const SESSION_COOKIE: &str = "sb_session";

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Look a user up and check the password against its stored hash. Returns the
/// session created for the match, or `None` for unknown users and bad
/// passwords alike.
pub async fn authenticate_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Option<SessionRow> {
    let user = db::find_user_by_username(&state.db, username)
        .await
        .ok()
        .flatten()?;

    if !verify_password(password, &user.password_hash) {
        return None;
    }

    db::create_session(&state.db, &user).await.ok()
}

/// Resolve the caller's session from the request cookie. Stale or forged
/// cookies simply resolve to `None`.
pub async fn current_session(state: &AppState, req: &HttpRequest) -> Option<SessionRow> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    db::find_session(&state.db, cookie.value()).await
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn session_cookie(req: &HttpRequest, session_id: &str) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, session_id.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(14));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn clear_session_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let hash = hash_password("topiary-42").unwrap();
        assert!(verify_password("topiary-42", &hash));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hash = hash_password("topiary-42").unwrap();
        assert!(!verify_password("topiary-43", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("same-input").unwrap();
        let second = hash_password("same-input").unwrap();
        assert_ne!(first, second);
    }
}
