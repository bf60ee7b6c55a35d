//! CSRF (Cross-Site Request Forgery) protection
//!
//! Every POST form carries a hidden `csrf_token` field holding the token
//! stored in the session cookie:
//!
//! ```html,ignore
//! <input type="hidden" name="csrf_token" value="{{ client.get_csrf_token() }}">
//! ```
//!
//! Handlers check it before touching anything:
//!
//! ```rust,ignore
//! validate_csrf_token(&cookies, &form.csrf_token)?;
//! ```

use crate::error::AppError;
use actix_session::{Session, SessionInsertError};
use rand::{distributions::Alphanumeric, Rng};

pub const CSRF_TOKEN_LENGTH: usize = 32;
const CSRF_SESSION_KEY: &str = "csrf_token";

pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Get or create the CSRF token for the current session.
///
/// Called whenever a ClientCtx is built, so every rendered form has a token.
pub fn get_or_create_csrf_token(session: &Session) -> Result<String, SessionInsertError> {
    match session.get::<String>(CSRF_SESSION_KEY) {
        Ok(Some(token)) => Ok(token),
        _ => {
            let token = generate_csrf_token();
            session.insert(CSRF_SESSION_KEY, token.clone())?;
            Ok(token)
        }
    }
}

/// Rejects a state-changing request whose token does not match the session's.
pub fn validate_csrf_token(session: &Session, provided_token: &str) -> Result<(), AppError> {
    let expected_token = session
        .get::<String>(CSRF_SESSION_KEY)
        .map_err(|e| AppError::Internal(format!("Failed to read CSRF token: {}", e)))?
        .ok_or(AppError::Forbidden("Your session has expired. Please try again."))?;

    if expected_token.is_empty() || provided_token != expected_token {
        log::warn!("CSRF token validation failed");
        return Err(AppError::Forbidden("Invalid form token. Please try again."));
    }

    Ok(())
}
