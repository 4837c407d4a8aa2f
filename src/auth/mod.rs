pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use actix_web::web;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::User;
use crate::store::Store;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer};

lazy_static! {
    // Regex for username validation: alphanumeric, dots, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap();
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    /// Not capped: an overlong password simply fails to match.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username: 1 to 64 characters of letters, digits, `.`, `_` or `-`.
    #[validate(
        length(min = 1, max = 64),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, dots, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Password for the new account. bcrypt only looks at the first 72 bytes.
    #[validate(length(min = 1, max = 72))]
    pub password: String,
}

/// Response body of a successful registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

/// Response structure after a successful login.
/// Contains the bearer token and the ID of the authenticated user.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    /// The JWT to present as `Authorization: Bearer <token>`.
    pub token: String,
    pub user_id: i64,
}

/// Checks a username/password pair against the store.
///
/// `Ok(None)` means the credentials are wrong (unknown user or password
/// mismatch). `Err` is reserved for infrastructure failures such as an
/// unreachable store, which the caller turns into a per-request error.
pub async fn authenticate(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(user) = store.find_user_by_username(username).await? else {
        return Ok(None);
    };

    let candidate = password.to_owned();
    let stored_hash = user.password_hash.clone();
    let matches = web::block(move || verify_password(&candidate, &stored_hash)).await??;

    Ok(matches.then_some(user))
}
