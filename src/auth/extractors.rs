use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// The caller identified by the request's own bearer token.
///
/// Intended for routes behind `AuthMiddleware`, which verifies the token and
/// stores its `Claims` in the request extensions. Ownership of new tasks is
/// always attributed from this value, never from state left by another request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) => ready(Ok(AuthenticatedUser {
                id: claims.sub,
                username: claims.username.clone(),
            })),
            None => {
                let err = AppError::Unauthorized(
                    "No authenticated user on this request".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}
