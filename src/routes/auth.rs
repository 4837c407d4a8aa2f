use crate::{
    auth::{authenticate, hash_password, AuthResponse, LoginRequest, RegisterRequest, RegisterResponse},
    error::AppError,
    models::NewUser,
    state::AppState,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Register a new user
///
/// Hashes the password and inserts the user. A taken username is detected by
/// the store's uniqueness constraint and answered with 409.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let RegisterRequest { username, password } = register_data.into_inner();

    let cost = state.limits.bcrypt_cost;
    let password_hash = web::block(move || hash_password(&password, cost)).await??;

    let user = state
        .timed(state.store.create_user(NewUser {
            username,
            password_hash,
        }))
        .await
        .map_err(|err| {
            if let AppError::Conflict(_) = err {
                log::info!("registration rejected: username taken");
            }
            err
        })?;

    log::info!("registered user {} ({})", user.id, user.username);
    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User created".into(),
        user_id: user.id,
    }))
}

/// Login user
///
/// Verifies the credentials and returns a bearer token for this user. Nothing
/// about the login is remembered server-side; later requests identify
/// themselves through the token alone.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = state
        .timed(authenticate(
            &*state.store,
            &login_data.username,
            &login_data.password,
        ))
        .await?;

    match user {
        Some(user) => {
            let token = state.tokens.issue(user.id, &user.username)?;
            log::info!("user {} logged in", user.id);
            Ok(HttpResponse::Ok().json(AuthResponse {
                message: "User login".into(),
                token,
                user_id: user.id,
            }))
        }
        None => {
            log::info!("failed login for username {:?}", login_data.username);
            Err(AppError::Unauthorized("Invalid username or password".into()))
        }
    }
}

/// List every registered user. Debug aid; password hashes are never included.
#[get("/allusers")]
pub async fn all_users(state: web::Data<AppState>) -> Result<impl Responder, AppError> {
    let users = state.timed(state.store.list_users()).await?;
    Ok(HttpResponse::Ok().json(json!({ "users": users })))
}
