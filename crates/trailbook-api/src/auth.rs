use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use trailbook_db::models::UserRow;
use trailbook_types::api::{
    AuthResponse, Claims, LoginRequest, RegisterRequest, UserProfile, UserPublic, UserResponse,
};

use crate::error::{ApiError, join_error};
use crate::routes::AppState;

/// Token lifetime; expiry forces re-login, there is no refresh.
const TOKEN_LIFETIME_HOURS: i64 = 72;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(digest)
}

pub fn verify_password(password: &str, digest: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(digest).map_err(|e| anyhow!("stored digest unreadable: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + chrono::Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

fn required(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(full_name), Some(email), Some(password)) = (
        required(req.full_name),
        required(req.email),
        required(req.password),
    ) else {
        return Err(ApiError::Validation("All fields are required".into()));
    };

    let user_id = Uuid::new_v4();

    // Hashing and the uniqueness check both block; run them off the runtime.
    // The check-and-insert holds one connection lock, so two concurrent
    // registrations for the same email cannot both get through.
    let db = state.db.clone();
    let created = {
        let full_name = full_name.clone();
        let email = email.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let digest = hash_password(&password)?;
            db.create_user_if_email_free(&user_id.to_string(), &full_name, &email, &digest)
        })
        .await
        .map_err(join_error)?
        .map_err(ApiError::from)?
    };

    if !created {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let access_token = issue_token(&state.jwt_secret, user_id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            error: false,
            user: UserPublic { full_name, email },
            access_token,
            message: "Registration Successful".into(),
        }),
    ))
}

enum LoginOutcome {
    NoUser,
    BadPassword,
    Ok(UserRow),
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (required(req.email), required(req.password)) else {
        return Err(ApiError::Validation("Email and password are required".into()));
    };

    let db = state.db.clone();
    let outcome = tokio::task::spawn_blocking(move || -> anyhow::Result<LoginOutcome> {
        let Some(user) = db.get_user_by_email(&email)? else {
            return Ok(LoginOutcome::NoUser);
        };
        if !verify_password(&password, &user.password)? {
            return Ok(LoginOutcome::BadPassword);
        }
        Ok(LoginOutcome::Ok(user))
    })
    .await
    .map_err(join_error)?
    .map_err(ApiError::from)?;

    let user = match outcome {
        LoginOutcome::NoUser => {
            return Err(ApiError::Validation("User does not exist".into()));
        }
        LoginOutcome::BadPassword => {
            return Err(ApiError::Validation("Invalid credentials".into()));
        }
        LoginOutcome::Ok(user) => user,
    };

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow!("stored user id unparseable: {}", e))?;
    let access_token = issue_token(&state.jwt_secret, user_id)?;

    Ok(Json(AuthResponse {
        error: false,
        user: UserPublic {
            full_name: user.full_name,
            email: user.email,
        },
        access_token,
        message: "Login Successful".into(),
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let uid = claims.sub.to_string();
    let user = tokio::task::spawn_blocking(move || db.get_user_by_id(&uid))
        .await
        .map_err(join_error)?
        .map_err(ApiError::from)?
        // the token outlived the user record
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(UserResponse {
        user: UserProfile {
            id: claims.sub,
            full_name: user.full_name,
            email: user.email,
            created_at: user.created_at,
        },
        message: String::new(),
    }))
}
