use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{CreatedUser, SigninRequest, SigninResponse, SignupRequest},
        jwt::AuthUser,
        password::{hash_password, verify_password},
        repo::{is_unique_violation, PublicUser, User},
    },
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/current_user", get(current_user))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<CreatedUser>), ApiError> {
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        warn!("signup with missing fields");
        return Err(ApiError::Validation("All fields are required."));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email."));
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        ApiError::DataStore("Error creating user.")
    })?;

    // The unique constraint on email is the duplicate check; two
    // concurrent signups for the same address cannot both insert.
    let user = match User::create(&state.db, &payload.name, &payload.email, &hash).await {
        Ok(u) => u,
        Err(ref e) if is_unique_violation(e) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::Conflict);
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(ApiError::DataStore("Error creating user."));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(CreatedUser {
            id: user.id,
            name: user.name,
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(mut payload): Json<SigninRequest>,
) -> Result<Json<SigninResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        warn!("signin with missing fields");
        return Err(ApiError::Validation("Email and password are required."));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            // Same message as a wrong password, no account enumeration
            warn!(email = %payload.email, "signin unknown email");
            return Err(ApiError::Auth("Invalid email or password."));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(ApiError::DataStore("Error logging in."));
        }
    };

    if !verify_password(&payload.password, &user.password_hash) {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(ApiError::Auth("Invalid email or password."));
    }

    let token = state.jwt.sign(user.id, &user.email).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::DataStore("Error logging in.")
    })?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(SigninResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        token,
    }))
}

#[instrument(skip(state, claims), fields(user_id = %claims.sub))]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = PublicUser::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| {
            error!(error = %e, "fetch current user failed");
            ApiError::DataStore("Error fetching user.")
        })?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "valid token for missing user");
            ApiError::NotFound
        })?;

    Ok(Json(user))
}
