use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    app::internal,
    auth::{
        dto::{AuthResponse, JwtKeys, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::AuthUser,
        repo_types::User,
        services::{authenticate, register as register_user, AuthError},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    match register_user(&state.credentials, &payload.username, &payload.password).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user.into()))),
        Err(AuthError::AlreadyExists) => Err((StatusCode::CONFLICT, "Username taken".into())),
        Err(e @ (AuthError::InvalidUsername | AuthError::EmptyPassword)) => {
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(AuthError::Internal(e)) => Err(internal(e)),
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = authenticate(&state.credentials, &payload.username, &payload.password)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    state.pantries.open(&user.username).await.map_err(internal)?;

    let response = issue_tokens(&state, user)?;
    info!(username = %response.user.username, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_username(&state.credentials, &claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> StatusCode {
    let closed = state.pantries.close(&username).await;
    info!(%username, closed, "user logged out");
    StatusCode::NO_CONTENT
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_username(&state.credentials, &username)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            error!(%username, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;
    Ok(Json(user.into()))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(&user.username).map_err(internal)?;
    let refresh_token = keys.sign_refresh(&user.username).map_err(internal)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}
