use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};

use crate::{
    auth,
    error::ApiError,
    models::{NewUser, User},
    serializers::{RegisterPayload, TokenRequest, TokenResponse},
    AppState,
};

#[utoipa::path(post, path = "/api/register/", tag = "account", request_body = RegisterPayload,
    responses((status = 201, body = User), (status = 400, description = "Field errors"))
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(payload) = payload?;
    let registration = payload.clean()?;
    let password_hash = auth::hash_password(&registration.password)?;

    let user = state
        .store
        .create_user(NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(post, path = "/api/token/", tag = "account", request_body = TokenRequest,
    responses((status = 200, body = TokenResponse), (status = 401, description = "Bad credentials"))
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(credentials) = payload?;

    let found = state.store.find_user_by_username(&credentials.username).await?;
    let authenticated = match &found {
        Some(user) => auth::verify_password(&credentials.password, &user.password_hash),
        None => auth::reject_unknown_user(&credentials.password),
    };
    let user = found.filter(|_| authenticated).ok_or_else(|| {
        ApiError::AuthenticationFailed("No active account found with the given credentials".into())
    })?;

    let access = state.tokens.create_token(user.id)?;
    Ok(Json(TokenResponse { access }))
}

#[utoipa::path(get, path = "/api/me/", tag = "account",
    responses((status = 200, body = User)),
    security(("bearer" = []))
)]
pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

/// Removes the account and, by cascade, everything it owns.
#[utoipa::path(delete, path = "/api/me/", tag = "account",
    responses((status = 204)),
    security(("bearer" = []))
)]
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_user(user.id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(user_id = user.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
