use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};

use crate::{
    error::ApiError,
    models::{Category, User},
    serializers::CategoryPayload,
    AppState,
};

#[utoipa::path(get, path = "/api/categories/", tag = "category",
    responses((status = 200, body = [Category])),
    security(("bearer" = []))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.list_categories(user.id).await?))
}

#[utoipa::path(post, path = "/api/categories/", tag = "category", request_body = CategoryPayload,
    responses((status = 201, body = Category), (status = 400, description = "Field errors")),
    security(("bearer" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let Json(payload) = payload?;
    let category = state.store.insert_category(payload.into_new(user.id)?).await?;

    tracing::info!(category_id = category.id, user_id = user.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(get, path = "/api/categories/{id}/", tag = "category",
    params(("id" = i32, Path, description = "Category id")),
    responses((status = 200, body = Category), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn get_category(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Category>, ApiError> {
    let Path(id) = id?;
    state
        .store
        .get_category(user.id, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn update(
    state: AppState,
    user: User,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
    partial: bool,
) -> Result<Json<Category>, ApiError> {
    let Path(id) = id?;
    // an unknown id is a 404 even when the body is invalid
    if state.store.get_category(user.id, id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let Json(payload) = payload?;
    let changes = payload.into_changes(partial)?;
    state
        .store
        .update_category(user.id, id, changes)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(put, path = "/api/categories/{id}/", tag = "category", request_body = CategoryPayload,
    params(("id" = i32, Path, description = "Category id")),
    responses((status = 200, body = Category), (status = 400, description = "Field errors"), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<Json<Category>, ApiError> {
    update(state, user, id, payload, false).await
}

#[utoipa::path(patch, path = "/api/categories/{id}/", tag = "category", request_body = CategoryPayload,
    params(("id" = i32, Path, description = "Category id")),
    responses((status = 200, body = Category), (status = 400, description = "Field errors"), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn partial_update_category(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<Json<Category>, ApiError> {
    update(state, user, id, payload, true).await
}

/// Todos filed under the category survive with `category: null`.
#[utoipa::path(delete, path = "/api/categories/{id}/", tag = "category",
    params(("id" = i32, Path, description = "Category id")),
    responses((status = 204), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if !state.store.delete_category(user.id, id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(category_id = id, user_id = user.id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
