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
    models::{Todo, User},
    serializers::TodoPayload,
    AppState,
};

#[utoipa::path(get, path = "/api/todos/", tag = "todo",
    responses((status = 200, body = [Todo])),
    security(("bearer" = []))
)]
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.store.list_todos(user.id).await?))
}

/// `created_at` and the owner are assigned by the server.
#[utoipa::path(post, path = "/api/todos/", tag = "todo", request_body = TodoPayload,
    responses((status = 201, body = Todo), (status = 400, description = "Field errors")),
    security(("bearer" = []))
)]
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(payload) = payload?;
    let todo = state.store.insert_todo(payload.into_new(user.id)?).await?;

    tracing::info!(todo_id = todo.id, user_id = user.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[utoipa::path(get, path = "/api/todos/{id}/", tag = "todo",
    params(("id" = i32, Path, description = "Todo id")),
    responses((status = 200, body = Todo), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn get_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Path(id) = id?;
    state
        .store
        .get_todo(user.id, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn update(
    state: AppState,
    user: User,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
    partial: bool,
) -> Result<Json<Todo>, ApiError> {
    let Path(id) = id?;
    if state.store.get_todo(user.id, id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let Json(payload) = payload?;
    let changes = payload.into_changes(partial)?;
    state
        .store
        .update_todo(user.id, id, changes)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(put, path = "/api/todos/{id}/", tag = "todo", request_body = TodoPayload,
    params(("id" = i32, Path, description = "Todo id")),
    responses((status = 200, body = Todo), (status = 400, description = "Field errors"), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    update(state, user, id, payload, false).await
}

#[utoipa::path(patch, path = "/api/todos/{id}/", tag = "todo", request_body = TodoPayload,
    params(("id" = i32, Path, description = "Todo id")),
    responses((status = 200, body = Todo), (status = 400, description = "Field errors"), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn partial_update_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    update(state, user, id, payload, true).await
}

#[utoipa::path(delete, path = "/api/todos/{id}/", tag = "todo",
    params(("id" = i32, Path, description = "Todo id")),
    responses((status = 204), (status = 404, description = "Not found")),
    security(("bearer" = []))
)]
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if !state.store.delete_todo(user.id, id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(todo_id = id, user_id = user.id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
