pub mod auth;
pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod serializers;
pub mod store;

use std::{sync::Arc, time::Duration};

use axum::{
    http::Request,
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::TokenKeys,
    docs::ApiDoc,
    handlers::{accounts, categories, todos},
    store::Store,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(store: impl Store + 'static, tokens: TokenKeys) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
        }
    }
}

/// Builds the full application: `/api` routes, OpenAPI docs and request tracing.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/categories/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id/",
            get(categories::get_category)
                .put(categories::update_category)
                .patch(categories::partial_update_category)
                .delete(categories::delete_category),
        )
        .route("/todos/", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/todos/:id/",
            get(todos::get_todo)
                .put(todos::update_todo)
                .patch(todos::partial_update_todo)
                .delete(todos::delete_todo),
        )
        .route("/me/", get(accounts::me).delete(accounts::delete_me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_authentication,
        ));

    let public = Router::new()
        .route("/register/", post(accounts::register))
        .route("/token/", post(accounts::obtain_token));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", protected.merge(public))
        .layer(
            TraceLayer::new_for_http()
                .on_request(|req: &Request<_>, _span: &Span| {
                    tracing::info!("{} {}", req.method(), req.uri());
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::info!("{} in {:?}", res.status(), latency);
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    tracing::error!("{}", error);
                }),
        )
        .with_state(state)
}
