use std::process::ExitCode;

use axum::http::HeaderValue;
use deadpool_diesel::postgres::{Manager, Pool};
use todo_back::{auth::TokenKeys, config::Config, store::PgStore, AppState};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // a missing .env file is fine; the variables may come from the environment
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_back=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // set up connection pool
    let manager = Manager::new(config.database_url.clone(), deadpool_diesel::Runtime::Tokio1);
    let pool = Pool::builder(manager)
        .max_size(config.database_pool_size)
        .build()?;

    let store = PgStore::new(pool);
    let applied = store.migrate().await?;
    tracing::info!("applied {} pending migration(s)", applied);

    let state = AppState::new(
        store,
        TokenKeys::new(&config.jwt_secret, config.access_token_ttl_minutes),
    );

    let mut app = todo_back::app(state);
    if !config.cors_allowed_origins.is_empty() {
        let origins = config
            .cors_allowed_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::debug!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
