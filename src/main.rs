use pokedex_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
    seed,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_sessions::{ExpiredDeletion, MemoryStore};
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the data store, the first-boot seeds and the
/// HTTP server, in that order. Any failure before the listener binds is fatal,
/// except the catalogue seed, which only logs.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pokedex_portal=debug,tower_http=info,axum=trace".into());

    // 3. Logging format follows the environment: pretty locally, JSON in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Data store: Postgres when configured, otherwise the in-memory store.
    let (repo, pool) = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let postgres = PostgresRepository::new(pool.clone());
            postgres
                .migrate()
                .await
                .expect("FATAL: Failed to create database tables.");
            (Arc::new(postgres) as RepositoryState, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store (data is lost on exit)");
            (Arc::new(InMemoryRepository::new()) as RepositoryState, None)
        }
    };

    let app_state = AppState::new(repo, config.clone());

    // 5. First-boot seeds. Missing seed credentials on an empty user store are fatal;
    // an unreachable catalogue source is not.
    app_state
        .auth
        .seed_accounts(config.seed_accounts.as_ref())
        .await
        .expect("FATAL: Failed to seed initial accounts.");

    let client = reqwest::Client::new();
    match seed::seed_catalogue(&app_state.repo, &client, &config).await {
        Ok(report) => tracing::info!(?report, "catalogue seed finished"),
        Err(e) => tracing::error!(error = %e, "catalogue seed failed"),
    }

    // 6. Session store follows the data store: Postgres-backed when configured.
    let app = match &pool {
        Some(pool) => {
            let session_store = PostgresStore::new(pool.clone());
            session_store
                .migrate()
                .await
                .expect("FATAL: Failed to create the session table.");
            if let Err(e) = session_store.delete_expired().await {
                tracing::warn!(error = %e, "failed to purge expired sessions");
            }
            create_router(app_state, session_store)
        }
        None => create_router(app_state, MemoryStore::default()),
    };

    // 7. Server Startup

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", address);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        config.port
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Disconnected from database");
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
