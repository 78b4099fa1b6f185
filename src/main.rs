use helpdesk_gateway::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{IdentityStoreState, InMemoryIdentityStore, PostgresIdentityStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging and the identity store, then serves the router.
/// Any configuration fault stops the process before it accepts a single request.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().unwrap_or_else(|e| panic!("FATAL: {e}"));

    // 2. Logging: pretty locally, JSON in production.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "helpdesk_gateway=debug,tower_http=info".into());

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
    if config.uses_default_secret() {
        tracing::warn!(
            "JWT_SECRET is not set: tokens are signed with the public default secret. \
             Never run like this outside local development."
        );
    }

    // 3. Identity store
    let repo: IdentityStoreState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: Failed to run database migrations.");

            Arc::new(PostgresIdentityStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set: using the in-memory store with demo accounts");
            Arc::new(
                InMemoryIdentityStore::seeded()
                    .expect("FATAL: Failed to hash demo account passwords."),
            )
        }
    };

    // 4. Application state; the access table is checked for unreachable rules.
    let app_state = AppState::new(config, repo);

    let policy = app_state.gateway.policy();
    for index in policy.shadowed_rules() {
        tracing::warn!(
            rule = index,
            prefix = %policy.rules()[index].prefix,
            "access rule is shadowed by an earlier, broader prefix and will never match"
        );
    }

    // 5. Router and server
    let bind_addr = app_state.config.bind_addr.clone();
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
