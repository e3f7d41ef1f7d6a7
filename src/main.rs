use std::sync::Arc;

use form_progress::storage::PostgresStorage;
use form_progress::{db, routes, services, state};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");
    let store = Arc::new(PostgresStorage::new(pool));

    // Spawn background retention sweep.
    let _retention =
        services::retention::spawn_retention_sweep(store.clone(), services::retention::sweep_interval_from_env());

    let app = routes::app(state::AppState::new(store));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "form-progress server listening");
    axum::serve(listener, app).await.expect("server failed");
}
