//! Quorum server - weighted-vote treasury governance and bounty tracking

use axum::{routing::get, Router};
use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quorum::governance::{AccountId, GovernanceEngine};
use quorum::store::Store;
use quorum::{websocket, AppState};

#[derive(Parser, Debug)]
#[command(name = "quorum", about = "Weighted-vote treasury governance server")]
struct Args {
    /// Address to bind the server on
    #[arg(long, env = "QUORUM_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:quorum.db")]
    database_url: String,

    /// Owner account seeded into a fresh deployment. Ignored when a
    /// persisted state already exists.
    #[arg(long, env = "QUORUM_OWNER")]
    owner: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quorum=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Database connection
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Store::new(pool);

    // Restore persisted governance state or seed a fresh one
    let engine = match store.load_snapshot().await? {
        Some(state) => {
            tracing::info!("Restored governance state at height {}", state.height);
            GovernanceEngine::from_state(state)
        }
        None => {
            let owner = AccountId::from(args.owner.as_str());
            tracing::info!("Seeding fresh governance state owned by {}", owner);
            let engine = GovernanceEngine::new(owner);
            store.save_snapshot(&engine.snapshot().await).await?;
            engine
        }
    };

    let state = AppState::new(engine, store);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket::handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
