use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marquee_server::config::{Config, StorageBackend};
use marquee_server::routes::create_routes;
use marquee_server::seed;
use marquee_server::state::AppState;
use marquee_server::store::{MemoryStore, PgStore, Store};
use marquee_server::utils::AppError;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => Arc::new(
            PgStore::connect(&config.database_url, config.database_max_connections)
                .await
                .expect("Failed to connect to database"),
        ),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if config.seed_on_start {
        match seed::run(store.as_ref()).await {
            Ok(_) | Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("Failed to seed catalog: {e}"),
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST and PORT must form a socket address");
    let app = create_routes(AppState::new(store, config));

    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
