use companytrack::config::Settings;
use companytrack::{create_app, db, AppState};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    let db_conn = db::connect(&settings.database_url).await?;
    let bind_addr = settings.bind_addr;

    // Run our server
    let app = create_app(AppState::new(db_conn, settings));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
