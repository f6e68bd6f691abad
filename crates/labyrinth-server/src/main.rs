use tracing_subscriber::EnvFilter;

use labyrinth_server::build_app;
use labyrinth_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::load();
    config.validate();

    let addr = config.listen_addr.clone();
    let (app, _state) = build_app(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Labyrinth sync server listening on {addr}");

    axum::serve(listener, app).await.expect("Server error");
}
