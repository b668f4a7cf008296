// Comment Moderation Server

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use comment_moderation::{api::create_app, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("comment_moderation=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    let app = create_app(app_state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Comment moderation server starting on http://{}", addr);
    tracing::info!("  GET    /posts/comments/{{post_id}}            - Public feed");
    tracing::info!("  GET    /posts/comments/private/{{post_id}}    - Content creator feed");
    tracing::info!("  GET    /posts/comments/non-approved         - Supervisor queue");
    tracing::info!("  GET    /posts/comments/reports              - Reported content");
    tracing::info!("  GET    /posts/comments/ban                  - Banned content");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
