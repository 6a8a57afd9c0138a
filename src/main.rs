use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use pain_care_bot::session::SessionStore;
use pain_care_bot::{AppState, ChatService, Config, router};

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pain_care_bot=info,tower_http=info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    // Refuses to start without a usable API key
    let config = Config::load().context("Failed to load configuration")?;
    let bind = config.bind_addr()?;

    let chat = ChatService::from_config(&config)?;
    let sessions = Arc::new(SessionStore::with_limits(
        config.session_idle_ttl(),
        config.server.max_sessions,
    ));
    let _sweeper = sessions.spawn_sweeper(SESSION_SWEEP_PERIOD);
    let app = router(
        AppState::with_sessions(chat.clone(), sessions),
        config.server.bearer_token.clone(),
    );

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        model = %chat.model(),
        session_idle_minutes = config.server.session_idle_minutes,
        max_sessions = config.server.max_sessions,
        auth = %config.server.bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
        "Starting {}",
        config.server.name
    );

    axum::serve(listener, app).await?;
    Ok(())
}
