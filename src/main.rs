use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use text_summarizer::{
    api::routes::create_router,
    config::Config,
    scraper::HtmlArticleExtractor,
    store::{self, SummaryStore},
    summarizer::FrequencySummarizer,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;

    let pool = store::connect(&config.database_url).await?;
    let store = SummaryStore::new(pool);
    store.init().await?;
    tracing::info!(database = %config.database_url, "database ready");

    let extractor = Arc::new(HtmlArticleExtractor::new(config.fetch_timeout)?);
    let summarizer = Arc::new(FrequencySummarizer::for_language(&config.summary_language)?);

    // Create application state
    let app_state = AppState::new(config, store, extractor, summarizer);

    // Forget idle clients once per window
    let limiter = app_state.rate_limiter.clone();
    let window = app_state.config.rate_limit_window;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(window);
        loop {
            interval.tick().await;
            limiter.sweep(Instant::now());
        }
    });

    // Build the router with routes
    let app = create_router(app_state);

    // Create the listener
    let listener = TcpListener::bind(server_addr).await?;

    // Start the server
    tracing::info!("Listening on {}", server_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
