pub mod api;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod scraper;
pub mod source;
pub mod store;
pub mod summarizer;

use std::sync::Arc;
use config::Config;
use rate_limit::RateLimiter;
use scraper::ArticleExtractor;
use store::SummaryStore;
use summarizer::Summarizer;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: SummaryStore,
    pub rate_limiter: Arc<RateLimiter>,
    pub extractor: Arc<dyn ArticleExtractor>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: SummaryStore,
        extractor: Arc<dyn ArticleExtractor>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window);
        Self {
            config: Arc::new(config),
            store,
            rate_limiter: Arc::new(rate_limiter),
            extractor,
            summarizer,
        }
    }
}
