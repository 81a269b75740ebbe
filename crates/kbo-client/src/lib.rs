#[cfg(feature = "browser")]
pub mod browser;
pub mod fetcher;

#[cfg(feature = "browser")]
pub use browser::{ChromiumBrowser, ChromiumEngine, ChromiumPage};
pub use fetcher::ReqwestFetcher;

#[cfg(feature = "browser")]
use std::sync::Arc;

#[cfg(feature = "browser")]
use kbo_core::{AppError, CrawlerConfig, KboCrawler, SessionManager, TeamRegistry};

/// A crawler over live HTTP and a lazily launched Chromium.
#[cfg(feature = "browser")]
pub type LiveCrawler = KboCrawler<ReqwestFetcher, SessionManager<ChromiumEngine>>;

/// Wires a [`LiveCrawler`] from `config`. No browser is launched until the
/// first rendered-mode crawl.
#[cfg(feature = "browser")]
pub fn build_crawler(config: &CrawlerConfig) -> Result<LiveCrawler, AppError> {
    let fetcher = ReqwestFetcher::new(config)?;
    let session = SessionManager::with_profiles(
        ChromiumEngine::new(),
        config.launch_profile(),
        config.page_profile(),
        config.session_timeouts(),
    );

    Ok(KboCrawler::new(
        fetcher,
        session,
        Arc::new(TeamRegistry::kbo()),
        config,
    ))
}
