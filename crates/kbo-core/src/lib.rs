pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod models;
pub mod retry;
pub mod session;
pub mod table;
pub mod teams;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::CrawlerConfig;
pub use crawler::{CrawlEngine, KboCrawler};
pub use error::AppError;
pub use models::{
    CrawlResult, GameStatus, LiveGameSnapshot, ScheduledGame, SplitRecord, Standing, Team,
    compute_hash,
};
pub use retry::{ResilientExecutor, RetryPolicy};
pub use session::{
    BrowserEngine, BrowserHandle, LaunchProfile, PageHandle, PageProfile, ResourceKind,
    SessionManager, SessionTimeouts,
};
pub use table::TableRow;
pub use teams::TeamRegistry;
pub use traits::{Fetcher, Renderer};
