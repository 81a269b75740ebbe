use std::future::Future;

use crate::error::AppError;
use crate::table::TableRow;

/// Fetches raw HTML content from a URL (static mode).
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Loads a page in a live browser and reads table rows from its DOM
/// (rendered mode).
pub trait Renderer: Send + Sync {
    /// Navigates to `url`, waits for `ready_selector` when given, and returns
    /// every row matching `row_selector` as seen by the page's own scripts.
    fn render_rows(
        &self,
        url: &str,
        ready_selector: Option<&str>,
        row_selector: &str,
    ) -> impl Future<Output = Result<Vec<TableRow>, AppError>> + Send;

    /// Releases the browser, if one is running.
    fn shutdown(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}
