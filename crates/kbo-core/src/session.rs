//! Lifecycle of the single headless browser behind rendered-mode fetches.
//!
//! The browser itself sits behind [`BrowserEngine`] so the lifecycle rules
//! (lazy single launch, one close per page, relaunch after shutdown) hold
//! for any backend. `kbo-client` provides the Chromium implementation.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::DEFAULT_USER_AGENT;
use crate::error::AppError;
use crate::table::{TableRow, decode_rows, rows_script};
use crate::traits::Renderer;

/// Launches browser processes.
pub trait BrowserEngine: Send + Sync {
    type Browser: BrowserHandle;

    fn launch(
        &self,
        profile: &LaunchProfile,
    ) -> impl Future<Output = Result<Self::Browser, AppError>> + Send;
}

/// A running browser process.
pub trait BrowserHandle: Send + Sync {
    type Page: PageHandle;

    /// Opens a page configured per `profile`. A page that fails to
    /// configure is closed before the error is returned.
    fn new_page(
        &self,
        profile: &PageProfile,
    ) -> impl Future<Output = Result<Self::Page, AppError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// One open page. Timeouts are applied by [`SessionManager`], not here.
pub trait PageHandle: Send + Sync {
    /// Navigates and resolves once the network is (almost) idle.
    fn goto(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Resolves once `selector` matches an element.
    fn wait_for_selector(&self, selector: &str)
    -> impl Future<Output = Result<(), AppError>> + Send;

    /// Runs `script` in the page and returns its string result.
    fn evaluate(&self, script: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    fn close(self) -> impl Future<Output = Result<(), AppError>> + Send;
}

pub type PageOf<E> = <<E as BrowserEngine>::Browser as BrowserHandle>::Page;

/// Process-level capabilities passed at launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchProfile {
    /// Explicit browser binary; `None` lets the engine look one up.
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for LaunchProfile {
    /// Headless, sandbox off for containers, no GPU or accelerated canvas,
    /// single process.
    fn default() -> Self {
        Self {
            executable: None,
            args: [
                "--headless=new",
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-accelerated-2d-canvas",
                "--disable-gpu",
                "--no-first-run",
                "--no-zygote",
                "--single-process",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Resource classes a page may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Per-page identity, viewport, and blocked resource classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProfile {
    pub user_agent: String,
    pub viewport: Viewport,
    /// Aborted to save bandwidth; extraction never needs them.
    pub blocked_resources: Vec<ResourceKind>,
}

impl PageProfile {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            viewport: Viewport {
                width: 1920,
                height: 1080,
            },
            blocked_resources: vec![
                ResourceKind::Image,
                ResourceKind::Stylesheet,
                ResourceKind::Font,
                ResourceKind::Media,
            ],
        }
    }

    pub fn blocks(&self, kind: ResourceKind) -> bool {
        self.blocked_resources.contains(&kind)
    }
}

impl Default for PageProfile {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

/// Upper bounds on page loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub navigation: Duration,
    pub selector: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            selector: Duration::from_secs(10),
        }
    }
}

/// Owns at most one browser process, launched on first use.
///
/// Concurrent callers serialize on the launch: the first one starts the
/// browser and everyone else observes that same instance. Each page is owned
/// by the call that opened it and is closed exactly once.
pub struct SessionManager<E: BrowserEngine> {
    engine: E,
    launch: LaunchProfile,
    page: PageProfile,
    timeouts: SessionTimeouts,
    browser: Mutex<Option<E::Browser>>,
}

impl<E: BrowserEngine> SessionManager<E> {
    pub fn new(engine: E) -> Self {
        Self::with_profiles(
            engine,
            LaunchProfile::default(),
            PageProfile::default(),
            SessionTimeouts::default(),
        )
    }

    pub fn with_profiles(
        engine: E,
        launch: LaunchProfile,
        page: PageProfile,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            engine,
            launch,
            page,
            timeouts,
            browser: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.browser.lock().await.is_some()
    }

    /// Launches the browser unless one is already running.
    pub async fn ensure_started(&self) -> Result<(), AppError> {
        let mut slot = self.browser.lock().await;
        if slot.is_none() {
            *slot = Some(self.launch_browser().await?);
        }
        Ok(())
    }

    async fn launch_browser(&self) -> Result<E::Browser, AppError> {
        tracing::info!(args = ?self.launch.args, "Launching headless browser");
        let browser = self.engine.launch(&self.launch).await.inspect_err(|e| {
            tracing::error!(error = %e, "Browser launch failed");
        })?;
        tracing::info!("Headless browser ready");
        Ok(browser)
    }

    /// Opens a configured page, starting the browser if needed.
    pub async fn new_page(&self) -> Result<PageOf<E>, AppError> {
        let mut slot = self.browser.lock().await;
        if slot.is_none() {
            *slot = Some(self.launch_browser().await?);
        }
        let Some(browser) = slot.as_ref() else {
            return Err(AppError::BrowserError("browser is not running".into()));
        };
        browser.new_page(&self.page).await
    }

    /// Opens a page and loads `url` into it, waiting for network idle and
    /// then for `ready_selector`. On failure the page is closed before the
    /// error is returned.
    pub async fn navigate(
        &self,
        url: &str,
        ready_selector: Option<&str>,
    ) -> Result<PageOf<E>, AppError> {
        let page = self.new_page().await?;

        match self.load(&page, url, ready_selector).await {
            Ok(()) => Ok(page),
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Page load failed");
                close_page(page).await;
                Err(e)
            }
        }
    }

    async fn load(
        &self,
        page: &PageOf<E>,
        url: &str,
        ready_selector: Option<&str>,
    ) -> Result<(), AppError> {
        tracing::debug!(url = %url, "Navigating");
        tokio::time::timeout(self.timeouts.navigation, page.goto(url))
            .await
            .map_err(|_| AppError::Timeout(self.timeouts.navigation.as_secs()))??;

        if let Some(selector) = ready_selector {
            tokio::time::timeout(self.timeouts.selector, page.wait_for_selector(selector))
                .await
                .map_err(|_| AppError::Timeout(self.timeouts.selector.as_secs()))??;
        }

        Ok(())
    }

    /// Closes the browser if running. The manager can be started again
    /// afterwards.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let browser = self.browser.lock().await.take();
        if let Some(mut browser) = browser {
            browser.close().await?;
            tracing::info!("Headless browser closed");
        }
        Ok(())
    }
}

async fn close_page<P: PageHandle>(page: P) {
    if let Err(e) = page.close().await {
        tracing::warn!(error = %e, "Failed to close page");
    }
}

impl<E: BrowserEngine> Renderer for SessionManager<E> {
    async fn render_rows(
        &self,
        url: &str,
        ready_selector: Option<&str>,
        row_selector: &str,
    ) -> Result<Vec<TableRow>, AppError> {
        let script = rows_script(row_selector)?;
        let page = self.navigate(url, ready_selector).await?;

        let rows = page
            .evaluate(&script)
            .await
            .and_then(|payload| decode_rows(&payload));
        close_page(page).await;

        rows
    }

    async fn shutdown(&self) -> Result<(), AppError> {
        SessionManager::shutdown(self).await
    }
}
