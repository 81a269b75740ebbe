use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, LoaderId, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, FrameId, NavigateParams};
use chromiumoxide::page::Page;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use kbo_core::error::AppError;
use kbo_core::session::{
    BrowserEngine, BrowserHandle, LaunchProfile, PageHandle, PageProfile, ResourceKind,
};
use tokio::task::JoinHandle;

/// Lifecycle event Chromium fires once at most two connections have been
/// in flight for 500 ms.
const NETWORK_IDLE_EVENT: &str = "networkAlmostIdle";

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches headless Chromium via the Chrome DevTools Protocol.
///
/// Pages opened on the resulting browser carry the profile's user agent
/// and viewport, and abort requests for blocked resource kinds before they
/// leave the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumEngine;

impl ChromiumEngine {
    pub fn new() -> Self {
        Self
    }

    /// Tries to locate the real Chrome/Chromium binary when the launch
    /// profile names none.
    ///
    /// Snap-packaged Chromium exposes a wrapper at `/snap/bin/chromium` that
    /// strips unknown flags, so the real binary inside the snap is checked
    /// before the usual system paths. `None` lets `chromiumoxide` do its own
    /// lookup.
    pub fn find_chrome_binary() -> Option<PathBuf> {
        [
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }
}

impl BrowserEngine for ChromiumEngine {
    type Browser = ChromiumBrowser;

    async fn launch(&self, profile: &LaunchProfile) -> Result<ChromiumBrowser, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .enable_request_intercept();

        if let Some(bin) = profile
            .executable
            .clone()
            .or_else(Self::find_chrome_binary)
        {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        for arg in &profile.args {
            builder = builder.arg(arg.as_str());
        }

        let config = builder
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(ChromiumBrowser { browser, handler })
    }
}

pub struct ChromiumBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    async fn configure(page: &Page, profile: &PageProfile) -> Result<JoinHandle<()>, AppError> {
        page.execute(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
            .await
            .map_err(cdp_error)?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(profile.viewport.width),
            i64::from(profile.viewport.height),
            1.0,
            false,
        ))
        .await
        .map_err(cdp_error)?;

        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(cdp_error)?;
        let page = page.clone();
        let profile = profile.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let kind = resource_kind(&event.resource_type);
                let outcome = if profile.blocks(kind) {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    tracing::debug!(error = %e, "Intercepted request already settled");
                }
            }
        }))
    }
}

impl BrowserHandle for ChromiumBrowser {
    type Page = ChromiumPage;

    async fn new_page(&self, profile: &PageProfile) -> Result<ChromiumPage, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to open page: {e}")))?;

        match Self::configure(&page, profile).await {
            Ok(interceptor) => Ok(ChromiumPage { page, interceptor }),
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    tracing::warn!(error = %close_err, "Failed to close unconfigured page");
                }
                Err(e)
            }
        }
    }

    async fn close(&mut self) -> Result<(), AppError> {
        let closed = self.browser.close().await.map_err(cdp_error);
        if closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                tracing::warn!(error = %e, "Browser process did not exit cleanly");
            }
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

pub struct ChromiumPage {
    page: Page,
    interceptor: JoinHandle<()>,
}

impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        let mut lifecycle = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(cdp_error)?;

        let navigation = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to navigate to {url}: {e}")))?
            .result;
        if let Some(error) = navigation.error_text {
            return Err(AppError::NetworkError(format!(
                "Failed to navigate to {url}: {error}"
            )));
        }

        // Same-document navigation: no new document, nothing left to load.
        let Some(loader_id) = navigation.loader_id else {
            return Ok(());
        };
        let document = LoadedDocument {
            frame_id: navigation.frame_id,
            loader_id,
        };

        while let Some(event) = lifecycle.next().await {
            if document.is_idle(&event) {
                return Ok(());
            }
        }
        Err(AppError::BrowserError(format!(
            "Lifecycle events ended before {url} went idle"
        )))
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), AppError> {
        while self.page.find_element(selector).await.is_err() {
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<String, AppError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| AppError::BrowserError(format!("Script failed: {e}")))?
            .into_value::<String>()
            .map_err(|e| AppError::ParseError(format!("Script returned a non-string: {e}")))
    }

    async fn close(self) -> Result<(), AppError> {
        self.interceptor.abort();
        self.page.close().await.map_err(cdp_error)
    }
}

/// The document a navigation committed, identified by frame and loader.
#[derive(Debug)]
struct LoadedDocument {
    frame_id: FrameId,
    loader_id: LoaderId,
}

impl LoadedDocument {
    /// Only the navigated frame's own document counts; idle events from
    /// iframes or from the previous document do not.
    fn is_idle(&self, event: &EventLifecycleEvent) -> bool {
        event.name == NETWORK_IDLE_EVENT
            && event.frame_id == self.frame_id
            && event.loader_id == self.loader_id
    }
}

fn cdp_error(e: chromiumoxide::error::CdpError) -> AppError {
    AppError::BrowserError(e.to_string())
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}
