//! Test utilities: mock implementations of the collaborator traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::session::{BrowserEngine, BrowserHandle, LaunchProfile, PageHandle, PageProfile};
use crate::table::TableRow;
use crate::traits::{Fetcher, Renderer};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns queued responses and records requested URLs.
#[derive(Clone, Default)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns an empty document.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub urls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.urls.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body></body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Mock renderer that returns queued row sets and records requested URLs.
#[derive(Clone, Default)]
pub struct MockRenderer {
    responses: Arc<Mutex<Vec<Result<Vec<TableRow>, AppError>>>>,
    pub urls: Arc<Mutex<Vec<String>>>,
    pub shutdowns: Arc<AtomicUsize>,
}

impl MockRenderer {
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self::with_responses(vec![Ok(rows)])
    }

    pub fn with_responses(responses: Vec<Result<Vec<TableRow>, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    pub fn visited(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Renderer for MockRenderer {
    async fn render_rows(
        &self,
        url: &str,
        _ready_selector: Option<&str>,
        _row_selector: &str,
    ) -> Result<Vec<TableRow>, AppError> {
        self.urls.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Vec::new())
        } else {
            responses.remove(0)
        }
    }

    async fn shutdown(&self) -> Result<(), AppError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EngineState {
    launches: usize,
    browsers_closed: usize,
    pages_opened: usize,
    pages_closed: usize,
    visited: Vec<String>,
    last_profile: Option<PageProfile>,
}

/// Mock browser engine that counts launches and page opens/closes.
#[derive(Debug, Clone)]
pub struct MockEngine {
    state: Arc<Mutex<EngineState>>,
    /// Failure message and how many more launches it applies to.
    launch_error: Arc<Mutex<Option<(String, usize)>>>,
    launch_delay: Duration,
    goto_error: Option<String>,
    goto_delay: Duration,
    selector_present: bool,
    payload: String,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            launch_error: Arc::new(Mutex::new(None)),
            launch_delay: Duration::ZERO,
            goto_error: None,
            goto_delay: Duration::ZERO,
            selector_present: true,
            payload: "[]".to_string(),
        }
    }

    /// The next launch fails once with `BrowserError(message)`.
    pub fn with_launch_error(self, message: &str) -> Self {
        self.with_launch_errors(message, 1)
    }

    /// The next `times` launches fail with `BrowserError(message)`.
    pub fn with_launch_errors(self, message: &str, times: usize) -> Self {
        *self.launch_error.lock().unwrap() = Some((message.to_string(), times));
        self
    }

    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// Every navigation fails with `NetworkError(message)`.
    pub fn with_goto_error(mut self, message: &str) -> Self {
        self.goto_error = Some(message.to_string());
        self
    }

    pub fn with_goto_delay(mut self, delay: Duration) -> Self {
        self.goto_delay = delay;
        self
    }

    /// The ready selector never appears.
    pub fn without_selector(mut self) -> Self {
        self.selector_present = false;
        self
    }

    /// String returned by every in-page script evaluation.
    pub fn with_payload(mut self, payload: &str) -> Self {
        self.payload = payload.to_string();
        self
    }

    pub fn launches(&self) -> usize {
        self.state.lock().unwrap().launches
    }

    pub fn browsers_closed(&self) -> usize {
        self.state.lock().unwrap().browsers_closed
    }

    pub fn pages_opened(&self) -> usize {
        self.state.lock().unwrap().pages_opened
    }

    pub fn pages_closed(&self) -> usize {
        self.state.lock().unwrap().pages_closed
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn last_profile(&self) -> Option<PageProfile> {
        self.state.lock().unwrap().last_profile.clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserEngine for MockEngine {
    type Browser = MockBrowser;

    async fn launch(&self, _profile: &LaunchProfile) -> Result<MockBrowser, AppError> {
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }
        self.state.lock().unwrap().launches += 1;
        let failure = match self.launch_error.lock().unwrap().as_mut() {
            Some((message, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Some(message.clone())
            }
            _ => None,
        };
        if let Some(message) = failure {
            return Err(AppError::BrowserError(message));
        }
        Ok(MockBrowser {
            engine: self.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MockBrowser {
    engine: MockEngine,
}

impl BrowserHandle for MockBrowser {
    type Page = MockPage;

    async fn new_page(&self, profile: &PageProfile) -> Result<MockPage, AppError> {
        let mut state = self.engine.state.lock().unwrap();
        state.pages_opened += 1;
        state.last_profile = Some(profile.clone());
        Ok(MockPage {
            engine: self.engine.clone(),
        })
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.engine.state.lock().unwrap().browsers_closed += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockPage {
    engine: MockEngine,
}

impl PageHandle for MockPage {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        self.engine
            .state
            .lock()
            .unwrap()
            .visited
            .push(url.to_string());
        if !self.engine.goto_delay.is_zero() {
            tokio::time::sleep(self.engine.goto_delay).await;
        }
        match &self.engine.goto_error {
            Some(message) => Err(AppError::NetworkError(message.clone())),
            None => Ok(()),
        }
    }

    async fn wait_for_selector(&self, _selector: &str) -> Result<(), AppError> {
        if self.engine.selector_present {
            Ok(())
        } else {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    async fn evaluate(&self, _script: &str) -> Result<String, AppError> {
        Ok(self.engine.payload.clone())
    }

    async fn close(self) -> Result<(), AppError> {
        self.engine.state.lock().unwrap().pages_closed += 1;
        Ok(())
    }
}
