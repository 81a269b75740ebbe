use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use crate::config::CrawlerConfig;
use crate::error::AppError;
use crate::extract;
use crate::models::{CrawlResult, LiveGameSnapshot, ScheduledGame, Standing};
use crate::retry::ResilientExecutor;
use crate::table::{TableRow, parse_table_rows};
use crate::teams::TeamRegistry;
use crate::traits::{Fetcher, Renderer};

/// Rows of the site's data tables.
pub const TABLE_ROWS: &str = ".tData tbody tr";

/// Present once a rendered data table is on the page.
pub const TABLE_READY: &str = ".tData";

/// Site-agnostic crawling capability: static fetch, rendered fetch, and
/// retry wrapping. Site crawlers compose it rather than extend it.
pub struct CrawlEngine<F, R>
where
    F: Fetcher,
    R: Renderer,
{
    fetcher: F,
    renderer: R,
    executor: ResilientExecutor,
}

impl<F, R> CrawlEngine<F, R>
where
    F: Fetcher,
    R: Renderer,
{
    pub fn new(fetcher: F, renderer: R, executor: ResilientExecutor) -> Self {
        Self {
            fetcher,
            renderer,
            executor,
        }
    }

    pub fn source(&self) -> &str {
        self.executor.source()
    }

    /// Static mode: plain GET, then parse the markup locally.
    pub async fn static_rows(&self, url: &str, row_selector: &str) -> Result<Vec<TableRow>, AppError> {
        tracing::info!("Fetching {}", url);
        let html = self.fetcher.fetch(url).await?;
        tracing::debug!("Fetched {} bytes of HTML", html.len());
        parse_table_rows(&html, row_selector)
    }

    /// Rendered mode: load in the browser and read rows from the live DOM.
    pub async fn rendered_rows(
        &self,
        url: &str,
        ready_selector: Option<&str>,
        row_selector: &str,
    ) -> Result<Vec<TableRow>, AppError> {
        tracing::info!("Rendering {}", url);
        self.renderer
            .render_rows(url, ready_selector, row_selector)
            .await
    }

    pub async fn execute<T, Op, Fut>(&self, operation: Op) -> CrawlResult<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.executor.execute(operation).await
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.renderer.shutdown().await
    }
}

/// Crawler for koreabaseball.com.
///
/// Standings come from a server-rendered page (static mode); schedules and
/// live scores are script-rendered (rendered mode). Every crawl returns a
/// [`CrawlResult`]; nothing here panics or returns a bare error.
pub struct KboCrawler<F, R>
where
    F: Fetcher,
    R: Renderer,
{
    engine: CrawlEngine<F, R>,
    teams: Arc<TeamRegistry>,
    base_url: String,
    range_pause: Duration,
}

impl<F, R> KboCrawler<F, R>
where
    F: Fetcher,
    R: Renderer,
{
    pub fn new(fetcher: F, renderer: R, teams: Arc<TeamRegistry>, config: &CrawlerConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let executor = ResilientExecutor::new(config.retry, base_url.clone());

        Self {
            engine: CrawlEngine::new(fetcher, renderer, executor),
            teams,
            base_url,
            range_pause: config.range_pause,
        }
    }

    pub fn teams(&self) -> &TeamRegistry {
        &self.teams
    }

    pub fn standings_url(&self) -> String {
        format!("{}/Record/TeamRank/TeamRankDaily.aspx", self.base_url)
    }

    pub fn schedule_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/Schedule/Schedule.aspx?seriesId=0,9,6&date={}",
            self.base_url,
            date.format("%Y%m%d")
        )
    }

    pub fn live_url(&self) -> String {
        format!("{}/Schedule/Schedule.aspx", self.base_url)
    }

    /// Current league table.
    pub async fn crawl_standings(&self) -> CrawlResult<Vec<Standing>> {
        let url = self.standings_url();
        let url = url.as_str();

        self.engine
            .execute(move || async move {
                let rows = self.engine.static_rows(url, TABLE_ROWS).await?;
                Ok(extract::standings(&rows, &self.teams, Utc::now()))
            })
            .await
    }

    /// Fixtures for one ISO date (`YYYY-MM-DD`).
    pub async fn crawl_schedule(&self, date: &str) -> CrawlResult<Vec<ScheduledGame>> {
        match parse_date(date) {
            Ok(date) => self.schedule_for(date).await,
            Err(e) => CrawlResult::failure(e.to_string(), self.engine.source()),
        }
    }

    async fn schedule_for(&self, date: NaiveDate) -> CrawlResult<Vec<ScheduledGame>> {
        let url = self.schedule_url(date);
        let url = url.as_str();

        self.engine
            .execute(move || async move {
                let rows = self
                    .engine
                    .rendered_rows(url, Some(TABLE_READY), TABLE_ROWS)
                    .await?;
                Ok(extract::schedule(&rows, &self.teams, date))
            })
            .await
    }

    /// Score lines of games currently in progress.
    pub async fn crawl_live_games(&self) -> CrawlResult<Vec<LiveGameSnapshot>> {
        let url = self.live_url();
        let url = url.as_str();
        let today = Utc::now().with_timezone(&chrono_tz::Asia::Seoul).date_naive();

        self.engine
            .execute(move || async move {
                let rows = self
                    .engine
                    .rendered_rows(url, Some(TABLE_READY), TABLE_ROWS)
                    .await?;
                Ok(extract::live_games(&rows, &self.teams, today))
            })
            .await
    }

    /// Fixtures for every date from `start` to `end` inclusive, one date at
    /// a time with a pause in between. A date whose crawl fails is logged
    /// and left out; it does not fail the range.
    pub async fn crawl_schedule_range(
        &self,
        start: &str,
        end: &str,
    ) -> CrawlResult<Vec<ScheduledGame>> {
        let (start, end) = match (parse_date(start), parse_date(end)) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => {
                return CrawlResult::failure(e.to_string(), self.engine.source());
            }
        };

        self.engine
            .execute(move || async move {
                let mut games = Vec::new();

                for (i, date) in start.iter_days().take_while(|d| *d <= end).enumerate() {
                    if i > 0 {
                        tokio::time::sleep(self.range_pause).await;
                    }

                    match self.schedule_for(date).await.into_result() {
                        Ok(day) => games.extend(day),
                        Err(error) => {
                            tracing::warn!(%date, %error, "Leaving date out of schedule range");
                        }
                    }
                }

                tracing::info!(%start, %end, count = games.len(), "Crawled schedule range");
                Ok(games)
            })
            .await
    }

    /// Closes the browser. Errors are logged, not returned.
    pub async fn teardown(&self) {
        if let Err(e) = self.engine.shutdown().await {
            tracing::error!(error = %e, "Browser teardown failed");
        }
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::InvalidInput(format!("Invalid date '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::models::UNKNOWN_TEAM_ID;
    use crate::retry::RetryPolicy;
    use crate::session::SessionManager;
    use crate::testutil::{MockEngine, MockFetcher, MockRenderer};

    const STANDINGS_HTML: &str = r#"
        <table class="tData">
          <tbody>
            <tr><td>1</td><td>LG</td><td>20</td><td>13</td><td>7</td><td>0</td>
                <td>0.650</td><td>-</td><td>6승0무4패</td><td>2승</td></tr>
            <tr><td>2</td><td>KT</td><td>20</td><td>12</td><td>8</td><td>0</td></tr>
          </tbody>
        </table>"#;

    fn config() -> CrawlerConfig {
        CrawlerConfig {
            base_url: "https://kbo.test".into(),
            retry: RetryPolicy::new(3, Duration::ZERO),
            range_pause: Duration::ZERO,
            ..CrawlerConfig::default()
        }
    }

    fn crawler(
        fetcher: MockFetcher,
        renderer: MockRenderer,
    ) -> KboCrawler<MockFetcher, MockRenderer> {
        KboCrawler::new(fetcher, renderer, Arc::new(TeamRegistry::kbo()), &config())
    }

    fn browser_crawler(engine: MockEngine) -> KboCrawler<MockFetcher, SessionManager<MockEngine>> {
        let config = config();
        let session = SessionManager::with_profiles(
            engine,
            config.launch_profile(),
            config.page_profile(),
            config.session_timeouts(),
        );
        KboCrawler::new(
            MockFetcher::default(),
            session,
            Arc::new(TeamRegistry::kbo()),
            &config,
        )
    }

    fn game_row(matchup: &str) -> TableRow {
        TableRow::new(&["18:30", matchup, "잠실", "SPOTV", "", ""])
    }

    #[tokio::test]
    async fn standings_from_static_page() {
        let fetcher = MockFetcher::new(STANDINGS_HTML);
        let crawler = crawler(fetcher.clone(), MockRenderer::default());

        let result = crawler.crawl_standings().await;

        assert!(result.is_success());
        assert_eq!(result.source(), "https://kbo.test");
        let standings = result.into_data().unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].team.id, "lg");
        assert_eq!(standings[0].win_rate, 0.65);
        assert_eq!(
            fetcher.urls.lock().unwrap().as_slice(),
            ["https://kbo.test/Record/TeamRank/TeamRankDaily.aspx"]
        );
    }

    #[tokio::test]
    async fn standings_failure_is_retried_then_enveloped() {
        let fetcher = MockFetcher::with_responses(vec![
            Err(AppError::Timeout(10)),
            Err(AppError::NetworkError("reset".into())),
            Err(AppError::HttpError("HTTP 503".into())),
        ]);
        let crawler = crawler(fetcher.clone(), MockRenderer::default());

        let result = crawler.crawl_standings().await;

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("HTTP error: HTTP 503"));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn standings_recover_on_second_attempt() {
        let fetcher = MockFetcher::with_responses(vec![
            Err(AppError::Timeout(10)),
            Ok(STANDINGS_HTML.to_string()),
        ]);
        let crawler = crawler(fetcher.clone(), MockRenderer::default());

        let result = crawler.crawl_standings().await;

        assert!(result.is_success());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn schedule_from_rendered_page() {
        let renderer = MockRenderer::new(vec![game_row("두산 vs KIA")]);
        let crawler = crawler(MockFetcher::default(), renderer.clone());

        let games = crawler.crawl_schedule("2024-05-01").await.into_data().unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].home_team.id, "doosan");
        assert_eq!(games[0].away_team.id, "kia");
        assert_eq!(
            renderer.visited(),
            vec!["https://kbo.test/Schedule/Schedule.aspx?seriesId=0,9,6&date=20240501".to_string()]
        );
    }

    #[tokio::test]
    async fn schedule_keeps_unresolved_teams() {
        let renderer = MockRenderer::new(vec![game_row("Unicorns FC vs LG")]);
        let crawler = crawler(MockFetcher::default(), renderer);

        let games = crawler.crawl_schedule("2024-05-01").await.into_data().unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].home_team.id, UNKNOWN_TEAM_ID);
        assert_eq!(games[0].home_team.name, "Unicorns FC");
    }

    #[tokio::test]
    async fn schedule_rejects_bad_date_without_fetching() {
        let renderer = MockRenderer::default();
        let crawler = crawler(MockFetcher::default(), renderer.clone());

        let result = crawler.crawl_schedule("05/01/2024").await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("Invalid date"));
        assert!(renderer.visited().is_empty());
    }

    #[tokio::test]
    async fn live_games_from_rendered_page() {
        let renderer = MockRenderer::new(vec![
            TableRow::new(&["18:30", "LG 3 : 2 KT 7회말", "잠실"]).with_class("live"),
            TableRow::new(&["18:30", "두산 vs KIA", "광주"]),
        ]);
        let crawler = crawler(MockFetcher::default(), renderer.clone());

        let games = crawler.crawl_live_games().await.into_data().unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].home_team.id, "lg");
        assert_eq!(games[0].away_score, 2);
        assert_eq!(renderer.visited(), vec!["https://kbo.test/Schedule/Schedule.aspx".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn range_crawls_each_date_in_order_with_pauses() {
        let renderer = MockRenderer::with_responses(vec![
            Ok(vec![game_row("두산 vs KIA")]),
            Ok(vec![game_row("LG vs KT"), game_row("SSG vs NC")]),
            Ok(vec![game_row("삼성 vs 롯데")]),
        ]);
        let config = CrawlerConfig {
            range_pause: Duration::from_secs(1),
            ..config()
        };
        let crawler = KboCrawler::new(
            MockFetcher::default(),
            renderer.clone(),
            Arc::new(TeamRegistry::kbo()),
            &config,
        );
        let start = tokio::time::Instant::now();

        let games = crawler
            .crawl_schedule_range("2024-05-01", "2024-05-03")
            .await
            .into_data()
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "elapsed: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "elapsed: {elapsed:?}");

        let visited = renderer.visited();
        assert_eq!(visited.len(), 3);
        assert!(visited[0].ends_with("date=20240501"));
        assert!(visited[1].ends_with("date=20240502"));
        assert!(visited[2].ends_with("date=20240503"));

        let homes: Vec<&str> = games.iter().map(|g| g.home_team.id.as_str()).collect();
        assert_eq!(homes, vec!["doosan", "lg", "ssg", "samsung"]);
        assert_eq!(games[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(games[3].date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
    }

    #[tokio::test]
    async fn range_leaves_out_a_failing_date() {
        let renderer = MockRenderer::with_responses(vec![
            Ok(vec![game_row("두산 vs KIA")]),
            Err(AppError::Timeout(30)),
            Err(AppError::Timeout(30)),
            Err(AppError::Timeout(30)),
            Ok(vec![game_row("삼성 vs 롯데")]),
        ]);
        let crawler = crawler(MockFetcher::default(), renderer.clone());

        let result = crawler.crawl_schedule_range("2024-05-01", "2024-05-03").await;

        assert!(result.is_success());
        let games = result.into_data().unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[1].home_team.id, "samsung");
        assert_eq!(renderer.visited().len(), 5);
    }

    #[tokio::test]
    async fn range_with_start_after_end_is_empty() {
        let renderer = MockRenderer::default();
        let crawler = crawler(MockFetcher::default(), renderer.clone());

        let result = crawler.crawl_schedule_range("2024-05-03", "2024-05-01").await;

        assert!(result.is_success());
        assert!(result.data().unwrap().is_empty());
        assert!(renderer.visited().is_empty());
    }

    #[tokio::test]
    async fn range_rejects_bad_end_date() {
        let crawler = crawler(MockFetcher::default(), MockRenderer::default());
        let result = crawler.crawl_schedule_range("2024-05-01", "2024-13-01").await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("2024-13-01"));
    }

    #[tokio::test]
    async fn browser_launch_failure_is_retried_within_the_crawl() {
        let engine = MockEngine::new()
            .with_launch_error("chrome not found")
            .with_payload(r#"[{"classes":[],"cells":["18:30","두산 vs KIA","잠실","SPOTV","",""]}]"#);
        let crawler = browser_crawler(engine.clone());

        let result = crawler.crawl_schedule("2024-05-01").await;

        assert!(result.is_success(), "error: {:?}", result.error());
        assert_eq!(result.data().unwrap()[0].home_team.id, "doosan");
        assert_eq!(engine.launches(), 2);
        assert_eq!(engine.pages_opened(), 1);
        assert_eq!(engine.pages_closed(), 1);

        crawler.teardown().await;
        assert_eq!(engine.browsers_closed(), 1);
    }

    #[tokio::test]
    async fn browser_that_never_launches_yields_failure_envelope() {
        let engine = MockEngine::new().with_launch_errors("chrome not found", usize::MAX);
        let crawler = browser_crawler(engine.clone());

        let result = crawler.crawl_live_games().await;

        assert!(!result.is_success());
        assert!(result.data().is_none());
        assert_eq!(result.error(), Some("Browser error: chrome not found"));
        assert_eq!(result.source(), "https://kbo.test");
        assert_eq!(engine.launches(), 3);
        assert_eq!(engine.pages_opened(), 0);

        crawler.teardown().await;
        assert_eq!(engine.browsers_closed(), 0);
    }

    #[tokio::test]
    async fn teardown_shuts_renderer_down() {
        let renderer = MockRenderer::default();
        let crawler = crawler(MockFetcher::default(), renderer.clone());

        crawler.teardown().await;
        crawler.teardown().await;

        assert_eq!(renderer.shutdowns.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn urls_follow_site_layout() {
        let crawler = crawler(MockFetcher::default(), MockRenderer::default());
        let date = NaiveDate::from_ymd_opt(2024, 10, 3).unwrap();
        assert_eq!(
            crawler.schedule_url(date),
            "https://kbo.test/Schedule/Schedule.aspx?seriesId=0,9,6&date=20241003"
        );
        assert_eq!(crawler.live_url(), "https://kbo.test/Schedule/Schedule.aspx");
    }
}
