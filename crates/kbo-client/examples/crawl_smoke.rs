/// Smoke-test against the live KBO site.
///
/// Crawls the standings (static), today's schedule and live scores
/// (rendered), then prints a summary of each envelope as JSON.
///
/// Run with:
///   cargo run -p kbo-client --example crawl_smoke
use kbo_client::build_crawler;
use kbo_core::CrawlerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CrawlerConfig::from_env()?;
    let crawler = build_crawler(&config)?;

    let standings = crawler.crawl_standings().await;
    println!("{}", serde_json::to_string_pretty(&standings)?);

    let today = chrono::Utc::now()
        .with_timezone(&chrono_tz::Asia::Seoul)
        .format("%Y-%m-%d")
        .to_string();
    let schedule = crawler.crawl_schedule(&today).await;
    println!("{}", serde_json::to_string_pretty(&schedule)?);

    let live = crawler.crawl_live_games().await;
    println!("{}", serde_json::to_string_pretty(&live)?);

    crawler.teardown().await;

    anyhow::ensure!(standings.is_success(), "standings crawl failed");
    Ok(())
}
