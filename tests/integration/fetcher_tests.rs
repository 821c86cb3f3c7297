use catalog_watcher::config::FetcherConfig;
use catalog_watcher::scraper::{HttpFetcher, PageFetcher};
use catalog_watcher::utils::error::AppError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::listing_page;

fn fetcher_config(retry_attempts: u32) -> FetcherConfig {
    FetcherConfig {
        user_agent: "CatalogWatcher-Test/1.0".to_string(),
        request_timeout: 5,
        retry_attempts,
        retry_delay_ms: 10,
        ..FetcherConfig::default()
    }
}

#[tokio::test]
async fn test_fetch_returns_body_and_sends_user_agent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let page = listing_page(&[("1", "One", "$10")]);
    Mock::given(method("GET"))
        .and(path("/cameras"))
        .and(header("user-agent", "CatalogWatcher-Test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(0))?;
    let body = fetcher.fetch(&format!("{}/cameras", server.uri())).await?;
    assert_eq!(body, page);
    Ok(())
}

#[tokio::test]
async fn test_fetch_retries_then_succeeds() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(2))?;
    let body = fetcher.fetch(&server.uri()).await?;
    assert_eq!(body, "<html></html>");
    Ok(())
}

#[tokio::test]
async fn test_fetch_gives_up_after_retries() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&fetcher_config(2))?;
    let err = fetcher.fetch(&server.uri()).await.unwrap_err();

    assert!(matches!(err, AppError::Fetch { .. }));
    assert!(err.to_string().contains("500"));
    Ok(())
}
