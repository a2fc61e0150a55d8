mod helpers;

use flow_oracle_updater::error::PriceFetchError;
use flow_oracle_updater::price_feed::{CoinGeckoPriceFeed, PriceSource};
use helpers::dec;
use mockito::Matcher;
use std::time::Duration;

fn price_query(coin_id: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("ids".into(), coin_id.into()),
        Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
    ])
}

fn feed(url: &str) -> CoinGeckoPriceFeed {
    CoinGeckoPriceFeed::new(url)
        .unwrap()
        .with_coin_id("FLOW", "flow")
        .with_retry_backoff(Duration::from_millis(1))
}

#[tokio::test]
async fn test_fetches_usd_price() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(price_query("flow"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"flow":{"usd":0.2784}}"#)
        .create_async()
        .await;

    let price = feed(&server.url()).fetch_price("FLOW").await.unwrap();

    assert_eq!(price, dec("0.2784"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(price_query("flow"))
        .with_status(404)
        .with_body("not found")
        .expect(1)
        .create_async()
        .await;

    let err = feed(&server.url())
        .with_max_attempts(3)
        .fetch_price("FLOW")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceFetchError::Status { status: 404, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_retried_up_to_max_attempts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(price_query("flow"))
        .with_status(503)
        .with_body("upstream unavailable")
        .expect(3)
        .create_async()
        .await;

    let err = feed(&server.url())
        .with_max_attempts(3)
        .fetch_price("FLOW")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceFetchError::Status { status: 503, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_without_retry_budget_fails_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(price_query("flow"))
        .with_status(429)
        .expect(1)
        .create_async()
        .await;

    let err = feed(&server.url()).fetch_price("FLOW").await.unwrap_err();

    assert!(err.is_retryable());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_coin_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(price_query("flow"))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let err = feed(&server.url())
        .with_max_attempts(3)
        .fetch_price("FLOW")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceFetchError::Malformed(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_feed_is_transport_error() {
    // Nothing listens on port 9 locally
    let err = feed("http://127.0.0.1:9")
        .fetch_price("FLOW")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceFetchError::Transport(_)));
}

#[tokio::test]
async fn test_oversized_attempt_budget_is_capped() {
    use flow_oracle_updater::price_feed::MAX_FETCH_ATTEMPTS;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(price_query("flow"))
        .with_status(503)
        .expect(MAX_FETCH_ATTEMPTS as usize)
        .create_async()
        .await;

    let err = CoinGeckoPriceFeed::new(server.url())
        .unwrap()
        .with_max_attempts(40)
        .with_retry_backoff(Duration::ZERO)
        .fetch_price("FLOW")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceFetchError::Status { status: 503, .. }));
    mock.assert_async().await;
}
