use super::*;
use catalog_watcher::config::{DiscordConfig, TelegramConfig};
use catalog_watcher::plugins::notifiers::{DiscordChannel, TelegramChannel};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123456:TEST-TOKEN";

fn telegram(server: &MockServer) -> TelegramChannel {
    let config = TelegramConfig {
        bot_token: Some(TOKEN.to_string()),
        api_base: server.uri(),
        disable_web_page_preview: true,
    };
    TelegramChannel::new(reqwest::Client::new(), &config).unwrap()
}

#[tokio::test]
async fn test_telegram_send_message_wire_format() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .and(body_partial_json(json!({
            "chat_id": "-1001",
            "text": "🆕 <b>hello</b>",
            "parse_mode": "HTML",
            "disable_web_page_preview": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"message_id": 42, "chat": {"id": -1001}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = telegram(&server).send("-1001", "🆕 <b>hello</b>").await?;
    assert_eq!(receipt.message_id.as_deref(), Some("42"));
    Ok(())
}

#[tokio::test]
async fn test_telegram_api_error_is_delivery_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let err = telegram(&server).send("-1", "hi").await.unwrap_err();
    assert!(matches!(err, AppError::Delivery { .. }));
    assert!(err.to_string().contains("chat not found"));
    assert!(!err.to_string().contains(TOKEN));
    Ok(())
}

#[tokio::test]
async fn test_telegram_get_me() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{}/getMe", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"id": 1, "is_bot": true, "username": "catalog_bot"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    telegram(&server).test_connection("-1001").await?;
    Ok(())
}

#[tokio::test]
async fn test_discord_webhook_wire_format() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/abc"))
        .and(query_param("wait", "true"))
        .and(body_partial_json(json!({
            "content": "<@&99>\n❌ No longer listed",
            "username": "Catalog Watcher"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "555"})))
        .expect(1)
        .mount(&server)
        .await;

    let channel = DiscordChannel::new(
        reqwest::Client::new(),
        DiscordConfig {
            mention_role: Some("99".to_string()),
            ..DiscordConfig::default()
        },
    );
    let webhook = format!("{}/api/webhooks/1/abc", server.uri());
    let receipt = channel.send(&webhook, "❌ No longer listed").await?;
    assert_eq!(receipt.message_id.as_deref(), Some("555"));
    Ok(())
}

#[tokio::test]
async fn test_discord_rejection_is_delivery_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let channel = DiscordChannel::new(reqwest::Client::new(), DiscordConfig::default());
    let err = channel
        .send(&format!("{}/api/webhooks/1/abc", server.uri()), "hi")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("429"));
    Ok(())
}

#[tokio::test]
async fn test_notifier_over_telegram_sends_every_change() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"message_id": 1}})))
        .expect(2)
        .mount(&server)
        .await;

    let site = test_site("https://shop.example.com/cameras");
    let extractor = ProductExtractor::new(&site)?;
    let added = extractor
        .extract(&listing_page(&[("1", "Sony <A7>", "$10"), ("2", "Canon", "$20")]))?
        .products;
    let changes = catalog_watcher::ChangeSet {
        added,
        ..Default::default()
    };

    let notifier = Notifier::new(Arc::new(telegram(&server)), "-1001", "Camera Shop");
    let report = notifier.notify(&changes).await;
    assert_eq!(report.sent, 2);

    let requests = server.received_requests().await.unwrap();
    let first: serde_json::Value = requests[0].body_json()?;
    let text = first["text"].as_str().unwrap();
    assert!(text.contains("Sony &lt;A7&gt;"));
    assert!(text.contains(r#"<a href="https://shop.example.com/products/1">View product</a>"#));
    Ok(())
}
