use slot_watch::notify::{post_message, DiscordWebhook, DispatchError, Notifier};
use slot_watch::state::Target;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBHOOK_PATH: &str = "/api/webhooks/123456/token_abc";

fn target() -> Target {
    Target::new("AppX", "https://testflight.apple.com/join/abc")
}

#[tokio::test]
async fn test_discord_webhook_posts_content_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .and(body_json(serde_json::json!({ "content": "slots open" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let webhook = DiscordWebhook::new(
        reqwest::Client::new(),
        format!("{}{}", mock_server.uri(), WEBHOOK_PATH),
    );

    webhook
        .send(&target(), "slots open")
        .await
        .expect("204 should count as delivered");
}

#[tokio::test]
async fn test_only_204_counts_as_delivered() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let url = format!("{}{}", mock_server.uri(), WEBHOOK_PATH);
    let result = post_message(&reqwest::Client::new(), &url, "hello").await;

    match result {
        Err(DispatchError::Status { status, .. }) => assert_eq!(status, 200),
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_provider_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let webhook = DiscordWebhook::new(
        reqwest::Client::new(),
        format!("{}{}", mock_server.uri(), WEBHOOK_PATH),
    );
    let result = webhook.send(&target(), "hello").await;

    match result {
        Err(DispatchError::Status { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_webhook_is_transport_error() {
    let webhook = DiscordWebhook::new(
        reqwest::Client::new(),
        "http://127.0.0.1:9/api/webhooks/1/x",
    );
    let result = webhook.send(&target(), "hello").await;

    assert!(matches!(result, Err(DispatchError::Transport(_))));
}
