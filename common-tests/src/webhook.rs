use serde_json::Value;
use wiremock::{
    http::Method,
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const WEBHOOK_PATH: &str = "/api/webhooks/1234/token";

/// Webhook sink answering every message with `status`
pub async fn mocked_webhook_server(status: u16) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method(Method::POST))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(&mock_server)
        .await;

    mock_server
}

pub fn webhook_url(server: &MockServer) -> String {
    format!("{}{WEBHOOK_PATH}", server.uri())
}

/// The JSON bodies the sink received, oldest first
pub async fn received_messages(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == WEBHOOK_PATH)
        .map(|request| serde_json::from_slice(&request.body).unwrap_or(Value::Null))
        .collect()
}
