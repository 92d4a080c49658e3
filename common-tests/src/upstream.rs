use serde_json::{json, Value};
use wiremock::{
    http::Method,
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const ACCOUNT_ID: &str = "023e105f4ecef8ad9ca31a8372d0c353";
pub const API_TOKEN: &str = "test-token";

pub fn deployments_path(project: &str) -> String {
    format!("/accounts/{ACCOUNT_ID}/pages/projects/{project}/deployments")
}

/// A deployment record the way the upstream API reports it
pub fn deployment(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "url": format!("https://{id}.example.pages.dev"),
        "environment": "production",
        "latest_stage": {"name": "deploy", "status": status},
        "deployment_trigger": {
            "type": "github:push",
            "metadata": {
                "branch": "main",
                "commit_hash": "ad9ccd918a81025731e10e40267e11273a263421",
                "commit_message": "Update index.html",
                "commit_author": "octocat"
            }
        },
        "source": {
            "type": "github",
            "config": {"owner": "acme", "repo_name": "site"}
        }
    })
}

fn envelope(result: Vec<Value>) -> Value {
    json!({"success": true, "errors": [], "messages": [], "result": result})
}

fn error_envelope(code: u32, message: &str) -> Value {
    json!({"success": false, "errors": [{"code": code, "message": message}], "result": []})
}

/// Serve `deployments` as the latest deployments of `project`
pub async fn mount_deployments(server: &MockServer, project: &str, deployments: Vec<Value>) {
    Mock::given(method(Method::GET))
        .and(path(deployments_path(project)))
        .and(header("authorization", format!("Bearer {API_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(deployments)))
        .mount(server)
        .await;
}

/// Fail every request for `project` with `status`
pub async fn mount_failure(server: &MockServer, project: &str, status: u16) {
    Mock::given(method(Method::GET))
        .and(path(deployments_path(project)))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(error_envelope(10001, "Service unavailable")),
        )
        .mount(server)
        .await;
}

/// Reject every request that did not match a more specific mock, the way the upstream rejects bad tokens
pub async fn mount_unauthorized(server: &MockServer) {
    Mock::given(method(Method::GET))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(error_envelope(10000, "Authentication error")),
        )
        .with_priority(10)
        .mount(server)
        .await;
}

/// Upstream serving a fixed set of projects:
/// - `building-site` with a deployment in flight
/// - `empty-site` without any deployment
/// - `broken-site` whose latest deployment has no id
/// - `missing-site` which does not exist
/// - `flaky-site` which answers with an unsuccessful envelope
pub async fn mocked_upstream_server() -> MockServer {
    let mock_server = MockServer::start().await;

    mount_deployments(
        &mock_server,
        "building-site",
        vec![deployment("deployment-2", "active")],
    )
    .await;
    mount_deployments(&mock_server, "empty-site", vec![]).await;
    mount_deployments(
        &mock_server,
        "broken-site",
        vec![json!({"latest_stage": {"name": "deploy", "status": "active"}})],
    )
    .await;

    Mock::given(method(Method::GET))
        .and(path(deployments_path("missing-site")))
        .and(header("authorization", format!("Bearer {API_TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(error_envelope(8000007, "Project not found")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method(Method::GET))
        .and(path(deployments_path("flaky-site")))
        .and(header("authorization", format!("Bearer {API_TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(error_envelope(10001, "Service unavailable")),
        )
        .mount(&mock_server)
        .await;

    mount_unauthorized(&mock_server).await;

    mock_server
}
