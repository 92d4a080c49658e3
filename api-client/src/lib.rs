use std::time::Duration;

use anyhow::{Context, Result};
use deploy_notifier_common::{
    models::{deployment::DeploymentListResponse, error::ApiError},
    Observation,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Response;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use tracing::{debug, instrument};

mod middleware;
pub mod util;

use crate::middleware::LoggingMiddleware;
use util::{ParsedJson, ToBodyContent};

/// Everything but the unreserved characters of RFC 3986 gets encoded in a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Read-only client for the deployments of the projects in an account
#[derive(Clone)]
pub struct DeploymentsApiClient {
    pub client: ClientWithMiddleware,
    pub api_url: String,
    api_token: String,
}

impl DeploymentsApiClient {
    pub fn new(api_url: String, api_token: String, timeout: Option<u64>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout.unwrap_or(60)))
            .build()
            .context("failed to build the http client")?;

        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(LoggingMiddleware)
            .build();

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn set_auth_bearer(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.api_token)
    }

    /// Get the most recent deployments of a project
    #[instrument(skip_all, fields(%account_id, %project))]
    pub async fn get_deployments(
        &self,
        account_id: &str,
        project: &str,
    ) -> Result<ParsedJson<DeploymentListResponse>> {
        let account_id = utf8_percent_encode(account_id, PATH_SEGMENT);
        let project = utf8_percent_encode(project, PATH_SEGMENT);
        let path =
            format!("/accounts/{account_id}/pages/projects/{project}/deployments?per_page=1");

        self.get_json(path).await
    }

    /// Get the latest deployment of a project. `None` when the project has no deployment or the
    /// latest one cannot be tracked.
    pub async fn get_latest_deployment(
        &self,
        account_id: &str,
        project: &str,
    ) -> Result<Option<Observation>> {
        let parsed = self
            .get_deployments(account_id, project)
            .await
            .with_context(|| format!("failed to get deployments of '{project}'"))?;
        let status = parsed.status();
        let response = parsed.into_inner();

        if !response.success {
            return Err(ApiError::from_messages(&response.errors, status.as_u16()).into());
        }

        let Some(latest) = response.result.into_iter().next() else {
            debug!(project, "project has no deployments");
            return Ok(None);
        };

        let observation = latest.into_observation();
        if observation.is_none() {
            debug!(project, "latest deployment has no id");
        }

        Ok(observation)
    }

    pub async fn get(&self, path: impl AsRef<str>) -> Result<Response> {
        let url = format!("{}{}", self.api_url, path.as_ref());

        let mut builder = self.client.get(url);
        builder = self.set_auth_bearer(builder);

        Ok(builder.send().await?)
    }

    pub async fn get_json<R>(&self, path: impl AsRef<str>) -> Result<ParsedJson<R>>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        self.get(path).await?.to_json().await
    }
}

#[cfg(test)]
mod tests {
    use deploy_notifier_common::models::error::ApiError;
    use deploy_notifier_common_tests::upstream::{
        mocked_upstream_server, mount_failure, ACCOUNT_ID, API_TOKEN,
    };
    use test_context::{test_context, AsyncTestContext};

    use super::DeploymentsApiClient;

    struct Upstream {
        client: DeploymentsApiClient,
        _server: wiremock::MockServer,
    }

    impl AsyncTestContext for Upstream {
        async fn setup() -> Self {
            let server = mocked_upstream_server().await;
            let client =
                DeploymentsApiClient::new(server.uri(), API_TOKEN.to_string(), None).unwrap();

            Self {
                client,
                _server: server,
            }
        }

        async fn teardown(self) {}
    }

    #[test_context(Upstream)]
    #[tokio::test]
    async fn latest_deployment(ctx: &mut Upstream) {
        let observation = ctx
            .client
            .get_latest_deployment(ACCOUNT_ID, "building-site")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(observation.id, "deployment-2");
        assert_eq!(observation.status, "active");
        assert_eq!(observation.metadata.branch.as_deref(), Some("main"));
    }

    #[test_context(Upstream)]
    #[tokio::test]
    async fn project_without_deployments(ctx: &mut Upstream) {
        let observation = ctx
            .client
            .get_latest_deployment(ACCOUNT_ID, "empty-site")
            .await
            .unwrap();

        assert_eq!(observation, None);
    }

    #[test_context(Upstream)]
    #[tokio::test]
    async fn deployment_without_id(ctx: &mut Upstream) {
        let observation = ctx
            .client
            .get_latest_deployment(ACCOUNT_ID, "broken-site")
            .await
            .unwrap();

        assert_eq!(observation, None);
    }

    #[test_context(Upstream)]
    #[tokio::test]
    async fn unknown_project_is_an_error(ctx: &mut Upstream) {
        let error = ctx
            .client
            .get_latest_deployment(ACCOUNT_ID, "missing-site")
            .await
            .unwrap_err();

        let api_error = error.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status_code, 404);
        assert_eq!(api_error.message, "[8000007] Project not found");
    }

    #[tokio::test]
    async fn wrong_token_is_an_error() {
        let server = mocked_upstream_server().await;
        let client =
            DeploymentsApiClient::new(server.uri(), "wrong-token".to_string(), None).unwrap();

        let error = client
            .get_latest_deployment(ACCOUNT_ID, "building-site")
            .await
            .unwrap_err();

        assert_eq!(error.downcast_ref::<ApiError>().unwrap().status_code, 403);
    }

    #[test_context(Upstream)]
    #[tokio::test]
    async fn unsuccessful_envelope_is_an_error(ctx: &mut Upstream) {
        let error = ctx
            .client
            .get_latest_deployment(ACCOUNT_ID, "flaky-site")
            .await
            .unwrap_err();

        let api_error = error.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status_code, 200);
        assert_eq!(api_error.message, "[10001] Service unavailable");
    }

    #[tokio::test]
    async fn unsuccessful_envelope_keeps_the_served_status() {
        let server = wiremock::MockServer::start().await;
        mount_failure(&server, "queued-site", 202).await;
        let client = DeploymentsApiClient::new(server.uri(), API_TOKEN.to_string(), None).unwrap();

        let error = client
            .get_latest_deployment(ACCOUNT_ID, "queued-site")
            .await
            .unwrap_err();

        let api_error = error.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status_code, 202);
        assert_eq!(api_error.to_string(), "202 - [10001] Service unavailable");
    }
}
