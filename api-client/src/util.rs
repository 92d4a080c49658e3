use std::fmt::Debug;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use deploy_notifier_common::models::{deployment::DeploymentListResponse, error::ApiError};
use http::StatusCode;
use serde::de::DeserializeOwned;

/// Helpers for consuming and parsing response bodies and handling parsing of an ApiError if the response is 4xx/5xx
#[async_trait]
pub trait ToBodyContent {
    async fn to_json<T: DeserializeOwned>(self) -> Result<ParsedJson<T>>;
}

fn into_api_error(body: &str, status_code: StatusCode) -> ApiError {
    tracing::trace!("Parsing response as API error");

    match serde_json::from_str::<DeploymentListResponse>(body) {
        Ok(envelope) => ApiError::from_messages(&envelope.errors, status_code.as_u16()),
        _ => ApiError::new(
            format!("Failed to parse error response from the server:\n{}", body),
            status_code.as_u16(),
        ),
    }
}

/// Tries to convert bytes to string. If not possible, returns a string symbolizing the bytes and the length
fn bytes_to_string_with_fallback(bytes: Bytes) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| format!("[{} bytes]", bytes.len()))
}

/// A parsed body together with the status it was served with
pub struct ParsedJson<T> {
    inner: T,
    status: StatusCode,
}

impl<T> ParsedJson<T> {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Debug> Debug for ParsedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

#[async_trait]
impl ToBodyContent for reqwest::Response {
    async fn to_json<T: DeserializeOwned>(self) -> Result<ParsedJson<T>> {
        let status_code = self.status();
        let bytes = self.bytes().await?;
        let string = bytes_to_string_with_fallback(bytes);

        tracing::trace!(response = %string, "Parsing response as JSON");

        if status_code.is_client_error() || status_code.is_server_error() {
            return Err(into_api_error(&string, status_code).into());
        }

        let t = serde_json::from_str(&string).context("failed to parse a successful response")?;

        Ok(ParsedJson {
            inner: t,
            status: status_code,
        })
    }
}
