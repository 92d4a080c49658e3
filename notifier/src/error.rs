use reqwest::StatusCode;

use crate::persistence::PersistenceError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to fetch the latest deployment of '{project}': {error:#}")]
    Fetch {
        project: String,
        error: anyhow::Error,
    },
    #[error("State store error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),
    #[error("Webhook did not accept the message. Got status code: {0}")]
    WebhookStatus(StatusCode),
    #[error("Failed to set up the deployments client: {0:#}")]
    Client(anyhow::Error),
}
