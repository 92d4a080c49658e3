use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::deployment::ResponseMessage;

/// A non-success response from the upstream API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    pub fn new(message: impl ToString, status_code: u16) -> Self {
        Self {
            message: message.to_string(),
            status_code,
        }
    }

    /// Combine the messages of an error envelope into one error
    pub fn from_messages(messages: &[ResponseMessage], status_code: u16) -> Self {
        if messages.is_empty() {
            return Self::new("request was not successful", status_code);
        }

        let message = messages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");

        Self::new(message, status_code)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_envelope_messages() {
        let messages = vec![
            ResponseMessage {
                code: Some(8000007),
                message: "Project not found".to_string(),
            },
            ResponseMessage {
                code: None,
                message: "try again".to_string(),
            },
        ];

        let error = ApiError::from_messages(&messages, 404);

        assert_eq!(error.message, "[8000007] Project not found; try again");
        assert_eq!(error.to_string(), "404 - [8000007] Project not found; try again");
    }

    #[test]
    fn empty_envelope_has_generic_message() {
        let error = ApiError::from_messages(&[], 200);

        assert_eq!(error.message, "request was not successful");
    }
}
