use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::deployment::{DeploymentMetadata, Observation};

/// Envelope every upstream response is wrapped in
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeploymentListResponse {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ResponseMessage>,
    #[serde(default)]
    pub result: Vec<DeploymentResponse>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    pub code: Option<u32>,
    pub message: String,
}

impl Display for ResponseMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentResponse {
    pub id: Option<String>,
    pub url: Option<String>,
    pub environment: Option<String>,
    pub latest_stage: Option<Stage>,
    pub deployment_trigger: Option<DeploymentTrigger>,
    pub source: Option<Source>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentTrigger {
    pub r#type: Option<String>,
    pub metadata: Option<TriggerMetadata>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerMetadata {
    pub branch: Option<String>,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub commit_author: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    pub r#type: Option<String>,
    pub config: Option<SourceConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    pub owner: Option<String>,
    pub repo_name: Option<String>,
}

impl Source {
    /// Link to a commit on the forge hosting the source repository
    pub fn commit_url(&self, commit_hash: &str) -> Option<String> {
        let config = self.config.as_ref()?;
        let owner = config.owner.as_deref()?;
        let repo = config.repo_name.as_deref()?;

        match self.r#type.as_deref()? {
            "github" => Some(format!(
                "https://github.com/{owner}/{repo}/commit/{commit_hash}"
            )),
            "gitlab" => Some(format!(
                "https://gitlab.com/{owner}/{repo}/-/commit/{commit_hash}"
            )),
            _ => None,
        }
    }
}

impl DeploymentResponse {
    /// Turn a wire record into an observation. A record without an id cannot be tracked and
    /// yields `None`.
    pub fn into_observation(self) -> Option<Observation> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;

        let status = self
            .latest_stage
            .and_then(|stage| stage.status)
            .unwrap_or_default();

        let trigger = self
            .deployment_trigger
            .and_then(|trigger| trigger.metadata)
            .unwrap_or_default();

        let commit_url = match (&self.source, &trigger.commit_hash) {
            (Some(source), Some(hash)) => source.commit_url(hash),
            _ => None,
        };

        let metadata = DeploymentMetadata {
            url: self.url,
            environment: self.environment,
            branch: trigger.branch,
            commit_hash: trigger.commit_hash,
            commit_message: trigger.commit_message,
            commit_author: trigger.commit_author,
            commit_url,
        };

        Some(Observation::new(id, status).with_metadata(metadata))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_full_record() {
        let body = json!({
            "success": true,
            "errors": [],
            "result": [{
                "id": "f64788e9-fccd-4d4a-a28a-cb84f88f6",
                "url": "https://f64788e9.my-site.pages.dev",
                "environment": "production",
                "latest_stage": {"name": "deploy", "status": "success"},
                "deployment_trigger": {
                    "type": "github:push",
                    "metadata": {
                        "branch": "main",
                        "commit_hash": "ad9ccd918a81025731e10e40267e11273a263421",
                        "commit_message": "Update index.html"
                    }
                },
                "source": {
                    "type": "github",
                    "config": {"owner": "acme", "repo_name": "my-site"}
                }
            }]
        });

        let response: DeploymentListResponse = serde_json::from_value(body).unwrap();
        let observation = response
            .result
            .into_iter()
            .next()
            .unwrap()
            .into_observation()
            .unwrap();

        assert_eq!(observation.id, "f64788e9-fccd-4d4a-a28a-cb84f88f6");
        assert_eq!(observation.status, "success");
        assert_eq!(
            observation.metadata,
            DeploymentMetadata {
                url: Some("https://f64788e9.my-site.pages.dev".to_string()),
                environment: Some("production".to_string()),
                branch: Some("main".to_string()),
                commit_hash: Some("ad9ccd918a81025731e10e40267e11273a263421".to_string()),
                commit_message: Some("Update index.html".to_string()),
                commit_author: None,
                commit_url: Some(
                    "https://github.com/acme/my-site/commit/ad9ccd918a81025731e10e40267e11273a263421"
                        .to_string()
                ),
            }
        );
    }

    #[test]
    fn record_without_id_is_dropped() {
        let record = DeploymentResponse {
            latest_stage: Some(Stage {
                name: None,
                status: Some("active".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(record.into_observation(), None);

        let record = DeploymentResponse {
            id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(record.into_observation(), None);
    }

    #[test]
    fn missing_stage_has_empty_status() {
        let record = DeploymentResponse {
            id: Some("A".to_string()),
            ..Default::default()
        };

        assert_eq!(record.into_observation(), Some(Observation::new("A", "")));
    }

    #[test]
    fn minimal_envelope() {
        let response: DeploymentListResponse =
            serde_json::from_value(json!({"success": false})).unwrap();

        assert!(!response.success);
        assert!(response.errors.is_empty());
        assert!(response.result.is_empty());
    }

    #[test]
    fn commit_url_needs_known_forge() {
        let source = Source {
            r#type: Some("bitbucket".to_string()),
            config: Some(SourceConfig {
                owner: Some("acme".to_string()),
                repo_name: Some("site".to_string()),
            }),
        };
        assert_eq!(source.commit_url("abc"), None);

        let source = Source {
            r#type: Some("gitlab".to_string()),
            ..source
        };
        assert_eq!(
            source.commit_url("abc").as_deref(),
            Some("https://gitlab.com/acme/site/-/commit/abc")
        );
    }
}
