use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use deploy_notifier_common::{
    constants::{COMMIT_MESSAGE_MAX_LENGTH, SHORT_HASH_LENGTH},
    deployment::Status,
    NotifyAction, Observation,
};

use super::{Embed, EmbedField, Message, MessageStyle};

const BLUE: u32 = 0x3498db;
const GREEN: u32 = 0x2ecc71;
const RED: u32 = 0xe74c3c;
const GREY: u32 = 0x95a5a6;

/// Render a notification about `project`
pub fn format(
    project: &str,
    action: &NotifyAction,
    style: MessageStyle,
    now: DateTime<Utc>,
) -> Message {
    let observation = action.observation();
    let (headline, color) = headline(action);
    let title = format!("{headline}: {project}");

    match style {
        MessageStyle::Embed => Message {
            content: None,
            embeds: vec![Embed {
                title,
                description: observation
                    .metadata
                    .commit_message
                    .as_deref()
                    .map(truncate_message),
                url: observation.metadata.url.clone(),
                color,
                fields: fields(observation),
                timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            }],
        },
        MessageStyle::Plain => {
            let mut line = title;

            let details: Vec<String> = fields(observation)
                .into_iter()
                .map(|field| format!("{}: {}", field.name, field.value))
                .collect();
            if !details.is_empty() {
                line.push_str(&format!(" ({})", details.join(", ")));
            }

            if let Some(url) = &observation.metadata.url {
                line.push_str(&format!(" {url}"));
            }

            Message {
                content: Some(line),
                embeds: vec![],
            }
        }
    }
}

fn headline(action: &NotifyAction) -> (String, u32) {
    match action {
        NotifyAction::Started(_) => ("Deployment started".to_string(), BLUE),
        NotifyAction::Finished(observation) => {
            match Status::from_str(&observation.normalized_status()) {
                Ok(Status::Success) => ("Deployment succeeded".to_string(), GREEN),
                Ok(Status::Failed | Status::Error) => ("Deployment failed".to_string(), RED),
                Ok(Status::Canceled) => ("Deployment canceled".to_string(), GREY),
                Ok(Status::Skipped) => ("Deployment skipped".to_string(), GREY),
                _ => (
                    format!("Deployment finished ({})", observation.normalized_status()),
                    GREY,
                ),
            }
        }
    }
}

fn fields(observation: &Observation) -> Vec<EmbedField> {
    let metadata = &observation.metadata;
    let mut fields = Vec::new();

    if let Some(environment) = &metadata.environment {
        fields.push(inline_field("Environment", environment.clone()));
    }

    if let Some(branch) = &metadata.branch {
        fields.push(inline_field("Branch", format!("`{branch}`")));
    }

    if let Some(hash) = &metadata.commit_hash {
        let short: String = hash.chars().take(SHORT_HASH_LENGTH).collect();
        let value = match &metadata.commit_url {
            Some(url) => format!("[`{short}`]({url})"),
            None => format!("`{short}`"),
        };
        fields.push(inline_field("Commit", value));
    }

    if let Some(author) = &metadata.commit_author {
        fields.push(inline_field("Author", author.clone()));
    }

    fields
}

fn inline_field(name: &str, value: String) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value,
        inline: true,
    }
}

fn truncate_message(message: &str) -> String {
    let message = message.trim();

    if message.chars().count() <= COMMIT_MESSAGE_MAX_LENGTH {
        return message.to_string();
    }

    let mut truncated: String = message.chars().take(COMMIT_MESSAGE_MAX_LENGTH - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use deploy_notifier_common::deployment::DeploymentMetadata;
    use pretty_assertions::assert_eq;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    fn observation(status: &str) -> Observation {
        Observation::new("deployment-1", status).with_metadata(DeploymentMetadata {
            url: Some("https://deployment-1.site.pages.dev".to_string()),
            environment: Some("production".to_string()),
            branch: Some("main".to_string()),
            commit_hash: Some("ad9ccd918a81025731e10e40267e11273a263421".to_string()),
            commit_message: Some("Update index.html".to_string()),
            commit_author: Some("octocat".to_string()),
            commit_url: Some("https://github.com/acme/site/commit/ad9ccd9".to_string()),
        })
    }

    #[test]
    fn started_embed() {
        let action = NotifyAction::Started(observation("active"));

        let message = format("site", &action, MessageStyle::Embed, now());

        assert_eq!(
            message,
            Message {
                content: None,
                embeds: vec![Embed {
                    title: "Deployment started: site".to_string(),
                    description: Some("Update index.html".to_string()),
                    url: Some("https://deployment-1.site.pages.dev".to_string()),
                    color: BLUE,
                    fields: vec![
                        inline_field("Environment", "production".to_string()),
                        inline_field("Branch", "`main`".to_string()),
                        inline_field(
                            "Commit",
                            "[`ad9ccd9`](https://github.com/acme/site/commit/ad9ccd9)".to_string()
                        ),
                        inline_field("Author", "octocat".to_string()),
                    ],
                    timestamp: "2024-03-01T12:30:00Z".to_string(),
                }],
            }
        );
    }

    #[test]
    fn finished_titles_and_colors() {
        let cases = [
            ("success", "Deployment succeeded: site", GREEN),
            ("failed", "Deployment failed: site", RED),
            ("ERROR", "Deployment failed: site", RED),
            ("canceled", "Deployment canceled: site", GREY),
            ("skipped", "Deployment skipped: site", GREY),
        ];

        for (status, title, color) in cases {
            let action = NotifyAction::Finished(observation(status));
            let message = format("site", &action, MessageStyle::Embed, now());

            assert_eq!(message.embeds[0].title, title, "{status}");
            assert_eq!(message.embeds[0].color, color, "{status}");
        }
    }

    #[test]
    fn bare_observation_has_no_fields() {
        let action = NotifyAction::Finished(Observation::new("deployment-1", "success"));

        let message = format("site", &action, MessageStyle::Embed, now());

        let embed = &message.embeds[0];
        assert_eq!(embed.description, None);
        assert_eq!(embed.url, None);
        assert!(embed.fields.is_empty());
    }

    #[test]
    fn commit_without_link() {
        let mut observation = observation("success");
        observation.metadata.commit_url = None;

        let message = format(
            "site",
            &NotifyAction::Finished(observation),
            MessageStyle::Embed,
            now(),
        );

        assert_eq!(message.embeds[0].fields[2].value, "`ad9ccd9`");
    }

    #[test]
    fn plain_line() {
        let action = NotifyAction::Finished(observation("success"));

        let message = format("site", &action, MessageStyle::Plain, now());

        assert_eq!(message.embeds, vec![]);
        assert_eq!(
            message.content.as_deref(),
            Some(
                "Deployment succeeded: site (Environment: production, Branch: `main`, \
                 Commit: [`ad9ccd9`](https://github.com/acme/site/commit/ad9ccd9), Author: octocat) \
                 https://deployment-1.site.pages.dev"
            )
        );
    }

    #[test]
    fn plain_line_without_metadata() {
        let action = NotifyAction::Started(Observation::new("deployment-1", "active"));

        let message = format("site", &action, MessageStyle::Plain, now());

        assert_eq!(message.content.as_deref(), Some("Deployment started: site"));
    }

    #[test]
    fn long_commit_messages_are_truncated() {
        let long = "a".repeat(COMMIT_MESSAGE_MAX_LENGTH + 10);

        let truncated = truncate_message(&long);

        assert_eq!(truncated.chars().count(), COMMIT_MESSAGE_MAX_LENGTH);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncate_message("  short  "), "short");
    }

    #[test]
    fn payload_skips_empty_parts() {
        let action = NotifyAction::Started(Observation::new("deployment-1", "active"));
        let message = format("site", &action, MessageStyle::Plain, now());

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({"content": "Deployment started: site"})
        );
    }
}
