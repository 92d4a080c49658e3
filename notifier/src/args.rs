use std::{convert::Infallible, fmt, str::FromStr};

use clap::{Parser, Subcommand};
use deploy_notifier_common::constants::{API_URL_DEFAULT, POLL_INTERVAL_DEFAULT_SECS};

use crate::notify::MessageStyle;

/// Watch the deployments of a set of projects and notify a chat webhook when one starts or finishes
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Path to the `.sqlite` file the tracked deployments are stored in. `:memory:` keeps them in memory
    #[arg(long, default_value = "./notifier.sqlite", env = "DEPLOY_NOTIFIER_STATE")]
    pub state: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll the projects on a fixed interval until interrupted
    Start(StartArgs),

    /// Poll the projects once and exit
    Once(PollArgs),

    /// Forget the tracked deployment of a project so its next deployment is announced again
    Reset {
        /// Project to forget
        #[arg(long)]
        project: String,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct StartArgs {
    /// Seconds between two polls
    #[arg(long, default_value_t = POLL_INTERVAL_DEFAULT_SECS, env = "DEPLOY_NOTIFIER_INTERVAL")]
    pub interval: u64,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PollArgs {
    /// Url of the deployments API
    #[arg(long, default_value = API_URL_DEFAULT, env = "DEPLOY_NOTIFIER_API_URL")]
    pub api_url: String,

    /// Account the projects belong to
    #[arg(long, env = "DEPLOY_NOTIFIER_ACCOUNT_ID")]
    pub account_id: String,

    /// Token to authenticate against the deployments API with
    #[arg(long, env = "DEPLOY_NOTIFIER_API_TOKEN", hide_env_values = true)]
    pub api_token: Secret,

    /// Comma separated names of the projects to watch
    #[arg(long, env = "DEPLOY_NOTIFIER_PROJECTS", value_delimiter = ',')]
    pub projects: Vec<String>,

    /// Webhook the notifications are posted to
    #[arg(long, env = "DEPLOY_NOTIFIER_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Secret,

    /// Timeout in seconds for every outgoing request
    #[arg(long, default_value_t = 60, env = "DEPLOY_NOTIFIER_CLIENT_TIMEOUT")]
    pub client_timeout: u64,

    /// Post plain text messages instead of embeds
    #[arg(long, env = "DEPLOY_NOTIFIER_PLAIN")]
    pub plain: bool,
}

impl PollArgs {
    /// The configured projects, trimmed, without blanks or duplicates, in the order given
    pub fn project_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.projects.len());

        for name in self.projects.iter().map(|name| name.trim()) {
            if !name.is_empty() && !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }

        names
    }

    pub fn message_style(&self) -> MessageStyle {
        if self.plain {
            MessageStyle::Plain
        } else {
            MessageStyle::Embed
        }
    }
}

/// A credential that is never printed
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for Secret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}
