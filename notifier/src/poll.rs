//! One poll pass over every tracked project.
//!
//! Each project runs its own pipeline (fetch, load state, decide, notify, persist). The pipelines
//! run concurrently and share nothing but the clients, so a failing project never holds back or
//! aborts the others.

use chrono::Utc;
use deploy_notifier_api_client::DeploymentsApiClient;
use deploy_notifier_common::{decide, NotifyAction, Observation};
use futures::future::join_all;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    notify::{self, MessageStyle, NotificationSink},
    persistence::StateStore,
    Error,
};

/// Where the latest deployment of a project is read from
#[allow(async_fn_in_trait)]
pub trait DeploymentSource {
    /// `None` when there is nothing to report for the project yet
    async fn latest_deployment(&self, project: &str) -> Result<Option<Observation>, Error>;
}

/// The deployments of the projects in one account
#[derive(Clone)]
pub struct AccountDeployments {
    client: DeploymentsApiClient,
    account_id: String,
}

impl AccountDeployments {
    pub fn new(client: DeploymentsApiClient, account_id: String) -> Self {
        Self { client, account_id }
    }
}

impl DeploymentSource for AccountDeployments {
    async fn latest_deployment(&self, project: &str) -> Result<Option<Observation>, Error> {
        self.client
            .get_latest_deployment(&self.account_id, project)
            .await
            .map_err(|error| Error::Fetch {
                project: project.to_string(),
                error,
            })
    }
}

/// What a project's pipeline did in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The project has no deployment that can be tracked
    NothingToReport,
    Processed {
        /// Notifications the sink accepted
        notified: usize,
        /// Notifications the sink rejected or could not be reached for
        failed_sends: usize,
        /// Whether the tracked state was written
        persisted: bool,
    },
}

#[derive(Debug)]
pub struct ProjectOutcome {
    pub project: String,
    pub result: Result<Outcome, Error>,
}

pub struct Poller<D, S, N> {
    source: D,
    store: S,
    sink: N,
    projects: Vec<String>,
    style: MessageStyle,
}

impl<D, S, N> Poller<D, S, N>
where
    D: DeploymentSource,
    S: StateStore,
    N: NotificationSink,
{
    pub fn new(source: D, store: S, sink: N, projects: Vec<String>, style: MessageStyle) -> Self {
        Self {
            source,
            store,
            sink,
            projects,
            style,
        }
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Poll every project concurrently and wait for all of them to finish
    pub async fn poll_once(&self) -> Vec<ProjectOutcome> {
        if self.projects.is_empty() {
            warn!("no projects are configured, nothing to poll");
            return Vec::new();
        }

        let pipelines = self.projects.iter().map(|project| {
            let span = info_span!("poll", project = %project);

            async move {
                let result = self.poll_project(project).await;

                if let Err(error) = &result {
                    error!(
                        error = error as &dyn std::error::Error,
                        "failed to poll project"
                    );
                }

                ProjectOutcome {
                    project: project.clone(),
                    result,
                }
            }
            .instrument(span)
        });

        join_all(pipelines).await
    }

    async fn poll_project(&self, project: &str) -> Result<Outcome, Error> {
        let Some(observation) = self.source.latest_deployment(project).await? else {
            debug!("no deployment to track");
            return Ok(Outcome::NothingToReport);
        };

        let previous = self.store.load_state(project).await?;
        let decision = decide(previous.as_ref(), &observation);

        debug!(
            deployment.id = %observation.id,
            deployment.status = %observation.status,
            actions = decision.actions.len(),
            changed = decision.changed,
            "decided on observation"
        );

        let mut notified = 0;
        let mut failed_sends = 0;

        for action in &decision.actions {
            let message = notify::format(project, action, self.style, Utc::now());

            // A rejected notification is not retried and does not keep the new state from being recorded
            match self.sink.send(&message).await {
                Ok(()) => {
                    info!(
                        deployment.id = %action.observation().id,
                        notification = action_name(action),
                        "sent notification"
                    );
                    notified += 1;
                }
                Err(error) => {
                    warn!(
                        error = &error as &dyn std::error::Error,
                        deployment.id = %action.observation().id,
                        notification = action_name(action),
                        "failed to send notification"
                    );
                    failed_sends += 1;
                }
            }
        }

        let persisted = match decision.state {
            Some(state) if decision.changed => {
                self.store.store_state(project, &state).await?;
                true
            }
            _ => false,
        };

        Ok(Outcome::Processed {
            notified,
            failed_sends,
            persisted,
        })
    }
}

fn action_name(action: &NotifyAction) -> &'static str {
    match action {
        NotifyAction::Started(_) => "started",
        NotifyAction::Finished(_) => "finished",
    }
}

/// Totals of one pass, for logging
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub projects: usize,
    pub failed_projects: usize,
    pub notified: usize,
    pub failed_sends: usize,
}

impl PassSummary {
    pub fn from_outcomes(outcomes: &[ProjectOutcome]) -> Self {
        let mut summary = Self {
            projects: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            match &outcome.result {
                Ok(Outcome::Processed {
                    notified,
                    failed_sends,
                    ..
                }) => {
                    summary.notified += notified;
                    summary.failed_sends += failed_sends;
                }
                Ok(Outcome::NothingToReport) => {}
                Err(_) => summary.failed_projects += 1,
            }
        }

        summary
    }
}
