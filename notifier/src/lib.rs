pub mod args;
mod error;
pub mod notify;
pub mod persistence;
pub mod poll;

use std::time::Duration;

use deploy_notifier_api_client::DeploymentsApiClient;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace, warn};

pub use crate::args::Args;
use crate::args::{Command, PollArgs};
pub use crate::error::Error;
use crate::notify::{NotificationSink, WebhookSink};
use crate::persistence::{Sqlite, StateStore};
use crate::poll::{AccountDeployments, DeploymentSource, PassSummary, Poller};

pub async fn run(args: Args) -> Result<(), Error> {
    trace!(?args, "starting with args");

    let store = Sqlite::new(&args.state).await?;

    match args.command {
        Command::Start(start) => {
            let poller = build_poller(store, &start.poll)?;

            schedule(&poller, Duration::from_secs(start.interval.max(1))).await;
        }
        Command::Once(poll) => {
            let poller = build_poller(store, &poll)?;

            pass(&poller).await;
        }
        Command::Reset { project } => {
            if store.reset_state(&project).await? {
                info!(project, "forgot the tracked deployment");
            } else {
                info!(project, "no deployment was tracked");
            }
        }
    }

    Ok(())
}

fn build_poller<S: StateStore>(
    store: S,
    args: &PollArgs,
) -> Result<Poller<AccountDeployments, S, WebhookSink>, Error> {
    let client = DeploymentsApiClient::new(
        args.api_url.clone(),
        args.api_token.expose().to_string(),
        Some(args.client_timeout),
    )
    .map_err(Error::Client)?;
    let source = AccountDeployments::new(client, args.account_id.clone());
    let sink = WebhookSink::new(
        args.webhook_url.expose().to_string(),
        Some(args.client_timeout),
    )?;

    Ok(Poller::new(
        source,
        store,
        sink,
        args.project_names(),
        args.message_style(),
    ))
}

/// Run a pass on every tick of `period` until interrupted. A pass is awaited before the next tick
/// is taken, so passes never overlap.
pub async fn schedule<D, S, N>(poller: &Poller<D, S, N>, period: Duration)
where
    D: DeploymentSource,
    S: StateStore,
    N: NotificationSink,
{
    info!(
        projects = ?poller.projects(),
        period_secs = period.as_secs(),
        "starting to poll"
    );

    let mut interval = interval(period);

    // Without this, the default behaviour will burst any missed ticks until they are caught up.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted, stopping");
                break;
            }
            _ = interval.tick() => {
                pass(poller).await;
            }
        }
    }
}

/// Run a single pass and log its totals
pub async fn pass<D, S, N>(poller: &Poller<D, S, N>) -> PassSummary
where
    D: DeploymentSource,
    S: StateStore,
    N: NotificationSink,
{
    let outcomes = poller.poll_once().await;
    let summary = PassSummary::from_outcomes(&outcomes);

    if summary.failed_projects > 0 || summary.failed_sends > 0 {
        warn!(
            projects = summary.projects,
            failed_projects = summary.failed_projects,
            notified = summary.notified,
            failed_sends = summary.failed_sends,
            "poll pass finished with failures"
        );
    } else {
        info!(
            projects = summary.projects,
            notified = summary.notified,
            "poll pass finished"
        );
    }

    summary
}
