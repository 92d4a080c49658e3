use std::process::exit;

use clap::Parser;
use deploy_notifier::Args;
use deploy_notifier_common::backends::tracing::setup_tracing;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = Args::parse();

    setup_tracing(tracing_subscriber::registry(), "deploy-notifier");

    if let Err(error) = deploy_notifier::run(args).await {
        error!(
            error = &error as &dyn std::error::Error,
            "deploy notifier stopped"
        );
        exit(1);
    }
}
