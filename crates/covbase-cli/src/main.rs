//! covbase entrypoint.

use clap::Parser;
use covbase_cache::{CacheKeyCodec, FilesystemProvider};
use covbase_core::{Result, TriggerContext};
use covbase_github::GitHubClient;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod outputs;
mod render;
mod runner;

#[cfg(test)]
mod runner_tests;

use config::{ActionArgs, ActionConfig};
use outputs::StepOutputs;
use render::SummaryRenderer;
use runner::{Collaborators, Runner};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn execute(args: ActionArgs) -> Result<()> {
    let config = ActionConfig::from_args(args)?;
    let ctx = TriggerContext::from_env()?;
    let workdir = std::env::current_dir()?;

    let github = GitHubClient::new(&config.api_url, config.token.clone())?;
    let store = match &config.cache_dir {
        Some(dir) => FilesystemProvider::new(dir.clone()),
        None => FilesystemProvider::default(),
    };
    info!("Baseline store at {}", store.root_dir().display());

    let renderer = SummaryRenderer::new(&workdir);

    let outcome = Runner::new(
        &ctx,
        &config,
        CacheKeyCodec::for_host(),
        Collaborators {
            store: &store,
            commits: &github,
            pulls: &github,
            renderer: &renderer,
        },
        &workdir,
    )
    .run()
    .await?;

    let outputs = StepOutputs::from_env();
    outputs.set("comment-file", &outcome.comment_file.to_string_lossy())?;
    outputs.set("comment", &outcome.comment)?;
    info!(
        previous_commit_id = ?outcome.previous_commit_id,
        "Published baseline under {}",
        outcome.published_key
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = ActionArgs::parse();
    match execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Something went wrong: {}", e);
            outputs::report_failure(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
