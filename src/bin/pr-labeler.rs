use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

use pr_labeler::config::{LabelerConfig, CONFIG_FILE_PATH};
use pr_labeler::github::server::{create_app, ServerState};
use pr_labeler::github::{
    parse_webhook_event, GithubCredentials, GithubTrackerClient, WebhookSecret,
};
use pr_labeler::labeler::{create_labeler_process, handle_pull_request_event, LabelerContext};
use pr_labeler::utils::timing::DEFAULT_REQUEST_TIMEOUT;

#[derive(clap::Parser)]
#[command(version, about = "Labels pull requests by changed files and by author origin")]
struct Opts {
    /// Path to the labeler configuration file.
    #[arg(long, env = "LABELER_CONFIG", default_value = CONFIG_FILE_PATH)]
    config: PathBuf,

    /// Token used to access the GitHub API.
    #[arg(long, env = "GITHUB_TOKEN")]
    github_token: Option<String>,

    /// Github App ID, used when no token is given.
    #[arg(long, env = "APP_ID")]
    app_id: Option<u64>,

    /// Private key used to authenticate as a Github App.
    #[arg(long, env = "PRIVATE_KEY")]
    private_key: Option<String>,

    /// Timeout of a single GitHub API call, in seconds.
    #[arg(long, env = "GITHUB_API_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    api_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Receive pull request webhooks and label them.
    Serve {
        /// Secret used to authenticate webhooks.
        #[arg(long, env = "WEBHOOK_SECRET")]
        webhook_secret: String,

        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Label the pull request of a single event payload, e.g. inside a workflow run.
    Run {
        /// File containing the JSON event payload.
        #[arg(long, env = "GITHUB_EVENT_PATH")]
        event_path: PathBuf,

        /// Type of the event stored in the payload.
        #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "pull_request_target")]
        event_name: String,
    },
}

async fn server(state: ServerState, port: u16) -> anyhow::Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve(
    ctx: LabelerContext,
    client: GithubTrackerClient,
    webhook_secret: String,
    port: u16,
) -> anyhow::Result<()> {
    let (tx, labeler_process) = create_labeler_process(ctx, Arc::new(client));
    let state = ServerState::new(tx, WebhookSecret::new(webhook_secret));

    tokio::select! {
        () = labeler_process => {
            tracing::warn!("Labeler process has ended");
            Ok(())
        },
        res = server(state, port) => {
            tracing::warn!("Server has ended: {res:?}");
            res
        }
    }
}

async fn run_once(
    ctx: LabelerContext,
    client: GithubTrackerClient,
    event_path: PathBuf,
    event_name: String,
) -> anyhow::Result<()> {
    let body = tokio::fs::read(&event_path)
        .await
        .with_context(|| format!("Cannot read event payload {}", event_path.display()))?;
    let Some(event) = parse_webhook_event(event_name.as_bytes(), &body)
        .with_context(|| format!("Cannot parse `{event_name}` event payload"))?
    else {
        tracing::warn!("Event `{event_name}` does not concern a pull request, nothing to label");
        return Ok(());
    };

    let span = tracing::info_span!(
        "PullRequestEvent",
        repo = %event.repository,
        pr = event.pr_number.0,
        action = event.action.as_str()
    );
    match handle_pull_request_event(&ctx, &client, &event)
        .instrument(span)
        .await
    {
        None => Ok(()),
        Some(report) if report.is_success() => {
            tracing::info!("Labeling finished: {report:?}");
            Ok(())
        }
        Some(report) => Err(anyhow::anyhow!(
            "Labeling of PR {} failed: {report:?}",
            event.pr_number
        )),
    }
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let config = LabelerConfig::load(&opts.config)?;
    let ctx = LabelerContext::from_config(&config)?;
    tracing::info!(
        "Loaded {} rule(s) and {} maintainer(s) from {}",
        config.rules.len(),
        config.origin.maintainers.len(),
        opts.config.display()
    );

    let credentials =
        GithubCredentials::from_parts(opts.github_token, opts.app_id, opts.private_key)?;
    let timeout = Duration::from_secs(opts.api_timeout);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    runtime.block_on(async move {
        let client = GithubTrackerClient::new(&credentials, timeout)?;
        match opts.command {
            Command::Serve {
                webhook_secret,
                port,
            } => serve(ctx, client, webhook_secret, port).await,
            Command::Run {
                event_path,
                event_name,
            } => run_once(ctx, client, event_path, event_name).await,
        }
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
