use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::error::{ApplyError, MatchError};
use crate::labeler::{apply_labels, LabelSet, LabelerContext, PullRequestEvent, TrackerClient};
use crate::utils::logging::LogError;

/// Failure of the content rule lane.
#[derive(Debug, thiserror::Error)]
pub enum RuleLaneError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Outcome of both labeling lanes for a single event.
/// Each lane reports the labels it added to the PR, or why it failed.
#[derive(Debug)]
pub struct LabelingReport {
    pub rule_labels: Result<LabelSet, RuleLaneError>,
    pub origin_labels: Result<LabelSet, ApplyError>,
}

impl LabelingReport {
    pub fn is_success(&self) -> bool {
        self.rule_labels.is_ok() && self.origin_labels.is_ok()
    }
}

/// Labels a pull request using the content rules and the origin of its sender.
///
/// The two lanes run concurrently and are only joined on completion: a failure of the
/// content rule lane never prevents the origin lane from labeling the PR.
/// Returns `None` if the event's action is not one that should be labeled.
pub async fn handle_pull_request_event<Client: TrackerClient + ?Sized>(
    ctx: &LabelerContext,
    client: &Client,
    event: &PullRequestEvent,
) -> Option<LabelingReport> {
    if !ctx.handles_action(&event.action) {
        tracing::debug!("Ignoring pull request action `{}`", event.action);
        return None;
    }

    let rule_span = tracing::info_span!("RuleLabels");
    let origin_span = tracing::info_span!("OriginLabels", sender = event.sender.as_str());
    let (rule_labels, origin_labels) = tokio::join!(
        label_by_rules(ctx, client, event).instrument(rule_span.clone()),
        label_by_origin(ctx, client, event).instrument(origin_span.clone()),
    );

    if let Err(error) = &rule_labels {
        rule_span.log_error(error);
    }
    if let Err(error) = &origin_labels {
        origin_span.log_error(error);
    }

    Some(LabelingReport {
        rule_labels,
        origin_labels,
    })
}

async fn label_by_rules<Client: TrackerClient + ?Sized>(
    ctx: &LabelerContext,
    client: &Client,
    event: &PullRequestEvent,
) -> Result<LabelSet, RuleLaneError> {
    if ctx.matcher.is_empty() {
        tracing::debug!("No content rules configured");
        return Ok(LabelSet::new());
    }

    let changed_paths = client
        .get_changed_paths(&event.repository, event.pr_number)
        .await
        .map_err(|error| MatchError::ChangedPaths {
            pr: event.pr_number,
            reason: format!("{error:?}"),
        })?;
    tracing::debug!("PR changes {} path(s)", changed_paths.len());

    let labels = ctx.matcher.match_labels(event, &changed_paths);
    Ok(apply_labels(client, event, &labels).await?)
}

async fn label_by_origin<Client: TrackerClient + ?Sized>(
    ctx: &LabelerContext,
    client: &Client,
    event: &PullRequestEvent,
) -> Result<LabelSet, ApplyError> {
    // The sender of a `reopened` or `synchronize` event is not necessarily the PR author,
    // so a PR keeps the origin it was first labeled with.
    if let Some(origin) = ctx.classifier.existing_origin(&event.existing_labels) {
        tracing::info!("PR is already labeled as {origin:?}");
        return Ok(LabelSet::new());
    }

    let origin = ctx.classifier.origin(&event.sender);
    tracing::info!("PR sender `{}` classified as {origin:?}", event.sender);
    let labels = ctx.classifier.classify(&event.sender);
    apply_labels(client, event, &labels).await
}

/// Creates a future with a labeling process that continuously receives pull request events
/// and labels them.
pub fn create_labeler_process(
    ctx: LabelerContext,
    client: Arc<dyn TrackerClient>,
) -> (
    mpsc::Sender<PullRequestEvent>,
    impl Future<Output = ()> + Send,
) {
    let (tx, mut rx) = mpsc::channel::<PullRequestEvent>(1024);

    let service = async move {
        while let Some(event) = rx.recv().await {
            let span = tracing::info_span!(
                "PullRequestEvent",
                repo = %event.repository,
                pr = event.pr_number.0,
                action = event.action.as_str()
            );
            tracing::debug!("Received pull request event: {event:#?}");
            if let Some(report) = handle_pull_request_event(&ctx, client.as_ref(), &event)
                .instrument(span.clone())
                .await
            {
                span.in_scope(|| {
                    tracing::info!("Labeling finished: {report:?}");
                });
            }
        }
    };
    (tx, service)
}
