use crate::error::ApplyError;
use crate::labeler::{LabelSet, PullRequestEvent, TrackerClient};

/// Adds `labels` to the PR of `event` with a single tracker call.
///
/// Labels that the PR already carries are filtered out, and the call is skipped when nothing
/// remains. Returns the labels that were actually sent to the tracker. A failed call is not
/// retried and labels added by earlier calls are left in place.
pub async fn apply_labels<Client: TrackerClient + ?Sized>(
    client: &Client,
    event: &PullRequestEvent,
    labels: &LabelSet,
) -> Result<LabelSet, ApplyError> {
    let add = labels.difference(&event.existing_labels);
    tracing::debug!(
        "Filtered labels: requested = {labels}, pr = {}, add = {add}",
        event.existing_labels
    );
    if add.is_empty() {
        return Ok(add);
    }

    tracing::info!("Adding label(s) {add}");
    client
        .add_labels(&event.repository, event.pr_number, &add.to_vec())
        .await
        .map_err(|error| ApplyError {
            pr: event.pr_number,
            labels: add.clone(),
            reason: format!("{error:?}"),
        })?;
    Ok(add)
}
