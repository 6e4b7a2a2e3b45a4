use std::fmt::Debug;

use tracing::span::Span;

/// Reports the failure of a labeling lane in the span the lane ran in, so the
/// error carries the repository and PR recorded on that span.
pub trait LogError {
    fn log_error<E: Debug>(&self, error: E);
}

impl LogError for Span {
    fn log_error<E: Debug>(&self, error: E) {
        self.in_scope(|| {
            tracing::error!("Labeling lane failed: {error:?}");
        });
    }
}
