use thiserror::Error;

use funnel_store::StoreError;

/// Errors that abort a single pipeline iteration.
///
/// Lead persistence is the only fatal step: without an assigned id no
/// downstream operation is possible. Everything after it is best-effort.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("lead persistence failed: {0}")]
    LeadNotCreated(#[from] StoreError),
}
