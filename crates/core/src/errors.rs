use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why one entity was excluded from a batch run. None of these abort the
/// batch: the run continues with the remaining entities and reports the
/// skips alongside its results.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("insufficient history: {observed} of {required} required periods")]
    InsufficientHistory { observed: usize, required: usize },
    #[error("degenerate numeric input: {0}")]
    NumericDegenerate(String),
    #[error("missing upstream data: {0}")]
    MissingUpstreamData(String),
    #[error("entity processing failed: {0}")]
    Failed(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::SkipReason;

    #[test]
    fn skip_reason_messages_carry_entity_context() {
        let reason = SkipReason::InsufficientHistory { observed: 2, required: 3 };
        assert_eq!(reason.to_string(), "insufficient history: 2 of 3 required periods");
    }
}
