//! Return request adjudication rules.

use thiserror::Error;

use crate::models::ReturnStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnDecision {
    Approve,
    Reject,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdjudicationError {
    #[error("return request was already adjudicated")]
    AlreadyDecided,
}

/// A pending request transitions exactly once. Anything else is a conflict.
pub fn adjudicate(
    current: ReturnStatus,
    decision: ReturnDecision,
) -> Result<ReturnStatus, AdjudicationError> {
    match current {
        ReturnStatus::Pending => Ok(match decision {
            ReturnDecision::Approve => ReturnStatus::Approved,
            ReturnDecision::Reject => ReturnStatus::Rejected,
        }),
        _ => Err(AdjudicationError::AlreadyDecided),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_transitions_once() {
        assert_eq!(
            adjudicate(ReturnStatus::Pending, ReturnDecision::Approve),
            Ok(ReturnStatus::Approved)
        );
        assert_eq!(
            adjudicate(ReturnStatus::Pending, ReturnDecision::Reject),
            Ok(ReturnStatus::Rejected)
        );
    }

    #[test]
    fn test_decided_requests_are_immutable() {
        for status in [ReturnStatus::Approved, ReturnStatus::Rejected] {
            assert_eq!(
                adjudicate(status, ReturnDecision::Approve),
                Err(AdjudicationError::AlreadyDecided)
            );
        }
    }
}
