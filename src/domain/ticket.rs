//! Support ticket thread rules.

use thiserror::Error;

use crate::models::TicketStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("ticket is closed")]
    Closed,
}

/// Both sides may append while the ticket is open or in progress. A closed
/// ticket takes no further messages; the insert path re-checks this
/// condition in SQL so no row is ever created for a closed ticket.
pub fn ensure_reply_allowed(status: TicketStatus) -> Result<(), TicketError> {
    match status {
        TicketStatus::Closed => Err(TicketError::Closed),
        TicketStatus::Open | TicketStatus::InProgress => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_gate() {
        assert_eq!(ensure_reply_allowed(TicketStatus::Open), Ok(()));
        assert_eq!(ensure_reply_allowed(TicketStatus::InProgress), Ok(()));
        assert_eq!(
            ensure_reply_allowed(TicketStatus::Closed),
            Err(TicketError::Closed)
        );
    }
}
