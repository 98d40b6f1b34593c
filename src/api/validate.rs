//! Boundary validation.
//!
//! Every check here runs before any unit of work; errors come back as a
//! field-tagged list so the routing layer can attribute them to inputs.

use chrono::{DateTime, Utc};

use crate::model::{ConsensusInput, SuggestionInput, VoteInput, ACCEPTANCE_MAX, ACCEPTANCE_MIN};
use crate::types::{ConclaveError, ErrorKind, FieldError, Result};

/// Minimum length of consensus and suggestion titles.
pub const TITLE_MIN_LENGTH: usize = 4;

/// Validate a consensus create/update body against the current instant.
pub fn validate_consensus(input: &ConsensusInput, now: DateTime<Utc>) -> Result<()> {
    let mut errors = Vec::new();
    if input.end_date < now {
        errors.push(FieldError::on(ErrorKind::EndDateInvalid, "endDate"));
    }
    if title_too_short(&input.title) {
        errors.push(FieldError::on(ErrorKind::TitleTooShort, "titleText"));
    }
    if input.voting_start_date > input.end_date {
        errors.push(FieldError::on(
            ErrorKind::VotingStartAfterEnd,
            "votingStartDate",
        ));
    }
    reject_if_any(errors)
}

/// Validate a suggestion create/rename body.
pub fn validate_suggestion(input: &SuggestionInput) -> Result<()> {
    let mut errors = Vec::new();
    if title_too_short(&input.title) {
        errors.push(FieldError::on(ErrorKind::TitleTooShort, "titleText"));
    }
    reject_if_any(errors)
}

/// Validate a vote body. NaN fails the range check like any other
/// out-of-range value.
pub fn validate_vote(input: &VoteInput) -> Result<()> {
    if !(ACCEPTANCE_MIN..=ACCEPTANCE_MAX).contains(&input.acceptance) {
        return Err(ConclaveError::validation(
            ErrorKind::AcceptanceOutOfRange,
            "vote",
        ));
    }
    Ok(())
}

fn title_too_short(title: &str) -> bool {
    title.trim().chars().count() < TITLE_MIN_LENGTH
}

fn reject_if_any(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConclaveError::Validation(errors))
    }
}
