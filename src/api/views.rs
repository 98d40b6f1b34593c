//! Response view-model builders.
//!
//! Built inside the caller's unit of work so every derived field — counts,
//! voter lists, membership flags — reflects one consistent snapshot.

use chrono::{DateTime, Utc};

use crate::model::{Consensus, ConsensusResponse, Suggestion, SuggestionResponse, User};
use crate::store::{access, StoreInner};

pub(crate) fn consensus_response(
    state: &StoreInner,
    consensus: &Consensus,
    user: Option<&User>,
    now: DateTime<Utc>,
) -> ConsensusResponse {
    let user_id = user.map(|u| u.id);
    ConsensusResponse {
        id: consensus.id,
        title: consensus.title.clone(),
        description: consensus.description.clone(),
        creator: state
            .users
            .get(&consensus.creator_id)
            .map(|u| u.username.clone())
            .unwrap_or_default(),
        creation_date: consensus.creation_date,
        end_date: consensus.end_date,
        voting_start_date: consensus.voting_start_date,
        phase: consensus.phase(now),
        public: consensus.is_public,
        finished: consensus.finished,
        suggestions_count: state.suggestions_of(consensus.id).len(),
        voters: state.distinct_voters(consensus.id),
        admin: user_id.is_some_and(|u| state.is_admin(consensus.id, u)),
        has_access: consensus.is_public || user_id.is_some_and(|u| state.is_accessor(consensus.id, u)),
        following: user_id.is_some_and(|u| state.is_following(consensus.id, u)),
    }
}

pub(crate) fn suggestion_response(
    state: &StoreInner,
    suggestion: &Suggestion,
    user: Option<&User>,
) -> SuggestionResponse {
    let finished = state
        .consensus(suggestion.consensus_id)
        .map(|c| c.finished)
        .unwrap_or(false);
    let votes = state.votes_of(suggestion.id);

    SuggestionResponse {
        id: suggestion.id,
        consensus_id: suggestion.consensus_id,
        title: suggestion.title.clone(),
        creation_date: suggestion.creation_date,
        overall_acceptance: suggestion.overall_acceptance,
        admin: user.is_some_and(|u| {
            u.id == suggestion.creator_id || state.is_admin(suggestion.consensus_id, u.id)
        }),
        own_acceptance: user.and_then(|u| state.own_acceptance(suggestion.id, u.id)),
        voters: state.voter_names(suggestion.id),
        // Exposed only post-finish: earlier it would leak in-progress
        // sentiment.
        heavy_objections_count: finished.then(|| access::heavy_objections(&votes)),
    }
}
