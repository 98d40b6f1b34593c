//! Suggestion and vote operations exposed to the routing layer.
//!
//! The lifecycle windows are strict: suggestions may be created, renamed,
//! or deleted only until the voting-start deadline; votes are accepted
//! only from that deadline until finish. All window and standing checks
//! re-read the consensus inside the unit of work.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::api::{validate, views};
use crate::clock::Clock;
use crate::model::{SuggestionInput, SuggestionResponse, User, VoteInput};
use crate::store::{EntityStore, StoreInner};
use crate::types::{ConclaveError, ErrorKind, Result};

#[derive(Clone)]
pub struct SuggestionService {
    store: Arc<EntityStore>,
    clock: Arc<dyn Clock>,
}

impl SuggestionService {
    pub fn new(store: Arc<EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// All suggestions of a consensus, in creation order.
    pub fn list(&self, consensus_id: Uuid, user: Option<&User>) -> Result<Vec<SuggestionResponse>> {
        self.store.read(|state| {
            if state.consensus(consensus_id).is_none() {
                return Err(ConclaveError::NotFound);
            }
            Ok(state
                .suggestions_of(consensus_id)
                .into_iter()
                .map(|s| views::suggestion_response(state, s, user))
                .collect())
        })
    }

    /// Single suggestion view; the id must belong to the given consensus.
    pub fn get(
        &self,
        consensus_id: Uuid,
        suggestion_id: Uuid,
        user: Option<&User>,
    ) -> Result<SuggestionResponse> {
        self.store.read(|state| {
            if state.consensus(consensus_id).is_none() {
                return Err(ConclaveError::NotFound);
            }
            let suggestion = state
                .suggestion_of(consensus_id, suggestion_id)
                .ok_or(ConclaveError::NotFound)?;
            Ok(views::suggestion_response(state, suggestion, user))
        })
    }

    /// Add a suggestion. Only while the consensus is open and the
    /// voting-start deadline has not passed; accessors only; the title
    /// must be unique within the consensus (case-sensitive). The creator
    /// auto-follows.
    pub fn create(
        &self,
        consensus_id: Uuid,
        input: SuggestionInput,
        user: &User,
    ) -> Result<SuggestionResponse> {
        let now = self.clock.now();
        validate::validate_suggestion(&input)?;

        let response = self.store.write(|state| -> Result<SuggestionResponse> {
            let consensus = state.consensus(consensus_id).ok_or(ConclaveError::NotFound)?;
            if !consensus.accepts_suggestions(now) {
                return Err(ConclaveError::bad_request());
            }
            if !state.is_accessor(consensus_id, user.id) {
                return Err(ConclaveError::Forbidden);
            }
            if state.title_taken(consensus_id, &input.title) {
                return Err(ConclaveError::validation(
                    ErrorKind::DuplicateSuggestionTitle,
                    "titleText",
                ));
            }
            let suggestion = state.insert_suggestion(consensus_id, user.id, input.title, now);
            state.follow(consensus_id, user.id);
            Ok(views::suggestion_response(state, &suggestion, Some(user)))
        })?;

        info!(consensus = %consensus_id, suggestion = %response.id, "suggestion created");
        Ok(response)
    }

    /// Rename a suggestion. Same window as creation; allowed for the
    /// suggestion's creator or a consensus admin, who must also hold
    /// accessor standing. The editor auto-follows.
    pub fn update(
        &self,
        consensus_id: Uuid,
        suggestion_id: Uuid,
        input: SuggestionInput,
        user: &User,
    ) -> Result<SuggestionResponse> {
        let now = self.clock.now();
        validate::validate_suggestion(&input)?;

        self.store.write(|state| {
            let consensus = state.consensus(consensus_id).ok_or(ConclaveError::NotFound)?;
            if !consensus.accepts_suggestions(now) {
                return Err(ConclaveError::bad_request());
            }
            let suggestion = state
                .suggestion_of(consensus_id, suggestion_id)
                .ok_or(ConclaveError::NotFound)?;
            Self::check_editable(state, consensus_id, suggestion.creator_id, user)?;

            let suggestion = state
                .rename_suggestion(suggestion_id, input.title)
                .ok_or(ConclaveError::NotFound)?;
            state.follow(consensus_id, user.id);
            Ok(views::suggestion_response(state, &suggestion, Some(user)))
        })
    }

    /// Cast or update a vote. Only within the voting window; accessors
    /// only; the acceptance must be within range. The voter auto-follows.
    pub fn vote(
        &self,
        consensus_id: Uuid,
        suggestion_id: Uuid,
        input: VoteInput,
        user: &User,
    ) -> Result<SuggestionResponse> {
        let now = self.clock.now();
        validate::validate_vote(&input)?;

        self.store.write(|state| {
            let consensus = state.consensus(consensus_id).ok_or(ConclaveError::NotFound)?;
            let suggestion = state
                .suggestion_of(consensus_id, suggestion_id)
                .ok_or(ConclaveError::NotFound)?;
            if !consensus.voting_open(now) {
                return Err(ConclaveError::bad_request());
            }
            if !state.is_accessor(consensus_id, user.id) {
                return Err(ConclaveError::Forbidden);
            }
            let suggestion_id = suggestion.id;
            state.upsert_vote(suggestion_id, user.id, input.acceptance);
            state.follow(consensus_id, user.id);

            let suggestion = state
                .suggestion(suggestion_id)
                .ok_or(ConclaveError::NotFound)?;
            Ok(views::suggestion_response(state, suggestion, Some(user)))
        })
    }

    /// Delete a suggestion, cascading to its votes. Only before the
    /// voting-start deadline; same authorship rule as renaming.
    pub fn delete(&self, consensus_id: Uuid, suggestion_id: Uuid, user: &User) -> Result<()> {
        let now = self.clock.now();
        self.store.write(|state| {
            let consensus = state.consensus(consensus_id).ok_or(ConclaveError::NotFound)?;
            if !consensus.accepts_suggestions(now) {
                return Err(ConclaveError::bad_request());
            }
            let suggestion = state
                .suggestion_of(consensus_id, suggestion_id)
                .ok_or(ConclaveError::NotFound)?;
            Self::check_editable(state, consensus_id, suggestion.creator_id, user)?;

            state.remove_suggestion(suggestion_id);
            Ok(())
        })?;

        info!(consensus = %consensus_id, suggestion = %suggestion_id, "suggestion deleted");
        Ok(())
    }

    /// A suggestion is editable by its creator or a consensus admin, and
    /// the caller must additionally hold accessor standing.
    fn check_editable(
        state: &StoreInner,
        consensus_id: Uuid,
        creator_id: Uuid,
        user: &User,
    ) -> Result<()> {
        let owns = user.id == creator_id || state.is_admin(consensus_id, user.id);
        if !owns || !state.is_accessor(consensus_id, user.id) {
            return Err(ConclaveError::Forbidden);
        }
        Ok(())
    }
}
