//! Lifecycle transition engine.
//!
//! Both transitions run inside one atomic unit of work against the entity
//! store and re-check their precondition (consensus present, not yet
//! finished) immediately before mutating. A timer that lost a race against
//! a delete or an earlier finish is a silent no-op, not an error — there
//! is no caller to surface it to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::push::{PushConsensus, PushEvent, PushGateway};
use crate::store::{access, EntityStore, StoreInner};

/// Result of a voting-start transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotingStartOutcome {
    /// Consensus was gone or already finished; nothing happened.
    Skipped,
    /// Voting opened with suggestions present; followers were notified.
    Notified,
    /// Zero suggestions at the boundary: the consensus finished directly,
    /// without ever exposing a voting-started notification.
    ShortCircuited,
}

/// What a completed finish transition produced, collected inside the unit
/// of work and consumed after the lock is released.
struct FinishRecord {
    consensus: PushConsensus,
    tokens: Vec<String>,
    suggestion_count: usize,
}

enum VotingStartDecision {
    Gone,
    ShortCircuit(Option<FinishRecord>),
    Notify(PushConsensus, Vec<String>),
}

pub struct TransitionEngine {
    store: Arc<EntityStore>,
    clock: Arc<dyn Clock>,
    push: Arc<dyn PushGateway>,
}

impl TransitionEngine {
    pub fn new(store: Arc<EntityStore>, clock: Arc<dyn Clock>, push: Arc<dyn PushGateway>) -> Self {
        Self { store, clock, push }
    }

    /// Finish transition: mark the consensus finished, stamp the end
    /// instant, compute each voted suggestion's overall acceptance, and
    /// notify followers when at least one suggestion exists.
    ///
    /// Idempotent — returns `true` only when the transition actually ran.
    pub fn on_finish_reached(&self, id: Uuid) -> bool {
        let now = self.clock.now();
        let record = self.store.write(|state| Self::finish_locked(state, id, now));

        let Some(record) = record else {
            debug!(consensus = %id, "finish fired for a missing or already finished consensus");
            return false;
        };

        info!(
            consensus = %id,
            suggestions = record.suggestion_count,
            "consensus finished"
        );
        if record.suggestion_count > 0 {
            self.dispatch(record.tokens, record.consensus, PushEvent::Finished);
        }
        true
    }

    /// Voting-start transition: with zero suggestions the consensus
    /// short-circuits straight to finished (voting a suggestion-less
    /// consensus is meaningless); otherwise followers are notified and the
    /// stored state is untouched — the phase itself is derived from time.
    pub fn on_voting_start_reached(&self, id: Uuid) -> VotingStartOutcome {
        let now = self.clock.now();
        let decision = self.store.write(|state| {
            let Some(consensus) = state.consensus(id) else {
                return VotingStartDecision::Gone;
            };
            if consensus.finished {
                return VotingStartDecision::Gone;
            }
            // The short-circuit decision is taken from the suggestion count
            // at the moment the timer fires, not at creation time.
            if state.suggestions_of(id).is_empty() {
                return VotingStartDecision::ShortCircuit(Self::finish_locked(state, id, now));
            }
            VotingStartDecision::Notify(
                PushConsensus::from(consensus),
                state.follower_push_tokens(id),
            )
        });

        match decision {
            VotingStartDecision::Gone => {
                debug!(consensus = %id, "voting start fired for a missing or finished consensus");
                VotingStartOutcome::Skipped
            }
            VotingStartDecision::ShortCircuit(record) => {
                if record.is_some() {
                    info!(consensus = %id, "no suggestions at voting start; finished directly");
                }
                VotingStartOutcome::ShortCircuited
            }
            VotingStartDecision::Notify(consensus, tokens) => {
                info!(consensus = %id, "voting started");
                self.dispatch(tokens, consensus, PushEvent::VotingStarted);
                VotingStartOutcome::Notified
            }
        }
    }

    /// The finish mutation itself; callable from either transition, always
    /// inside an already-held unit of work. `None` when the precondition
    /// (present, unfinished) no longer holds.
    fn finish_locked(state: &mut StoreInner, id: Uuid, now: DateTime<Utc>) -> Option<FinishRecord> {
        {
            let consensus = state.consensus_mut(id)?;
            if consensus.finished {
                return None;
            }
            consensus.finished = true;
            consensus.end_date = now;
        }

        let suggestion_ids: Vec<Uuid> = state.suggestions_of(id).iter().map(|s| s.id).collect();
        for suggestion_id in &suggestion_ids {
            let mean = access::overall_acceptance(&state.votes_of(*suggestion_id));
            if mean.is_some() {
                if let Some(suggestion) = state.suggestions.get_mut(suggestion_id) {
                    suggestion.overall_acceptance = mean;
                }
            }
        }

        let consensus = state.consensus(id)?;
        Some(FinishRecord {
            consensus: PushConsensus::from(consensus),
            tokens: state.follower_push_tokens(id),
            suggestion_count: suggestion_ids.len(),
        })
    }

    /// Fire-and-forget notification dispatch. Failures are logged and
    /// never reach the transition outcome.
    fn dispatch(&self, tokens: Vec<String>, consensus: PushConsensus, event: PushEvent) {
        if tokens.is_empty() {
            debug!(consensus = %consensus.id, ?event, "no registered push tokens; skipping fan-out");
            return;
        }
        let push = Arc::clone(&self.push);
        tokio::spawn(async move {
            if let Err(e) = push.send_to(&tokens, &consensus, event).await {
                warn!(consensus = %consensus.id, ?event, "push delivery failed: {e}");
            }
        });
    }
}
