//! Consensus operations exposed to the routing layer.
//!
//! Field validation (and secret hashing) happens before the unit of work;
//! standing and lifecycle-state preconditions are re-checked inside it, so
//! a request racing a timer or a delete observes one consistent outcome.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::api::{validate, views};
use crate::auth;
use crate::clock::Clock;
use crate::lifecycle::LifecycleScheduler;
use crate::model::{
    AccessRequest, Consensus, ConsensusDraft, ConsensusInput, ConsensusResponse, FollowInput, User,
};
use crate::store::{EntityStore, StoreInner};
use crate::types::{ConclaveError, Result};

/// Default page size for list operations.
pub const DEFAULT_PAGE_LIMIT: usize = 100;
/// Default page size for title search.
pub const SEARCH_PAGE_LIMIT: usize = 25;

/// Limit/offset pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Clone)]
pub struct ConsensusService {
    store: Arc<EntityStore>,
    scheduler: Arc<LifecycleScheduler>,
    clock: Arc<dyn Clock>,
}

impl ConsensusService {
    pub fn new(
        store: Arc<EntityStore>,
        scheduler: Arc<LifecycleScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            scheduler,
            clock,
        }
    }

    /// Create a consensus. The creator becomes admin, accessor, and
    /// follower; both lifecycle timers are registered from the deadlines.
    pub fn create(&self, input: ConsensusInput, creator: &User) -> Result<ConsensusResponse> {
        let now = self.clock.now();
        validate::validate_consensus(&input, now)?;
        let draft = self.draft_from(input)?;

        let (consensus, response) = self.store.write(|state| {
            let consensus = state.insert_consensus(draft, creator.id, now);
            let response = views::consensus_response(state, &consensus, Some(creator), now);
            (consensus, response)
        });

        info!(consensus = %consensus.id, creator = %creator.username, "consensus created");
        self.scheduler.register_finish(&consensus);
        self.scheduler.register_voting_start(&consensus);
        Ok(response)
    }

    /// Update a consensus. Rejected once finished; admins only. Both
    /// timers are re-registered so exactly one of each reflects the new
    /// deadlines, and the editor auto-follows.
    pub fn update(
        &self,
        id: Uuid,
        input: ConsensusInput,
        user: &User,
    ) -> Result<ConsensusResponse> {
        let now = self.clock.now();
        validate::validate_consensus(&input, now)?;
        let draft = self.draft_from(input)?;

        let (consensus, response) = self.store.write(|state| -> Result<(Consensus, ConsensusResponse)> {
            let current = state.consensus(id).ok_or(ConclaveError::NotFound)?;
            if current.finished {
                return Err(ConclaveError::bad_request());
            }
            if !state.is_admin(id, user.id) {
                return Err(ConclaveError::Forbidden);
            }
            let consensus = state
                .apply_consensus_update(id, draft)
                .ok_or(ConclaveError::NotFound)?;
            state.follow(id, user.id);
            let response = views::consensus_response(state, &consensus, Some(user), now);
            Ok((consensus, response))
        })?;

        info!(consensus = %id, "consensus updated; rescheduling timers");
        self.scheduler.register_finish(&consensus);
        self.scheduler.register_voting_start(&consensus);
        Ok(response)
    }

    /// Delete a consensus, cascading to suggestions, votes, and access
    /// relations. Admins only. Pending timers are cancelled first; one
    /// already firing resolves through the engine's precondition re-check.
    pub fn delete(&self, id: Uuid, user: &User) -> Result<()> {
        let standing = self.store.read(|state| {
            state
                .consensus(id)
                .map(|_| state.is_admin(id, user.id))
        });
        match standing {
            None => return Err(ConclaveError::NotFound),
            Some(false) => return Err(ConclaveError::Forbidden),
            Some(true) => {}
        }

        self.scheduler.unregister_finish(id);
        self.scheduler.unregister_voting_start(id);
        self.store.write(|state| state.remove_consensus(id));
        info!(consensus = %id, "consensus deleted");
        Ok(())
    }

    /// Single consensus view, relative to the optional calling user.
    pub fn get(&self, id: Uuid, user: Option<&User>) -> Result<ConsensusResponse> {
        let now = self.clock.now();
        self.store
            .read(|state| {
                state
                    .consensus(id)
                    .map(|c| views::consensus_response(state, c, user, now))
            })
            .ok_or(ConclaveError::NotFound)
    }

    /// All consensuses, optionally filtered by finished state, ordered by
    /// end deadline descending.
    pub fn list(
        &self,
        page: Page,
        finished: Option<bool>,
        user: Option<&User>,
    ) -> Vec<ConsensusResponse> {
        self.select(page, user, |_, c| {
            finished.map_or(true, |wanted| c.finished == wanted)
        })
    }

    /// Case-insensitive title substring search.
    pub fn search(&self, query: &str, page: Page, user: Option<&User>) -> Vec<ConsensusResponse> {
        let needle = query.trim().to_lowercase();
        self.select(page, user, move |_, c| {
            c.title.to_lowercase().contains(&needle)
        })
    }

    /// Consensuses the user administers.
    pub fn list_admin(
        &self,
        user: &User,
        page: Page,
        finished: Option<bool>,
    ) -> Vec<ConsensusResponse> {
        let user_id = user.id;
        self.select(page, Some(user), move |state, c| {
            state.is_admin(c.id, user_id) && finished.map_or(true, |wanted| c.finished == wanted)
        })
    }

    /// Consensuses the user follows.
    pub fn list_following(
        &self,
        user: &User,
        page: Page,
        finished: Option<bool>,
    ) -> Vec<ConsensusResponse> {
        let user_id = user.id;
        self.select(page, Some(user), move |state, c| {
            state.is_following(c.id, user_id)
                && finished.map_or(true, |wanted| c.finished == wanted)
        })
    }

    /// Grant accessor standing iff the consensus is private and the
    /// supplied secret verifies. A wrong secret is a silent no-op: the
    /// caller observes unchanged access state in the response.
    pub fn request_access(
        &self,
        id: Uuid,
        request: &AccessRequest,
        user: &User,
    ) -> Result<ConsensusResponse> {
        let now = self.clock.now();
        let consensus = self.store.find_consensus(id).ok_or(ConclaveError::NotFound)?;
        // Argon2 verification is deliberately outside the unit of work; it
        // is slow by design.
        let grant = !consensus.is_public && auth::verify_secret(&request.secret, &consensus.secret_hash)?;

        self.store.write(|state| {
            if state.consensus(id).is_none() {
                return Err(ConclaveError::NotFound);
            }
            if grant {
                state.grant_access(id, user.id);
                info!(consensus = %id, user = %user.username, "accessor granted");
            }
            let consensus = state.consensus(id).ok_or(ConclaveError::NotFound)?;
            Ok(views::consensus_response(state, consensus, Some(user), now))
        })
    }

    /// Follow toggle: idempotent in both directions.
    pub fn follow(&self, id: Uuid, input: FollowInput, user: &User) -> Result<ConsensusResponse> {
        let now = self.clock.now();
        self.store.write(|state| {
            if state.consensus(id).is_none() {
                return Err(ConclaveError::NotFound);
            }
            if input.follow {
                state.follow(id, user.id);
            } else {
                state.unfollow(id, user.id);
            }
            let consensus = state.consensus(id).ok_or(ConclaveError::NotFound)?;
            Ok(views::consensus_response(state, consensus, Some(user), now))
        })
    }

    fn draft_from(&self, input: ConsensusInput) -> Result<ConsensusDraft> {
        let secret_hash = if input.is_public {
            String::new()
        } else {
            auth::hash_secret(&input.private_secret)?
        };
        Ok(ConsensusDraft::from_input(input, secret_hash))
    }

    /// Shared selection pipeline: filter, order by end deadline descending
    /// (ties broken by insertion order, newest first), paginate, build
    /// views.
    fn select(
        &self,
        page: Page,
        user: Option<&User>,
        filter: impl Fn(&StoreInner, &Consensus) -> bool,
    ) -> Vec<ConsensusResponse> {
        let now = self.clock.now();
        self.store.read(|state| {
            let mut selected: Vec<&Consensus> = state
                .consensuses
                .values()
                .filter(|c| filter(state, c))
                .collect();
            selected.sort_by(|a, b| b.end_date.cmp(&a.end_date).then(b.seq.cmp(&a.seq)));
            selected
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .map(|c| views::consensus_response(state, c, user, now))
                .collect()
        })
    }
}
