//! Deadline timer registry.
//!
//! Owns exactly two timer slots per consensus — voting-start and finish —
//! keyed by (consensus id, kind). Registration always cancels the previous
//! slot holder first, so repeated edits can never leave two live timers
//! for the same deadline; the registry itself is the serialization point
//! for that invariant. Handles are transient and non-authoritative:
//! `recover_all` rebuilds every timer from the stored deadlines after a
//! restart.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::lifecycle::engine::{TransitionEngine, VotingStartOutcome};
use crate::model::Consensus;
use crate::store::EntityStore;

/// The two timer slots a consensus can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    VotingStart,
    Finish,
}

type TimerKey = (Uuid, TimerKind);

pub struct LifecycleScheduler {
    clock: Arc<dyn Clock>,
    engine: Arc<TransitionEngine>,
    store: Arc<EntityStore>,
    timers: Arc<DashMap<TimerKey, JoinHandle<()>>>,
}

impl LifecycleScheduler {
    pub fn new(
        store: Arc<EntityStore>,
        clock: Arc<dyn Clock>,
        engine: Arc<TransitionEngine>,
    ) -> Self {
        Self {
            clock,
            engine,
            store,
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Install (or replace) the finish timer for a consensus. An end
    /// deadline already in the past fires immediately.
    pub fn register_finish(&self, consensus: &Consensus) {
        let id = consensus.id;
        let delay = self.delay_until(consensus.end_date);
        debug!(consensus = %id, ?delay, "registering finish timer");

        self.cancel((id, TimerKind::Finish));

        let engine = Arc::clone(&self.engine);
        let timers = Arc::clone(&self.timers);
        // The task waits for its registry slot to be filled before the
        // delay starts, so a zero-delay timer cannot fire ahead of its own
        // registration and leave a stale handle behind.
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = registered_rx.await;
            tokio::time::sleep(delay).await;
            engine.on_finish_reached(id);
            // Final cleanup for this id: both slots, idempotent.
            timers.remove(&(id, TimerKind::Finish));
            if let Some((_, stale)) = timers.remove(&(id, TimerKind::VotingStart)) {
                stale.abort();
            }
        });
        self.timers.insert((id, TimerKind::Finish), handle);
        let _ = registered_tx.send(());
    }

    /// Install (or replace) the voting-start timer. A voting-start
    /// deadline already reached installs nothing — the consensus is
    /// votable — but still cancels whatever an earlier deadline left
    /// pending.
    pub fn register_voting_start(&self, consensus: &Consensus) {
        let id = consensus.id;
        if consensus.voting_start_date <= self.clock.now() {
            debug!(consensus = %id, "voting start already reached; no timer registered");
            self.cancel((id, TimerKind::VotingStart));
            return;
        }
        let delay = self.delay_until(consensus.voting_start_date);
        debug!(consensus = %id, ?delay, "registering voting-start timer");

        self.cancel((id, TimerKind::VotingStart));

        let engine = Arc::clone(&self.engine);
        let timers = Arc::clone(&self.timers);
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = registered_rx.await;
            tokio::time::sleep(delay).await;
            let outcome = engine.on_voting_start_reached(id);
            timers.remove(&(id, TimerKind::VotingStart));
            if outcome == VotingStartOutcome::ShortCircuited {
                // The consensus finished early; its finish timer is stale.
                if let Some((_, stale)) = timers.remove(&(id, TimerKind::Finish)) {
                    stale.abort();
                }
            }
        });
        self.timers.insert((id, TimerKind::VotingStart), handle);
        let _ = registered_tx.send(());
    }

    /// Cancel the finish timer if one is pending; a safe no-op otherwise.
    pub fn unregister_finish(&self, id: Uuid) {
        debug!(consensus = %id, "unregistering finish timer");
        self.cancel((id, TimerKind::Finish));
    }

    /// Cancel the voting-start timer if one is pending; a safe no-op
    /// otherwise.
    pub fn unregister_voting_start(&self, id: Uuid) {
        debug!(consensus = %id, "unregistering voting-start timer");
        self.cancel((id, TimerKind::VotingStart));
    }

    /// Rebuild timers for every unfinished consensus from its stored
    /// deadlines. Invoked once at process start, after the store is ready
    /// and before the API accepts traffic; repairs whatever a crash or
    /// restart dropped.
    pub fn recover_all(&self) {
        let unfinished = self.store.unfinished_consensuses();
        info!(count = unfinished.len(), "recovering lifecycle timers");
        for consensus in &unfinished {
            self.register_finish(consensus);
            self.register_voting_start(consensus);
        }
    }

    /// Abort and drop every pending timer (process teardown).
    pub fn shutdown(&self) {
        let drained = self.timers.len();
        self.timers.retain(|_, handle| {
            handle.abort();
            false
        });
        info!(drained, "lifecycle scheduler shut down");
    }

    /// Number of pending timers across all consensuses.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Whether a timer of the given kind is pending for the consensus.
    pub fn has_timer(&self, id: Uuid, kind: TimerKind) -> bool {
        self.timers.contains_key(&(id, kind))
    }

    fn cancel(&self, key: TimerKey) {
        if let Some((_, handle)) = self.timers.remove(&key) {
            handle.abort();
        }
    }

    fn delay_until(&self, deadline: DateTime<Utc>) -> std::time::Duration {
        (deadline - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}
