//! Application wiring.
//!
//! Construction follows the bootstrap order the engine requires: store,
//! clock, push gateway, transition engine, scheduler, then the services.
//! [`AppState::recover`] must run exactly once after the store is ready
//! and before the API layer accepts traffic.

use std::sync::Arc;

use crate::api::{ConsensusService, SuggestionService};
use crate::clock::{Clock, SystemClock};
use crate::lifecycle::{LifecycleScheduler, TransitionEngine};
use crate::push::{LogPush, PushGateway};
use crate::store::EntityStore;

/// Shared application state handed to the embedding routing layer.
pub struct AppState {
    pub store: Arc<EntityStore>,
    pub clock: Arc<dyn Clock>,
    pub engine: Arc<TransitionEngine>,
    pub scheduler: Arc<LifecycleScheduler>,
    pub consensus: ConsensusService,
    pub suggestions: SuggestionService,
}

impl AppState {
    /// Wire the engine with an explicit clock and push gateway (tests
    /// inject a manual clock and a recording gateway here).
    pub fn new(clock: Arc<dyn Clock>, push: Arc<dyn PushGateway>) -> Self {
        let store = Arc::new(EntityStore::new());
        let engine = Arc::new(TransitionEngine::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            push,
        ));
        let scheduler = Arc::new(LifecycleScheduler::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&engine),
        ));
        let consensus = ConsensusService::new(
            Arc::clone(&store),
            Arc::clone(&scheduler),
            Arc::clone(&clock),
        );
        let suggestions = SuggestionService::new(Arc::clone(&store), Arc::clone(&clock));

        Self {
            store,
            clock,
            engine,
            scheduler,
            consensus,
            suggestions,
        }
    }

    /// Production wiring: system clock, log-only push gateway.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(LogPush))
    }

    /// Rebuild in-flight lifecycle timers from stored deadlines. Call
    /// exactly once at bootstrap, before serving traffic.
    pub fn recover(&self) {
        self.scheduler.recover_all();
    }
}
