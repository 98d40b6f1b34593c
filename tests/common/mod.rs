//! Shared fixtures for the integration suites.
//!
//! Every suite runs on paused tokio time plus a manually advanced clock,
//! so deadline-driven behavior is exercised without wall-clock waits.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use conclave::clock::{Clock, ManualClock};
use conclave::model::{ConsensusInput, User};
use conclave::push::RecordingPush;
use conclave::AppState;

pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub push: Arc<RecordingPush>,
}

/// Fixed starting instant for every scenario.
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn test_app() -> TestApp {
    let clock = Arc::new(ManualClock::starting_at(start_instant()));
    let push = Arc::new(RecordingPush::new());
    let state = AppState::new(clock.clone(), push.clone());
    TestApp { state, clock, push }
}

impl TestApp {
    /// Register a user carrying a predictable push token.
    pub fn user(&self, name: &str) -> User {
        self.state
            .store
            .create_user(name, Some(format!("token-{name}")))
            .expect("unique test username")
    }

    /// Consensus body with deadlines relative to the current clock.
    pub fn consensus_input(&self, title: &str, voting_start_secs: i64, end_secs: i64) -> ConsensusInput {
        let now = self.clock.now();
        ConsensusInput {
            title: title.to_string(),
            description: Some(format!("{title} description")),
            is_public: true,
            end_date: now + Duration::seconds(end_secs),
            voting_start_date: now + Duration::seconds(voting_start_secs),
            private_secret: String::new(),
        }
    }

    /// Same, but private with the given access secret.
    pub fn private_input(
        &self,
        title: &str,
        voting_start_secs: i64,
        end_secs: i64,
        secret: &str,
    ) -> ConsensusInput {
        let mut input = self.consensus_input(title, voting_start_secs, end_secs);
        input.is_public = false;
        input.private_secret = secret.to_string();
        input
    }

    /// Advance both clocks so every timer due within `secs` fires, then
    /// let fire-and-forget push tasks drain.
    pub async fn run_timers(&self, secs: i64) {
        self.clock.advance(Duration::seconds(secs));
        tokio::time::sleep(std::time::Duration::from_secs(secs.unsigned_abs())).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }
}
