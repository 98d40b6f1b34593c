//! Lifecycle push notifications.
//!
//! The transition engine hands the gateway a fan-out list of device tokens
//! plus the event type; delivery is fire-and-forget. A failed send is
//! logged by the dispatcher and never reaches the transition that
//! triggered it. Actual delivery transports (FCM and friends) live behind
//! this trait, outside the crate.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::model::Consensus;
use crate::types::Result;

/// Lifecycle event carried with every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushEvent {
    VotingStarted,
    Finished,
}

/// Consensus payload fields included in every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushConsensus {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

impl From<&Consensus> for PushConsensus {
    fn from(consensus: &Consensus) -> Self {
        Self {
            id: consensus.id,
            title: consensus.title.clone(),
            description: consensus.description.clone(),
        }
    }
}

/// Delivery boundary for lifecycle notifications.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send_to(
        &self,
        tokens: &[String],
        consensus: &PushConsensus,
        event: PushEvent,
    ) -> Result<()>;
}

/// Default gateway: logs the fan-out instead of delivering anything.
/// Deployments plug a real transport in its place.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPush;

#[async_trait]
impl PushGateway for LogPush {
    async fn send_to(
        &self,
        tokens: &[String],
        consensus: &PushConsensus,
        event: PushEvent,
    ) -> Result<()> {
        info!(
            consensus = %consensus.id,
            ?event,
            recipients = tokens.len(),
            "push notification (log-only gateway)"
        );
        Ok(())
    }
}

/// A notification captured by [`RecordingPush`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentPush {
    pub event: PushEvent,
    pub consensus: PushConsensus,
    pub tokens: Vec<String>,
}

/// Capturing gateway used by tests to assert on notification fan-out.
#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<SentPush>>,
}

impl RecordingPush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far, in dispatch order.
    pub fn sent(&self) -> Vec<SentPush> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PushGateway for RecordingPush {
    async fn send_to(
        &self,
        tokens: &[String],
        consensus: &PushConsensus,
        event: PushEvent,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentPush {
                event,
                consensus: consensus.clone(),
                tokens: tokens.to_vec(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_push_captures_in_order() {
        let gateway = RecordingPush::new();
        let consensus = PushConsensus {
            id: Uuid::new_v4(),
            title: "Team offsite".into(),
            description: String::new(),
        };

        gateway
            .send_to(&["t1".into()], &consensus, PushEvent::VotingStarted)
            .await
            .unwrap();
        gateway
            .send_to(&["t1".into(), "t2".into()], &consensus, PushEvent::Finished)
            .await
            .unwrap();

        let sent = gateway.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].event, PushEvent::VotingStarted);
        assert_eq!(sent[1].event, PushEvent::Finished);
        assert_eq!(sent[1].tokens.len(), 2);
    }
}
