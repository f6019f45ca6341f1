//! Deterministic scoring capabilities shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use memco_sdk::{
    CapabilityError, CapabilityScore, Classification, CoordinatorConfig, MemoryCoordinator, ScoringCapability,
    ScoringRequest,
};

/// Always answers with the same score.
pub struct Fixed {
    id: String,
    score: u8,
}

#[async_trait]
impl ScoringCapability for Fixed {
    fn id(&self) -> &str {
        &self.id
    }

    async fn score(&self, _request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError> {
        Ok(CapabilityScore::new(self.score, "fixed"))
    }
}

/// Importance 8; relevance read from a `rel:N` marker in the content.
pub struct Keyed {
    id: String,
}

#[async_trait]
impl ScoringCapability for Keyed {
    fn id(&self) -> &str {
        &self.id
    }

    async fn score(&self, request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError> {
        match request.classification {
            Classification::Importance { .. } => Ok(CapabilityScore::new(8, "keyed")),
            Classification::Relevance { .. } => request
                .content
                .split("rel:")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|n| n.parse().ok())
                .map(|score| CapabilityScore::new(score, "marker"))
                .ok_or_else(|| CapabilityError::failed("no rel marker")),
        }
    }
}

/// Always fails.
pub struct Failing {
    id: String,
}

#[async_trait]
impl ScoringCapability for Failing {
    fn id(&self) -> &str {
        &self.id
    }

    async fn score(&self, _request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError> {
        Err(CapabilityError::unavailable("offline"))
    }
}

/// Answers after a delay.
pub struct Slow {
    id: String,
    score: u8,
    delay: Duration,
}

#[async_trait]
impl ScoringCapability for Slow {
    fn id(&self) -> &str {
        &self.id
    }

    async fn score(&self, _request: &ScoringRequest) -> Result<CapabilityScore, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(CapabilityScore::new(self.score, "slow"))
    }
}

pub fn fixed(id: &str, score: u8) -> Arc<dyn ScoringCapability> {
    Arc::new(Fixed { id: id.into(), score })
}

pub fn keyed(id: &str) -> Arc<dyn ScoringCapability> {
    Arc::new(Keyed { id: id.into() })
}

pub fn failing(id: &str) -> Arc<dyn ScoringCapability> {
    Arc::new(Failing { id: id.into() })
}

pub fn slow(id: &str, score: u8, delay: Duration) -> Arc<dyn ScoringCapability> {
    Arc::new(Slow {
        id: id.into(),
        score,
        delay,
    })
}

/// One fixed-score capability per score.
pub fn panel(scores: &[u8]) -> Vec<Arc<dyn ScoringCapability>> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| fixed(&format!("reviewer-{i}"), *score))
        .collect()
}

pub fn coordinator(capabilities: Vec<Arc<dyn ScoringCapability>>) -> MemoryCoordinator {
    coordinator_with(capabilities, CoordinatorConfig::default())
}

pub fn coordinator_with(capabilities: Vec<Arc<dyn ScoringCapability>>, config: CoordinatorConfig) -> MemoryCoordinator {
    MemoryCoordinator::in_memory(capabilities, config).expect("in-memory coordinator")
}
