// Translation evaluation pipeline
//
// Two evaluators share one result shape:
// - Remote: asks a hosted chat model for a verdict, falls back to local scoring
// - Local: deterministic word-overlap scoring, no I/O

pub mod common;
pub mod local;
pub mod remote;

use async_trait::async_trait;
use tracing::info;

pub use common::*;
pub use local::{LocalEvaluator, score_locally, similarity};
pub use remote::RemoteEvaluator;
use crate::config::EvaluatorConfig;
use crate::error::Result;

/// Main trait for evaluation operations. Implementations never fail: every error
/// path resolves to some usable result.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate a translation and report which path produced the result
    async fn evaluate_detailed(&self, request: &EvaluationRequest) -> (EvaluationResult, EvaluationSource);

    /// Evaluate a translation
    async fn evaluate(&self, request: &EvaluationRequest) -> EvaluationResult {
        self.evaluate_detailed(request).await.0
    }
}

/// Factory for creating evaluator instances
pub struct EvaluatorFactory;

impl EvaluatorFactory {
    /// Create an evaluator from configuration. Remote mode requires the credential
    /// to be present in the environment.
    pub fn create_evaluator(config: &EvaluatorConfig) -> Result<Box<dyn Evaluator>> {
        if config.offline {
            info!("Offline mode: translations are scored locally");
            return Ok(Box::new(LocalEvaluator));
        }

        let api_key = config.api_key()?;
        Ok(Box::new(RemoteEvaluator::new(config.clone(), api_key)?))
    }
}
