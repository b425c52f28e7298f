//! Compute backend running layer requests off the control loop.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::collection::CollectionError;
use crate::config::RetryPolicy;
use crate::control::SelectionState;
use crate::layers::{Layer, render};
use crate::pipeline::FloodPipeline;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compute(#[from] CollectionError),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Compute task failed: {0}")]
    Task(String),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Compute(e) => e.is_transient(),
            EngineError::Unavailable(_) => true,
            EngineError::Task(_) => false,
        }
    }
}

#[async_trait]
pub trait Engine: Send + Sync {
    /// Layer for `state`, `None` when the layer name has no product.
    async fn compute(&self, state: SelectionState) -> Result<Option<Layer>, EngineError>;
}

/// Runs the flood pipeline on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct LocalEngine {
    pipeline: Arc<FloodPipeline>,
}

impl LocalEngine {
    pub fn new(pipeline: FloodPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

#[async_trait]
impl Engine for LocalEngine {
    async fn compute(&self, state: SelectionState) -> Result<Option<Layer>, EngineError> {
        let pipeline = Arc::clone(&self.pipeline);

        tokio::task::spawn_blocking(move || render(&pipeline, &state))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?
            .map_err(EngineError::from)
    }
}

/// Calls `engine` until it succeeds, fails permanently or runs out of
/// attempts, sleeping with exponential backoff between transient failures.
pub async fn compute_with_retry(
    engine: &dyn Engine,
    state: &SelectionState,
    policy: RetryPolicy,
) -> Result<Option<Layer>, EngineError> {
    let mut attempt = 1;
    loop {
        match engine.compute(state.clone()).await {
            Ok(layer) => return Ok(layer),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    year = state.year,
                    layer = %state.layer,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient compute failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use crate::layers::{LayerContent, LayerKind};
    use crate::raster::{Grid, Mask};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Engine answering after a per-year delay, optionally failing first.
    #[derive(Default)]
    pub struct FakeEngine {
        pub delays: HashMap<i32, Duration>,
        pub transient_failures: AtomicUsize,
        pub permanent_failure: bool,
        pub calls: Mutex<Vec<SelectionState>>,
    }

    impl FakeEngine {
        pub fn calls(&self) -> Vec<SelectionState> {
            self.calls.lock().unwrap().clone()
        }
    }

    pub fn layer_for(state: &SelectionState) -> Option<Layer> {
        let kind = state.layer.parse::<LayerKind>().ok()?;
        let grid = Grid::new(1, 1, [0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
        let mask = Mask::new(grid, vec![Some(true)]).unwrap();
        Some(Layer::new(kind, state.year, LayerContent::Mask(mask)))
    }

    #[async_trait]
    impl Engine for FakeEngine {
        async fn compute(&self, state: SelectionState) -> Result<Option<Layer>, EngineError> {
            self.calls.lock().unwrap().push(state.clone());

            if let Some(delay) = self.delays.get(&state.year) {
                tokio::time::sleep(*delay).await;
            }

            if self.permanent_failure {
                return Err(EngineError::Task("engine crashed".to_string()));
            }

            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(EngineError::Unavailable("backend busy".to_string()));
            }

            Ok(layer_for(&state))
        }
    }
}
