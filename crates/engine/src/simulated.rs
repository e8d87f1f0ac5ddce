//! Simulated stage executor: randomized delay plus randomized failure.
//!
//! Stands in for the real image-processing work so the pipeline can be
//! exercised end to end without satellite data.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use satpipe_core::PipelineStage;

use crate::error::EngineError;
use crate::executor::{StageContext, StageExecutor, StageResult};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Simulated behavior for one specific stage.
#[derive(Debug, Clone, Copy)]
pub struct StageProfile {
    /// Minimum simulated work duration in milliseconds.
    pub min_delay_ms: u64,
    /// Maximum simulated work duration in milliseconds.
    pub max_delay_ms: u64,
    /// Failure probability in `0.0..=1.0`.
    pub failure_rate: f64,
}

/// Configuration for the simulated executor.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Default minimum delay for stages without a profile.
    pub default_min_delay_ms: u64,
    /// Default maximum delay for stages without a profile.
    pub default_max_delay_ms: u64,
    /// Default failure rate for stages without a profile.
    pub default_failure_rate: f64,
    /// Stage-specific overrides.
    pub profiles: HashMap<PipelineStage, StageProfile>,
}

impl SimulationConfig {
    /// Load the default profile from environment variables.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `SIM_MIN_DELAY_MS`     | `400`   |
    /// | `SIM_MAX_DELAY_MS`     | `1500`  |
    /// | `SIM_FAILURE_RATE`     | `0.05`  |
    pub fn from_env() -> Self {
        let default_min_delay_ms: u64 = std::env::var("SIM_MIN_DELAY_MS")
            .unwrap_or_else(|_| "400".into())
            .parse()
            .expect("SIM_MIN_DELAY_MS must be a valid u64");

        let default_max_delay_ms: u64 = std::env::var("SIM_MAX_DELAY_MS")
            .unwrap_or_else(|_| "1500".into())
            .parse()
            .expect("SIM_MAX_DELAY_MS must be a valid u64");

        let default_failure_rate: f64 = std::env::var("SIM_FAILURE_RATE")
            .unwrap_or_else(|_| "0.05".into())
            .parse()
            .expect("SIM_FAILURE_RATE must be a valid f64");

        Self {
            default_min_delay_ms,
            default_max_delay_ms,
            default_failure_rate,
            profiles: HashMap::new(),
        }
    }

    /// A profile that completes instantly and never fails. Useful for
    /// tests and demos.
    pub fn instant() -> Self {
        Self {
            default_min_delay_ms: 0,
            default_max_delay_ms: 0,
            default_failure_rate: 0.0,
            profiles: HashMap::new(),
        }
    }

    fn profile_for(&self, stage: PipelineStage) -> StageProfile {
        self.profiles.get(&stage).copied().unwrap_or(StageProfile {
            min_delay_ms: self.default_min_delay_ms,
            max_delay_ms: self.default_max_delay_ms,
            failure_rate: self.default_failure_rate,
        })
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_min_delay_ms: 400,
            default_max_delay_ms: 1500,
            default_failure_rate: 0.05,
            profiles: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SimulatedStageExecutor
// ---------------------------------------------------------------------------

/// Executor that sleeps a random duration and fails randomly.
pub struct SimulatedStageExecutor {
    config: SimulationConfig,
}

impl SimulatedStageExecutor {
    /// Create an executor with the given simulation configuration.
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StageExecutor for SimulatedStageExecutor {
    async fn execute(
        &self,
        context: &StageContext,
        cancel: &CancellationToken,
    ) -> Result<StageResult, EngineError> {
        let profile = self.config.profile_for(context.stage);

        // Tolerate a profile with min and max swapped.
        let min = profile.min_delay_ms.min(profile.max_delay_ms);
        let max = profile.min_delay_ms.max(profile.max_delay_ms);

        let (delay_ms, failed) = {
            let mut rng = rand::rng();
            let delay_ms = rng.random_range(min..=max);
            let failure_rate = profile.failure_rate.clamp(0.0, 1.0);
            (delay_ms, rng.random::<f64>() < failure_rate)
        };

        if delay_ms > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return Err(EngineError::Canceled),
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
            }
        }

        if failed {
            return Ok(StageResult::failure(format!(
                "Simulated failure at {}.",
                context.stage
            )));
        }

        Ok(StageResult::success(format!(
            "Simulated output produced for {}.",
            context.stage
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    fn context(stage: PipelineStage) -> StageContext {
        StageContext {
            job_id: Uuid::new_v4(),
            stage,
            satellite_name: "KOMPSAT-5".into(),
            raw_data_name: "scene.raw".into(),
            raw_data_size_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn zero_failure_rate_always_succeeds() {
        let executor = SimulatedStageExecutor::new(SimulationConfig::instant());
        let cancel = CancellationToken::new();

        for stage in PipelineStage::ORDER {
            let result = executor.execute(&context(stage), &cancel).await.unwrap();
            assert_matches!(result, StageResult::Success { .. });
        }
    }

    #[tokio::test]
    async fn certain_failure_rate_always_fails_with_stage_message() {
        let config = SimulationConfig {
            default_min_delay_ms: 0,
            default_max_delay_ms: 0,
            default_failure_rate: 1.0,
            profiles: HashMap::new(),
        };
        let executor = SimulatedStageExecutor::new(config);
        let cancel = CancellationToken::new();

        let result = executor
            .execute(&context(PipelineStage::Mosaic), &cancel)
            .await
            .unwrap();
        assert_eq!(result, StageResult::failure("Simulated failure at Mosaic."));
    }

    #[tokio::test]
    async fn per_stage_profile_overrides_default() {
        let mut profiles = HashMap::new();
        profiles.insert(
            PipelineStage::Blur,
            StageProfile {
                min_delay_ms: 0,
                max_delay_ms: 0,
                failure_rate: 1.0,
            },
        );
        let config = SimulationConfig {
            default_min_delay_ms: 0,
            default_max_delay_ms: 0,
            default_failure_rate: 0.0,
            profiles,
        };
        let executor = SimulatedStageExecutor::new(config);
        let cancel = CancellationToken::new();

        let blur = executor
            .execute(&context(PipelineStage::Blur), &cancel)
            .await
            .unwrap();
        assert_matches!(blur, StageResult::Failure { .. });

        let mosaic = executor
            .execute(&context(PipelineStage::Mosaic), &cancel)
            .await
            .unwrap();
        assert_matches!(mosaic, StageResult::Success { .. });
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_simulated_delay() {
        let config = SimulationConfig {
            default_min_delay_ms: 5_000,
            default_max_delay_ms: 5_000,
            default_failure_rate: 0.0,
            profiles: HashMap::new(),
        };
        let executor = SimulatedStageExecutor::new(config);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor
            .execute(&context(PipelineStage::DataIngestion), &cancel)
            .await;
        assert_matches!(result, Err(EngineError::Canceled));
    }
}
