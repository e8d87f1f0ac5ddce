//! Pipeline engine: the orchestrator that walks a job through the fixed
//! stage order, the stage executor contract it drives, and the job
//! service producers use to create and cancel jobs.

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod service;
pub mod simulated;
pub mod worker;

pub use error::EngineError;
pub use executor::{StageContext, StageExecutor, StageResult};
pub use orchestrator::PipelineOrchestrator;
pub use service::{JobService, NewJob};
pub use simulated::{SimulatedStageExecutor, SimulationConfig, StageProfile};
pub use worker::JobWorker;
