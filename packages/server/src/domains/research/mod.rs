//! Market-intelligence analysis jobs: keyword search, a human selection
//! gate, paced review/Q&A collection, then four persisted LLM phases.

pub mod model;
pub mod runner;
pub mod state;

pub use model::{AnalysisPhase, JobProgress, ResearchJob, ResearchStatus, ANALYSIS_PHASES};
pub use runner::ResearchRunner;
pub use state::{can_select, resolve_selection, ResumePlan, StateError};
