//! Q&A extraction jobs processed by external workers over a pull-based
//! claim/report protocol.

pub mod model;
pub mod queue;

pub use model::{
    build_items, final_status, ExtractionItem, ExtractionStatus, ItemStatus, QaExtractionJob,
};
pub use queue::{cancel, claim_next, report, ClaimedWork, ItemOutcome, QueueError};
