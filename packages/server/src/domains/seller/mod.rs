//! Seller catalog pull and staged import jobs, with a watchdog for stalled
//! background phases.

pub mod model;
pub mod runner;

pub use model::{sweep_timed_out, ImportResult, SellerImportJob, SellerStatus};
pub use runner::SellerRunner;
