// Product Research Aggregator - API Core
//
// This crate provides the backend for product-data enrichment: three
// background job families (market-intelligence analysis, seller catalog
// pull, and a pull-based Q&A extraction queue) driven to completion by
// detached runners coordinated through the job record store.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
