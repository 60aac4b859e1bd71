pub mod worker_auth;

pub use worker_auth::{bearer_matches, worker_auth_middleware};
