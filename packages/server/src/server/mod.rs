pub mod app;
pub mod errors;
pub mod middleware;
pub mod routes;

pub use app::{build_app, AppState};
pub use errors::ApiError;
