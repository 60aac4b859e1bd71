//! Infrastructure shared by every job family: external-service traits and
//! clients, the persistence seam, task supervision, and pacing helpers.

pub mod batch;
pub mod openai_client;
pub mod product_api;
pub mod spawner;
pub mod store;
pub mod sweeper;
pub mod test_support;
pub mod traits;

pub use batch::{join_settled, Pacer};
pub use spawner::TaskSpawner;
pub use traits::{BaseAnalysis, BaseImageGen, BaseProductApi, ProductSummary};
