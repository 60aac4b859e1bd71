pub mod extraction;
pub mod health;
pub mod research;
pub mod seller;
