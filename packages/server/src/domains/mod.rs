pub mod extraction;
pub mod research;
pub mod seller;
