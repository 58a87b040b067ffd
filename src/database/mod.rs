pub mod manager;
pub mod query_builder;
pub mod models;

pub use manager::{DatabaseError, DatabaseManager};
pub use query_builder::QueryBuilder;
