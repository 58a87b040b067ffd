pub mod types;
pub mod schema;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod filter_match;
pub mod error;

pub use types::*;
pub use error::FilterError;
pub use filter::{project, Filter};
pub use schema::{Collection, ResourceSchema, BOOTCAMPS, COURSES, REVIEWS};
