pub mod access;
pub mod advanced_results;
pub mod aggregate;
pub mod auth;
pub mod bootcamps;
pub mod cascade;
pub mod courses;
pub mod reviews;

pub use advanced_results::{AdvancedResults, Listing, PageLink, Pagination};
pub use auth::AuthService;
pub use bootcamps::{BootcampService, PhotoUpload};
pub use courses::CourseService;
pub use reviews::ReviewService;
