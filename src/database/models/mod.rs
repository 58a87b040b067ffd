pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::{Bootcamp, BootcampInput, BootcampRow, BootcampSummary, Career, Location, DEFAULT_PHOTO};
pub use course::{Course, CourseInput, CourseRow, MinimumSkill};
pub use review::{Review, ReviewInput};
pub use user::{User, UserRow};
