pub mod auth;
pub mod json;
pub mod response;

pub use auth::{extract_token, AuthUser, TOKEN_COOKIE};
pub use json::JsonBody;
pub use response::{ApiResponse, ApiResult};
