pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod geo;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod server;
pub mod services;
pub mod state;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod testing;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use state::AppState;

/// Multipart framing allowance on top of the configured photo size.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

/// Builds the full HTTP application over the given state.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload.file_upload_path);

    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .nest_service("/uploads", uploads)
        .nest(
            "/api/v1",
            Router::new()
                .merge(bootcamp_routes(&state))
                .merge(course_routes())
                .merge(review_routes())
                .merge(auth_routes()),
        )
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bootcamp_routes(state: &AppState) -> Router<AppState> {
    use handlers::{bootcamps, courses, reviews};

    let photo_limit = state.config.upload.max_file_upload + UPLOAD_OVERHEAD;

    Router::new()
        .route("/bootcamps", get(bootcamps::list).post(bootcamps::create))
        .route("/bootcamps/radius/:zipcode/:distance", get(bootcamps::radius))
        .route(
            "/bootcamps/:id",
            get(bootcamps::get).put(bootcamps::update).delete(bootcamps::delete),
        )
        .route(
            "/bootcamps/:id/photo",
            put(bootcamps::photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        // Nested collections
        .route(
            "/bootcamps/:id/courses",
            get(courses::list_for_bootcamp).post(courses::create),
        )
        .route(
            "/bootcamps/:id/reviews",
            get(reviews::list_for_bootcamp).post(reviews::create),
        )
}

fn course_routes() -> Router<AppState> {
    use handlers::courses;

    Router::new()
        .route("/courses", get(courses::list))
        .route(
            "/courses/:id",
            get(courses::get).put(courses::update).delete(courses::delete),
        )
}

fn review_routes() -> Router<AppState> {
    use handlers::reviews;

    Router::new()
        .route("/reviews", get(reviews::list))
        .route(
            "/reviews/:id",
            get(reviews::get).put(reviews::update).delete(reviews::delete),
        )
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/updateuserdetails", put(auth::update_details))
        .route("/auth/updatepassword", put(auth::update_password))
        .route("/auth/forgotpassword", post(auth::forgot_password))
        .route("/auth/resetpassword/:resettoken", put(auth::reset_password))
}
