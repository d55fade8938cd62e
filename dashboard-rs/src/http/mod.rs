//! HTTP layer: axum router, page controllers and JSON view models.
//!
//! Every page except login and registration requires a valid session cookie; requests
//! without one are redirected to `/login`.

mod auth;
mod error;
mod handlers;
mod responses;
mod state;


pub use handlers::router;
pub use state::AppState;
