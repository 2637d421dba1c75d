//! Web server module
//!
//! JSON API exposing the chat, photo analysis and tip features.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
