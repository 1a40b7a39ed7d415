//! HTTP server for banter
//!
//! Exposes the session CRUD endpoints, the streaming chat relay and the
//! static front-end.

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{build_router, run_server};
pub use state::AppState;
