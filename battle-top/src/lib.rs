//! Battle Top - ranked-list community server
//!
//! Users publish ranked lists, like and comment on them, follow authors and
//! spend battle coins in the shop, on VIP plans and in debates.
//!
//! ## Layout
//!
//! - `routes` - axum handlers, one module per product area
//! - `db` - SQLite persistence; multi-row writes run in a transaction
//! - `auth` - Argon2 password hashing, JWT sessions, request extractors
//! - `events` - broadcast bus for domain events
//!
//! The rules themselves (levels, credibility, debate payouts, catalogs) live
//! in the `battle-core` crate.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::Config;
pub use db::Database;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
