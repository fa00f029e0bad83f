//! Gateway — HTTP intake and query surface
//!
//! Validates and durably accepts client requests, forwards commands
//! to the matching engine, and serves reads from the store and the
//! published book snapshots. Exposed as a library so integration
//! tests can spawn the full router.

pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::create_router;
pub use state::AppState;
