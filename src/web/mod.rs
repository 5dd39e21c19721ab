//! Web API module for updown.
//!
//! Exposes the filesystem and database backends as two route groups with the
//! same shape, plus a health check.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::{ApiError, ErrorKind};
pub use router::{create_health_router, create_router, IN_DATABASE_PREFIX, IN_SYSTEM_PREFIX};
pub use server::WebServer;
