//! API handlers.

pub mod file;

pub use file::*;
