//! Taskboard Shared Library
//!
//! Types and validation used by the backend and by API clients.

pub mod errors;
pub mod types;
pub mod validation;

pub use errors::*;
pub use types::*;
