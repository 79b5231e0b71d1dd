//! Taskboard Backend Library
//!
//! Authentication and session-validity core plus the HTTP surface on top of
//! it. Exposed as a library for the integration tests.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
