//! Shared library for the clinic reports backend
//!
//! Common functionality used by the server crate:
//! - Configuration loaded from the environment
//! - The application error type and its HTTP mapping
//! - PostgreSQL pool setup for the row store

pub mod config;
pub mod database;
pub mod error;

pub use error::{AppError, Result};
