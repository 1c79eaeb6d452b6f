//! wadispatch Common - Shared types and utilities
//!
//! This crate provides configuration, the error type, identifiers and
//! status enums shared by all wadispatch components.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
