//! # MSE Common Library
//!
//! Shared code for the multi-sport event scoring services:
//! - Common error type
//! - Configuration loading and root folder resolution
//! - Database bootstrap (schema creation)
//! - Fixed-width race time formatting
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod race_time;
pub mod time;

pub use error::{Error, Result};
pub use race_time::RaceTime;
