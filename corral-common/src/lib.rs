//! # Corral Common Library
//!
//! Shared code for the Corral CRM backend:
//! - Database schema, models and initialization
//! - Phone number canonicalization
//! - Configuration loading and root folder resolution
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod phone;
pub mod time;

pub use error::{Error, Result};
