//! # FRA Common Library
//!
//! Shared code for the FRA claim digitization services including:
//! - Database schema, models, and shared claim queries
//! - Event types (FraEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
