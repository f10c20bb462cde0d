//! # warden-core
//!
//! Core types, traits, configuration, and error handling for the Warden moderator.

pub mod config;
pub mod error;
pub mod message;
pub mod traits;
pub mod warning;

pub use config::shellexpand;
