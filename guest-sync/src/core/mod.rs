//! Core module - runtime configuration
//!
//! - [`Config`] - sync core configuration loaded from the environment

pub mod config;

pub use config::Config;
