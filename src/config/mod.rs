//! # Configuration Module
//!
//! This module provides the configuration structure for try-on sessions.

pub mod config;

pub use config::TryOnConfig;
