//! Configuration module for domain probing
//!
//! This module provides the `ProbeConfig` struct and its builder
//! for configuring probe runs with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::ProbeConfigBuilder;
pub use types::ProbeConfig;
