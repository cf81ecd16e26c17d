//! # Admiral Library
//!
//! This library exposes the Admiral modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod clock;
pub mod probe;

// Re-export admiral_core for convenience
pub use admiral_core;
