//! Utility functions and helpers.
//!
//! Common functionality used across multiple spn crates.

pub mod hash;
pub mod text;

// Re-export commonly used utilities
pub use hash::BuildId;
pub use text::fit_width;
