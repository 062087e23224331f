//! Error handling utilities
//!
//! Use the `#[auth_error]` macro on error enums to get the standard derives, a `Generic`
//! variant and `From<anyhow::Error>`.

pub use authmigrator_macros::auth_error;

/// Re-export anyhow for convenience
pub use anyhow;
