//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for provider API keys and the
//! database URL.

pub use secrecy::{ExposeSecret, SecretString};
