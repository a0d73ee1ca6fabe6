//! litweight-common — Shared error type and HTTP plumbing used across all litweight crates.

pub mod error;
pub mod sandbox;

pub use error::{LitweightError, Result};
