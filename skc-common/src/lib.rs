//! # Sketch Colorizer Common Library
//!
//! Shared code for the sketch colorizer service:
//! - Error type used across crates
//! - Configuration resolution (ENV → TOML → defaults)
//! - Event types and the broadcast `EventBus`
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
