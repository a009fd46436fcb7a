//! Core functionality for poolfit
//!
//! This module contains the fundamental building blocks shared by the rest of
//! the crate:
//! - Alignment and size constants
//! - Alignment arithmetic helpers

pub mod types;

// Re-export commonly used items
pub use types::{align_down, align_up};
