//! Shared types for the SPDM rewards economy.
//!
//! Everything here is plain serde data so the same config can be read by the
//! core library, the CLI, and any future frontend.

pub mod economy;
pub mod formatting;

pub use economy::*;
