//! tipboard/crates/tb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Tipboard.

pub mod models;
pub mod traits;
pub mod error;
pub mod voting;
pub mod reputation;
pub mod permissions;
pub mod service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;
pub use voting::{VoteDirection, VoteState};
pub use service::TipService;
