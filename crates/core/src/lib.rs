//! `patchlog-core`: entity identity and JSON merge-patch primitives.
//!
//! This crate is **pure**: no storage, no clocks, no IO.

pub mod error;
pub mod id;
pub mod json;
pub mod merge_patch;

pub use error::{IdError, PatchError, PatchResult};
pub use id::{EntityId, ModelName};
pub use json::JsonInput;
