//! Core types for the task-graph planner.
//!
//! This crate holds the data structures and seam traits shared by the
//! planning crates: the workflow graph handed to executors, the LLM client
//! boundary, and the capability matcher boundary.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
