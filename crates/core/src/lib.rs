//! Idsets Core - Core traits and configuration for identity-keyed collections.
//!
//! This crate provides the foundational pieces shared by every idsets crate:
//!
//! - `Identified`: A value carrying a stable identifier
//! - `CollectionConfig`: Per-collection ingest configuration (filter, transform, cloning)
//! - `Error`: Error types for collection operations
//!
//! # Example
//!
//! ```rust
//! use idsets_core::{CollectionConfig, Identified};
//! use std::rc::Rc;
//!
//! #[derive(Clone, Debug)]
//! struct Task {
//!     id: u32,
//!     done: bool,
//! }
//!
//! impl Identified for Task {
//!     type Id = u32;
//!
//!     fn id(&self) -> &u32 {
//!         &self.id
//!     }
//! }
//!
//! let config = CollectionConfig::new()
//!     .name("open tasks")
//!     .filter(|task: &Task| !task.done);
//!
//! assert!(config.ingest(Rc::new(Task { id: 1, done: false })).is_some());
//! assert!(config.ingest(Rc::new(Task { id: 2, done: true })).is_none());
//! ```

#![no_std]

extern crate alloc;

mod config;
mod error;
mod identified;

pub use config::{CollectionConfig, FilterFn, TransformFn};
pub use error::{Error, Result};
pub use identified::Identified;
