//! Core graph model for the gcvet oracle.
//!
//! This crate contains the pure, I/O-free pieces of the harness:
//! - `ObjectId` / `Handle` - identities and script-local names
//! - `TrackedObject` - one graph node with bounds-checked slots
//! - `GraphModel` - the handle table + object registry
//! - `mark_reachable` - exact mark-and-sweep reachability

pub mod graph;
pub mod object;
pub mod oracle;

pub use graph::{GraphModel, IdAlloc, ModelError};
pub use object::{Handle, ObjectId, TrackedObject};
pub use oracle::{ReachableSet, mark_reachable};
