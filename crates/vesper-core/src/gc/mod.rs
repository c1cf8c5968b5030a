//! Garbage collection system
//!
//! This module provides the tri-color mark-sweep collector for the Vesper
//! runtime.
//!
//! # Architecture
//!
//! - **Tag**: hidden header before each allocated payload (color, owning
//!   type, block size)
//! - **Heap**: tagged allocator; owns the type registry and byte accounting
//! - **Marker**: the `visit` entry point driving per-type gray worklists
//! - **Collector**: one explicit mark-to-fixpoint + sweep cycle
//!
//! # Memory layout
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Tag (16 bytes, 16-byte aligned)         │
//! │  - color: White | Gray | Black          │
//! │  - ty: owning TypeNode index            │
//! │  - size: block size, tag included       │
//! ├─────────────────────────────────────────┤  ← allocate() returns this
//! │ Payload (caller-specified size)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Collection is caller-invoked and never runs interleaved with mutator
//! progress: the mutator presents every live root through `visit`, then calls
//! `collect`, which drains the gray worklists to a global fixpoint and sweeps
//! each type's instance list, finalizing and freeing whatever stayed White.

mod collector;
mod heap;
mod tag;

pub use collector::{Collector, CycleStats, GcStats, HeapStats, Marker};
pub use heap::Heap;

pub(crate) use tag::Tag;
