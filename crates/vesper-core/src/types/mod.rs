//! Runtime type information
//!
//! Heap types are registered by name and described by their visit and
//! finalize callbacks; the registry reference-counts each entry so a type
//! cannot disappear while instances of it are still live.

mod registry;

pub use registry::{FinalizeFn, TypeHandle, TypeTable, VisitFn};
