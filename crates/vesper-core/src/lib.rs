//! Vesper Runtime Core
//!
//! This crate provides the garbage-collected heap subsystem of the Vesper
//! runtime:
//! - Tri-color mark-sweep garbage collector
//! - Reference-counted type registry
//! - Process-local storage (one shared state block per subsystem per process)
//! - Process-wide composition root for multi-module hosts
//!
//! The collector is an explicitly owned context: construct a [`Runtime`]
//! (or just a [`Collector`]) and thread it through your subsystems. Hosts
//! that load the runtime into several dynamic modules use the
//! [`process`] module instead, which reference-counts one shared instance
//! behind one process-wide lock.
//!
//! Collection is explicit and cooperative: the mutator presents every live
//! root through `visit`, then invokes `collect`; anything not reached is
//! finalized and freed. There is no automatic root discovery and no
//! collection interleaved with mutator progress.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

pub mod gc;
pub mod pls;
pub mod process;
pub mod runtime;
pub mod types;

pub use gc::{Collector, CycleStats, GcStats, Heap, HeapStats, Marker};
pub use pls::PlsTable;
pub use runtime::Runtime;
pub use types::{FinalizeFn, TypeHandle, TypeTable, VisitFn};

/// Heap subsystem status codes.
///
/// Every fallible operation reports one of these; success is `Ok`. Statuses
/// are returned, never thrown, and no operation that reports an error leaves
/// a partial mutation behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
    /// An argument was null, empty, stale, or inconsistent.
    #[error("invalid argument")]
    ArgumentInvalid,

    /// Size arithmetic overflowed, a configured limit was hit, or the OS
    /// allocator returned null.
    #[error("allocation failed")]
    AllocationFailed,

    /// The type name is already present in the registry (also reported by a
    /// teardown that found leaked type usage).
    #[error("type already exists")]
    TypeExists,

    /// No live type with that name is registered.
    #[error("type does not exist")]
    TypeNotExists,

    /// The type still has usage references; its removal is deferred.
    #[error("type is still in use")]
    TypeUsed,

    /// The process lock could not be taken (re-entrant acquisition).
    #[error("lock acquisition failed")]
    LockFailed,

    /// A reference count would leave its representable range, in either
    /// direction.
    #[error("reference counter overflow")]
    ReferenceCounterOverflow,

    /// The shared runtime has not been started up.
    #[error("runtime not initialized")]
    NotInitialized,

    /// The process-local blob name is already present.
    #[error("process-local storage entry already exists")]
    PlsExists,

    /// No process-local blob with that name exists.
    #[error("process-local storage entry does not exist")]
    PlsNotExists,
}

/// Result alias for heap subsystem operations.
pub type HeapResult<T> = Result<T, HeapError>;
