//! Owned runtime context
//!
//! [`Runtime`] bundles the collector and the process-local-storage table into
//! one explicitly owned context. Nothing here touches global state: an
//! embedder constructs a `Runtime`, threads it through its subsystems, and
//! decides collection policy itself. The [`process`](crate::process)
//! composition root holds the one shared instance a multi-module host needs.

use crate::gc::{Collector, CycleStats, GcStats, HeapStats};
use crate::pls::PlsTable;
use crate::types::{FinalizeFn, TypeHandle, VisitFn};
use crate::HeapResult;
use std::ptr::NonNull;

/// The heap subsystem's context: collector, type registry, and PLS.
///
/// Dropping an owned runtime finalizes and frees whatever is still live;
/// only the process-level teardown insists on balanced type usage first.
pub struct Runtime {
    collector: Collector,
    pls: PlsTable,
}

impl Runtime {
    /// Create a fresh runtime with an empty heap, registry, and PLS table.
    pub fn new() -> Self {
        Self {
            collector: Collector::new(),
            pls: PlsTable::new(),
        }
    }

    /// Register a heap type. See [`crate::types::TypeTable::register`].
    pub fn register_type(
        &mut self,
        name: &str,
        visit: Option<VisitFn>,
        visit_ctx: *mut u8,
        finalize: Option<FinalizeFn>,
        finalize_ctx: *mut u8,
    ) -> HeapResult<TypeHandle> {
        self.collector
            .heap_mut()
            .types_mut()
            .register(name, visit, visit_ctx, finalize, finalize_ctx)
    }

    /// Release a type's registration reference. See
    /// [`crate::types::TypeTable::unregister`].
    pub fn unregister_type(&mut self, name: &str) -> HeapResult<()> {
        self.collector.heap_mut().types_mut().unregister(name)
    }

    /// Look up a type and take a usage reference on it.
    pub fn acquire_type(&mut self, name: &str) -> HeapResult<TypeHandle> {
        self.collector.heap_mut().types_mut().acquire(name)
    }

    /// Release a usage reference.
    pub fn relinquish_type(&mut self, handle: TypeHandle) -> HeapResult<()> {
        self.collector.heap_mut().types_mut().relinquish(handle)
    }

    /// Current usage count of a type, for leak diagnostics.
    pub fn type_usage(&self, name: &str) -> HeapResult<usize> {
        self.collector.heap().types().type_usage(name)
    }

    /// Number of types still holding usage references.
    pub fn live_types(&self) -> usize {
        self.collector.heap().types().live_types()
    }

    /// Allocate `size` payload bytes of `handle`'s type. See
    /// [`crate::gc::Heap::allocate`].
    pub fn allocate(&mut self, size: usize, handle: TypeHandle) -> HeapResult<NonNull<u8>> {
        self.collector.allocate(size, handle)
    }

    /// Report a root as reachable before [`Runtime::collect`].
    pub fn visit(&mut self, ptr: *mut u8) {
        self.collector.visit(ptr);
    }

    /// Run one collection cycle.
    pub fn collect(&mut self) -> CycleStats {
        self.collector.collect()
    }

    /// Set the maximum heap size in bytes (0 = unlimited).
    pub fn set_max_heap_size(&mut self, bytes: usize) {
        self.collector.heap_mut().set_max_heap_size(bytes);
    }

    /// Cumulative collector statistics.
    pub fn gc_stats(&self) -> &GcStats {
        self.collector.stats()
    }

    /// Current heap usage.
    pub fn heap_stats(&self) -> HeapStats {
        self.collector.heap_stats()
    }

    /// Create a process-local blob. See [`crate::pls::PlsTable::create`].
    pub fn pls_create(&mut self, name: &str, size: usize) -> HeapResult<NonNull<u8>> {
        self.pls.create(name, size)
    }

    /// Look up a process-local blob.
    pub fn pls_get(&self, name: &str) -> HeapResult<NonNull<u8>> {
        self.pls.get(name)
    }

    /// Check whether a process-local blob exists.
    pub fn pls_exists(&self, name: &str) -> bool {
        self.pls.exists(name)
    }

    /// Destroy a process-local blob.
    pub fn pls_destroy(&mut self, name: &str) -> HeapResult<()> {
        self.pls.destroy(name)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
