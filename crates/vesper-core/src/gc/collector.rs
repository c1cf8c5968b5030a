//! Tri-color mark-sweep collector
//!
//! Roots are presented explicitly: before [`Collector::collect`], the owner
//! of every root calls [`Collector::visit`] on each slot that might hold a
//! reachable reference. During the cycle, each type's visit callback receives
//! a [`Marker`] and reports the references its payloads hold the same way.

use super::heap::Heap;
use super::tag::{Color, Tag};
use crate::types::{TypeHandle, TypeTable};
use crate::HeapResult;
use std::ptr::NonNull;
use std::time::{Duration, Instant};

/// Dead and live object counts from one collection cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    /// Objects finalized and freed this cycle.
    pub dead: usize,

    /// Objects that survived this cycle.
    pub live: usize,
}

/// Cumulative collector statistics.
#[derive(Debug, Default, Clone)]
pub struct GcStats {
    /// Total number of collection cycles.
    pub collections: usize,

    /// Total objects freed across all cycles.
    pub objects_freed: usize,

    /// Total bytes freed across all cycles.
    pub bytes_freed: usize,

    /// Total pause time across all cycles.
    pub total_pause_time: Duration,

    /// Duration of the last cycle.
    pub last_pause_time: Duration,

    /// Longest cycle so far.
    pub max_pause_time: Duration,

    /// Objects scanned (drained from gray worklists) in the last cycle.
    pub last_scanned: usize,

    /// Objects freed in the last cycle.
    pub last_dead: usize,

    /// Objects surviving the last cycle.
    pub last_live: usize,
}

impl GcStats {
    fn update(&mut self, pause: Duration, scanned: usize, dead: usize, dead_bytes: usize, live: usize) {
        self.collections += 1;
        self.objects_freed += dead;
        self.bytes_freed += dead_bytes;
        self.total_pause_time += pause;
        self.last_pause_time = pause;
        if pause > self.max_pause_time {
            self.max_pause_time = pause;
        }
        self.last_scanned = scanned;
        self.last_dead = dead;
        self.last_live = live;
    }
}

/// Heap usage snapshot.
#[derive(Debug, Clone, Copy)]
pub struct HeapStats {
    /// Total bytes in live blocks, tags included.
    pub allocated_bytes: usize,

    /// Number of live blocks.
    pub allocation_count: usize,
}

/// Marking front-end handed to visit callbacks.
///
/// The only operation a callback may perform against the collector is
/// [`Marker::visit`]; everything else is sealed off for the duration of the
/// cycle.
pub struct Marker<'a> {
    types: &'a mut TypeTable,
}

impl<'a> Marker<'a> {
    pub(crate) fn new(types: &'a mut TypeTable) -> Self {
        Self { types }
    }

    /// Report `ptr` as reachable.
    ///
    /// Null-tolerant and idempotent: a null pointer or an already non-White
    /// object is a no-op, so shared sub-objects may be visited redundantly.
    /// A White object of a leaf type (no visit callback) is blackened on the
    /// spot; otherwise it turns Gray and joins its type's worklist.
    ///
    /// `ptr` must be null or a payload pointer obtained from the allocator.
    pub fn visit(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let tag = unsafe { Tag::from_payload(ptr) };
        unsafe {
            if (*tag).color() != Color::White {
                return;
            }
            let index = (*tag).type_index() as usize;
            let node = self.types.node_mut(index);
            if node.has_visit() {
                (*tag).set_color(Color::Gray);
                node.push_gray(tag);
            } else {
                (*tag).set_color(Color::Black);
            }
        }
    }

    /// Drain every type's gray worklist to a global fixpoint.
    ///
    /// A callback may push onto any type's worklist, including one already
    /// drained this pass, so the scan over all types repeats until one full
    /// pass pops nothing. Returns the number of objects scanned.
    fn drain(&mut self) -> usize {
        let mut scanned = 0;
        loop {
            let mut progressed = false;
            for index in 0..self.types.node_count() {
                while let Some(tag) = self.types.node_mut(index).pop_gray() {
                    progressed = true;
                    scanned += 1;
                    let (visit, visit_ctx) = {
                        let node = self.types.node(index);
                        (node.visit_fn(), node.visit_ctx())
                    };
                    unsafe {
                        (*tag).set_color(Color::Black);
                        if let Some(visit) = visit {
                            visit(self, Tag::payload(tag), visit_ctx);
                        }
                    }
                }
            }
            if !progressed {
                break;
            }
        }
        scanned
    }
}

/// Mark-sweep collector owning the heap and its type registry.
pub struct Collector {
    heap: Heap,
    stats: GcStats,
}

impl Collector {
    /// Create a collector with an empty heap.
    pub fn new() -> Self {
        Self {
            heap: Heap::new(),
            stats: GcStats::default(),
        }
    }

    /// The heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the heap.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Allocate an instance of `handle`'s type. See [`Heap::allocate`].
    pub fn allocate(&mut self, size: usize, handle: TypeHandle) -> HeapResult<NonNull<u8>> {
        self.heap.allocate(size, handle)
    }

    /// Report a root as reachable before a cycle. See [`Marker::visit`].
    pub fn visit(&mut self, ptr: *mut u8) {
        Marker::new(self.heap.types_mut()).visit(ptr);
    }

    /// Run one full collection cycle: drain the gray worklists to a global
    /// fixpoint, then sweep.
    ///
    /// Collecting with zero roots visited reclaims everything — the expected
    /// behavior for a correctly cooperating mutator. Exclusion against
    /// allocation and registration is expressed by `&mut self`; the
    /// process-level wrapper holds the process lock for the whole cycle.
    pub fn collect(&mut self) -> CycleStats {
        let start = Instant::now();

        let scanned = Marker::new(self.heap.types_mut()).drain();
        let outcome = self.heap.sweep();

        self.stats.update(
            start.elapsed(),
            scanned,
            outcome.dead,
            outcome.dead_bytes,
            outcome.live,
        );

        CycleStats {
            dead: outcome.dead,
            live: outcome.live,
        }
    }

    /// Cumulative collector statistics.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Current heap usage.
    pub fn heap_stats(&self) -> HeapStats {
        HeapStats {
            allocated_bytes: self.heap.allocated_bytes(),
            allocation_count: self.heap.allocation_count(),
        }
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: Collector is only accessed through an exclusive reference or behind
// the process mutex, which serializes all access to the internal heap and its
// raw block pointers.
unsafe impl Send for Collector {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_collect_empty_heap() {
        let mut gc = Collector::new();
        let cycle = gc.collect();

        assert_eq!(cycle, CycleStats { dead: 0, live: 0 });
        assert_eq!(gc.stats().collections, 1);
    }

    #[test]
    fn test_unvisited_leaves_are_reclaimed() {
        let mut gc = Collector::new();
        let leaf = gc
            .heap_mut()
            .types_mut()
            .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();

        for _ in 0..3 {
            gc.allocate(16, leaf).unwrap();
        }

        let cycle = gc.collect();
        assert_eq!(cycle.dead, 3);
        assert_eq!(cycle.live, 0);
        assert_eq!(gc.heap_stats().allocation_count, 0);
    }

    #[test]
    fn test_visited_leaf_survives_one_cycle() {
        let mut gc = Collector::new();
        let leaf = gc
            .heap_mut()
            .types_mut()
            .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();

        let obj = gc.allocate(16, leaf).unwrap();

        gc.visit(obj.as_ptr());
        let first = gc.collect();
        assert_eq!(first, CycleStats { dead: 0, live: 1 });

        // Survivors come out White again; without a fresh visit the next
        // cycle reclaims them.
        let second = gc.collect();
        assert_eq!(second, CycleStats { dead: 1, live: 0 });
    }

    #[test]
    fn test_visit_is_idempotent() {
        let mut gc = Collector::new();
        let leaf = gc
            .heap_mut()
            .types_mut()
            .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();

        let obj = gc.allocate(16, leaf).unwrap();
        gc.visit(obj.as_ptr());
        gc.visit(obj.as_ptr());
        gc.visit(ptr::null_mut());

        let cycle = gc.collect();
        assert_eq!(cycle, CycleStats { dead: 0, live: 1 });
    }

    #[test]
    fn test_stats_accumulate() {
        let mut gc = Collector::new();
        let leaf = gc
            .heap_mut()
            .types_mut()
            .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();

        gc.allocate(16, leaf).unwrap();
        gc.collect();
        gc.allocate(16, leaf).unwrap();
        gc.collect();

        let stats = gc.stats();
        assert_eq!(stats.collections, 2);
        assert_eq!(stats.objects_freed, 2);
        assert!(stats.bytes_freed > 0);
    }
}
