//! Process-wide composition root
//!
//! A host that loads the runtime into several dynamic modules must still end
//! up with exactly one heap, one type registry, and one PLS namespace. This
//! module is that guarantee: one [`Runtime`] behind one process-wide mutex,
//! reference-counted by [`startup`]/[`shutdown`]. Embedders that own their
//! runtime directly never need it.
//!
//! The lock is non-reentrant. Calling back into any entry point here while
//! already inside [`with`] (for example from a visit callback) is detected
//! through a thread-local in-call flag and reported as
//! [`HeapError::LockFailed`] rather than deadlocking.

use crate::gc::CycleStats;
use crate::runtime::Runtime;
use crate::types::{FinalizeFn, TypeHandle, VisitFn};
use crate::{HeapError, HeapResult};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::cell::Cell;
use std::ptr::NonNull;

struct ProcessSlot {
    runtime: Option<Runtime>,
    refs: usize,
}

static PROCESS: Lazy<Mutex<ProcessSlot>> = Lazy::new(|| {
    Mutex::new(ProcessSlot {
        runtime: None,
        refs: 0,
    })
});

thread_local! {
    static IN_CALL: Cell<bool> = const { Cell::new(false) };
}

/// Clears the in-call flag when the entry point returns, panics included.
struct CallGuard;

impl CallGuard {
    fn enter() -> HeapResult<CallGuard> {
        IN_CALL.with(|flag| {
            if flag.get() {
                Err(HeapError::LockFailed)
            } else {
                flag.set(true);
                Ok(CallGuard)
            }
        })
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        IN_CALL.with(|flag| flag.set(false));
    }
}

/// Take a startup reference on the shared runtime, creating it on the 0→1
/// transition.
///
/// Safe to call from any number of threads and modules; every `startup` must
/// eventually be matched by a [`shutdown`].
pub fn startup() -> HeapResult<()> {
    let _guard = CallGuard::enter()?;
    let mut slot = PROCESS.lock();

    let refs = slot
        .refs
        .checked_add(1)
        .ok_or(HeapError::ReferenceCounterOverflow)?;
    if slot.runtime.is_none() {
        slot.runtime = Some(Runtime::new());
    }
    slot.refs = refs;
    Ok(())
}

/// Release a startup reference, tearing the shared runtime down on the 1→0
/// transition.
///
/// Teardown is refused with [`HeapError::TypeExists`] while any type still
/// holds usage references — a forgotten `unregister_type` or
/// `relinquish_type` surfaces here instead of leaking silently. On refusal
/// the reference count is left untouched.
pub fn shutdown() -> HeapResult<()> {
    let _guard = CallGuard::enter()?;
    let mut slot = PROCESS.lock();

    if slot.refs == 0 {
        return Err(HeapError::NotInitialized);
    }
    if slot.refs == 1 {
        let leaked = slot.runtime.as_ref().map_or(0, Runtime::live_types);
        if leaked > 0 {
            return Err(HeapError::TypeExists);
        }
        slot.runtime = None;
    }
    slot.refs -= 1;
    Ok(())
}

/// Run `f` against the shared runtime under the process lock.
pub fn with<R>(f: impl FnOnce(&mut Runtime) -> HeapResult<R>) -> HeapResult<R> {
    let _guard = CallGuard::enter()?;
    let mut slot = PROCESS.lock();
    let runtime = slot.runtime.as_mut().ok_or(HeapError::NotInitialized)?;
    f(runtime)
}

/// Register a heap type on the shared runtime.
pub fn register_type(
    name: &str,
    visit: Option<VisitFn>,
    visit_ctx: *mut u8,
    finalize: Option<FinalizeFn>,
    finalize_ctx: *mut u8,
) -> HeapResult<TypeHandle> {
    with(|rt| rt.register_type(name, visit, visit_ctx, finalize, finalize_ctx))
}

/// Release a type's registration reference on the shared runtime.
pub fn unregister_type(name: &str) -> HeapResult<()> {
    with(|rt| rt.unregister_type(name))
}

/// Look up a type on the shared runtime and take a usage reference.
pub fn acquire_type(name: &str) -> HeapResult<TypeHandle> {
    with(|rt| rt.acquire_type(name))
}

/// Release a usage reference on the shared runtime.
pub fn relinquish_type(handle: TypeHandle) -> HeapResult<()> {
    with(|rt| rt.relinquish_type(handle))
}

/// Allocate on the shared runtime's heap.
pub fn allocate(size: usize, handle: TypeHandle) -> HeapResult<NonNull<u8>> {
    with(|rt| rt.allocate(size, handle))
}

/// Report a root as reachable on the shared runtime.
pub fn visit(ptr: *mut u8) -> HeapResult<()> {
    with(|rt| {
        rt.visit(ptr);
        Ok(())
    })
}

/// Run one collection cycle on the shared runtime.
///
/// The process lock is held for the whole cycle, so no thread can allocate
/// or register concurrently with marking and sweep.
pub fn collect() -> HeapResult<CycleStats> {
    with(|rt| Ok(rt.collect()))
}

/// Create a process-local blob on the shared runtime.
pub fn pls_create(name: &str, size: usize) -> HeapResult<NonNull<u8>> {
    with(|rt| rt.pls_create(name, size))
}

/// Look up a process-local blob on the shared runtime.
pub fn pls_get(name: &str) -> HeapResult<NonNull<u8>> {
    with(|rt| rt.pls_get(name))
}

/// Check whether a process-local blob exists on the shared runtime.
pub fn pls_exists(name: &str) -> HeapResult<bool> {
    with(|rt| Ok(rt.pls_exists(name)))
}

/// Destroy a process-local blob on the shared runtime.
pub fn pls_destroy(name: &str) -> HeapResult<()> {
    with(|rt| rt.pls_destroy(name))
}
