//! Type registry for heap types
//!
//! Every heap type is registered by name before its first allocation. A
//! registered type owns the list of its live instances and the gray worklist
//! the collector drains during marking.

use crate::gc::{Marker, Tag};
use crate::{HeapError, HeapResult};
use rustc_hash::FxHashMap;

/// Visit callback invoked during marking.
///
/// Receives the marker, the payload of the object being scanned, and the
/// context pointer supplied at registration. The callback must call
/// [`Marker::visit`] on every reference the payload directly holds.
pub type VisitFn = fn(&mut Marker<'_>, *mut u8, *mut u8);

/// Finalize callback invoked during sweep, just before the block is freed.
///
/// Receives the payload and the context pointer supplied at registration.
/// Finalizers must not allocate or visit; the cycle is already committed.
pub type FinalizeFn = fn(*mut u8, *mut u8);

/// Opaque handle to a registered type.
///
/// Obtained from [`TypeTable::register`] or [`TypeTable::acquire`]; passed to
/// the allocator and to [`TypeTable::relinquish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(u32);

impl TypeHandle {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registry entry describing one heap type.
///
/// The `usage` counter conflates "registered" and "has live instances":
/// registration contributes one reference and every live allocation
/// contributes another, which is exactly why a type with outstanding
/// instances cannot be fully unregistered.
pub(crate) struct TypeNode {
    name: Box<str>,
    usage: usize,
    visit: Option<VisitFn>,
    visit_ctx: *mut u8,
    finalize: Option<FinalizeFn>,
    finalize_ctx: *mut u8,
    /// Every live, unswept tag of this type.
    all: Vec<*mut Tag>,
    /// Tags awaiting the scan step of the current cycle.
    gray: Vec<*mut Tag>,
}

impl TypeNode {
    #[inline]
    pub(crate) fn usage(&self) -> usize {
        self.usage
    }

    #[inline]
    pub(crate) fn has_visit(&self) -> bool {
        self.visit.is_some()
    }

    #[inline]
    pub(crate) fn visit_fn(&self) -> Option<VisitFn> {
        self.visit
    }

    #[inline]
    pub(crate) fn visit_ctx(&self) -> *mut u8 {
        self.visit_ctx
    }

    #[inline]
    pub(crate) fn finalize_fn(&self) -> Option<FinalizeFn> {
        self.finalize
    }

    #[inline]
    pub(crate) fn finalize_ctx(&self) -> *mut u8 {
        self.finalize_ctx
    }

    #[inline]
    pub(crate) fn push_all(&mut self, tag: *mut Tag) {
        self.all.push(tag);
    }

    #[inline]
    pub(crate) fn take_all(&mut self) -> Vec<*mut Tag> {
        std::mem::take(&mut self.all)
    }

    #[inline]
    pub(crate) fn set_all(&mut self, all: Vec<*mut Tag>) {
        self.all = all;
    }

    #[inline]
    pub(crate) fn push_gray(&mut self, tag: *mut Tag) {
        self.gray.push(tag);
    }

    #[inline]
    pub(crate) fn pop_gray(&mut self) -> Option<*mut Tag> {
        self.gray.pop()
    }
}

/// Name-indexed registry of heap types.
///
/// Node storage is an arena: a node whose `usage` reached zero is logically
/// absent (lookups report [`HeapError::TypeNotExists`]) but its slot and name
/// entry persist until full teardown, so re-registering the name reports
/// [`HeapError::TypeExists`]. Teardown itself is refused while any node still
/// has nonzero usage, turning a forgotten unregister or relinquish into a
/// hard failure instead of a silent leak.
pub struct TypeTable {
    nodes: Vec<TypeNode>,
    by_name: FxHashMap<Box<str>, u32>,
    /// Number of nodes with usage > 0.
    live: usize,
}

impl TypeTable {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            by_name: FxHashMap::default(),
            live: 0,
        }
    }

    /// Register a new type under `name` with usage 1.
    ///
    /// A type whose instances hold references must supply `visit`; a leaf
    /// type passes `None` and its instances are blackened without scanning.
    /// A context pointer without its callback is rejected as
    /// [`HeapError::ArgumentInvalid`], as is an empty name.
    pub fn register(
        &mut self,
        name: &str,
        visit: Option<VisitFn>,
        visit_ctx: *mut u8,
        finalize: Option<FinalizeFn>,
        finalize_ctx: *mut u8,
    ) -> HeapResult<TypeHandle> {
        if name.is_empty() {
            return Err(HeapError::ArgumentInvalid);
        }
        if visit.is_none() && !visit_ctx.is_null() {
            return Err(HeapError::ArgumentInvalid);
        }
        if finalize.is_none() && !finalize_ctx.is_null() {
            return Err(HeapError::ArgumentInvalid);
        }
        if self.by_name.contains_key(name) {
            return Err(HeapError::TypeExists);
        }
        if self.nodes.len() >= u32::MAX as usize {
            return Err(HeapError::AllocationFailed);
        }

        let index = self.nodes.len() as u32;
        self.nodes.push(TypeNode {
            name: name.into(),
            usage: 1,
            visit,
            visit_ctx,
            finalize,
            finalize_ctx,
            all: Vec::new(),
            gray: Vec::new(),
        });
        self.by_name.insert(name.into(), index);
        self.live += 1;
        Ok(TypeHandle(index))
    }

    /// Look up a live type and take an extra usage reference on it.
    pub fn acquire(&mut self, name: &str) -> HeapResult<TypeHandle> {
        let index = self.lookup_live(name)?;
        self.bump_usage(index as usize)?;
        Ok(TypeHandle(index))
    }

    /// Release a usage reference taken by [`TypeTable::acquire`] or
    /// [`TypeTable::register`].
    pub fn relinquish(&mut self, handle: TypeHandle) -> HeapResult<()> {
        if handle.index() >= self.nodes.len() {
            return Err(HeapError::ArgumentInvalid);
        }
        self.drop_usage(handle.index())?;
        Ok(())
    }

    /// Release the registration reference of `name`.
    ///
    /// The reference is released either way; [`HeapError::TypeUsed`] reports
    /// that instances (or outstanding acquisitions) still hold the node
    /// alive, deferring its removal.
    pub fn unregister(&mut self, name: &str) -> HeapResult<()> {
        let index = self.lookup_live(name)? as usize;
        let remaining = self.drop_usage(index)?;
        if remaining > 0 {
            return Err(HeapError::TypeUsed);
        }
        Ok(())
    }

    /// Current usage count of a live type, for leak diagnostics.
    pub fn type_usage(&self, name: &str) -> HeapResult<usize> {
        let index = self.lookup_live(name)?;
        Ok(self.nodes[index as usize].usage)
    }

    /// Number of types still holding usage references.
    ///
    /// Teardown is only legal when this reaches zero.
    pub fn live_types(&self) -> usize {
        self.live
    }

    /// Total number of registry slots, logically-released ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the registry has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of a live node, or `TypeNotExists`.
    fn lookup_live(&self, name: &str) -> HeapResult<u32> {
        let index = *self.by_name.get(name).ok_or(HeapError::TypeNotExists)?;
        if self.nodes[index as usize].usage == 0 {
            return Err(HeapError::TypeNotExists);
        }
        Ok(index)
    }

    /// Resolve a handle to a live node index for allocation.
    pub(crate) fn live_index(&self, handle: TypeHandle) -> HeapResult<usize> {
        let index = handle.index();
        if index >= self.nodes.len() || self.nodes[index].usage == 0 {
            return Err(HeapError::ArgumentInvalid);
        }
        Ok(index)
    }

    #[inline]
    pub(crate) fn node(&self, index: usize) -> &TypeNode {
        &self.nodes[index]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, index: usize) -> &mut TypeNode {
        &mut self.nodes[index]
    }

    #[inline]
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a usage reference to a node already known to be live.
    pub(crate) fn bump_usage(&mut self, index: usize) -> HeapResult<()> {
        let node = &mut self.nodes[index];
        node.usage = node
            .usage
            .checked_add(1)
            .ok_or(HeapError::ReferenceCounterOverflow)?;
        Ok(())
    }

    /// Remove a usage reference, returning the remaining count.
    pub(crate) fn drop_usage(&mut self, index: usize) -> HeapResult<usize> {
        let node = &mut self.nodes[index];
        node.usage = node
            .usage
            .checked_sub(1)
            .ok_or(HeapError::ReferenceCounterOverflow)?;
        if node.usage == 0 {
            self.live -= 1;
        }
        Ok(self.nodes[index].usage)
    }

    /// Release the usage reference held by a swept instance.
    pub(crate) fn release_instance(&mut self, index: usize) {
        let released = self.drop_usage(index);
        debug_assert!(released.is_ok(), "instance count out of sync");
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Name → usage, the view that matters when hunting a teardown leak.
        let mut map = f.debug_map();
        for node in &self.nodes {
            map.entry(&&*node.name, &node.usage);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_register_and_usage() {
        let mut types = TypeTable::new();
        let _leaf = types
            .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();

        assert_eq!(types.type_usage("Leaf").unwrap(), 1);
        assert_eq!(types.live_types(), 1);
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let mut types = TypeTable::new();
        let result = types.register("", None, ptr::null_mut(), None, ptr::null_mut());
        assert_eq!(result.unwrap_err(), HeapError::ArgumentInvalid);
    }

    #[test]
    fn test_register_rejects_ctx_without_callback() {
        let mut types = TypeTable::new();
        let mut ctx = 0u8;
        let result = types.register(
            "Broken",
            None,
            &mut ctx as *mut u8,
            None,
            ptr::null_mut(),
        );
        assert_eq!(result.unwrap_err(), HeapError::ArgumentInvalid);
        assert_eq!(types.len(), 0);
    }

    #[test]
    fn test_register_duplicate_leaves_usage_unchanged() {
        let mut types = TypeTable::new();
        types
            .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();
        types.acquire("Leaf").unwrap();

        let result = types.register("Leaf", None, ptr::null_mut(), None, ptr::null_mut());
        assert_eq!(result.unwrap_err(), HeapError::TypeExists);
        assert_eq!(types.type_usage("Leaf").unwrap(), 2);
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn test_acquire_unknown_type() {
        let mut types = TypeTable::new();
        assert_eq!(
            types.acquire("Ghost").unwrap_err(),
            HeapError::TypeNotExists
        );
    }

    #[test]
    fn test_acquire_relinquish_balance() {
        let mut types = TypeTable::new();
        types
            .register("Node", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();

        let handle = types.acquire("Node").unwrap();
        assert_eq!(types.type_usage("Node").unwrap(), 2);

        types.relinquish(handle).unwrap();
        assert_eq!(types.type_usage("Node").unwrap(), 1);
    }

    #[test]
    fn test_relinquish_stale_handle() {
        let mut types = TypeTable::new();
        assert_eq!(
            types.relinquish(TypeHandle(3)).unwrap_err(),
            HeapError::ArgumentInvalid
        );
    }

    #[test]
    fn test_unregister_releases_registration() {
        let mut types = TypeTable::new();
        types
            .register("Leaf", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();

        types.unregister("Leaf").unwrap();
        assert_eq!(types.live_types(), 0);
        // Slot persists: the name stays reserved until teardown.
        assert_eq!(types.len(), 1);
        assert_eq!(
            types.register("Leaf", None, ptr::null_mut(), None, ptr::null_mut()),
            Err(HeapError::TypeExists)
        );
        // And the released node is logically absent.
        assert_eq!(
            types.acquire("Leaf").unwrap_err(),
            HeapError::TypeNotExists
        );
        assert_eq!(
            types.unregister("Leaf").unwrap_err(),
            HeapError::TypeNotExists
        );
    }

    #[test]
    fn test_unregister_reports_type_used() {
        let mut types = TypeTable::new();
        types
            .register("Node", None, ptr::null_mut(), None, ptr::null_mut())
            .unwrap();
        types.acquire("Node").unwrap();

        // The registration reference is gone, but the acquisition pins it.
        assert_eq!(types.unregister("Node").unwrap_err(), HeapError::TypeUsed);
        assert_eq!(types.type_usage("Node").unwrap(), 1);
        assert_eq!(types.live_types(), 1);
    }
}
