//! Tag header stored before every heap allocation
//!
//! Every payload handed out by the allocator is preceded by a `Tag` that
//! carries the collector's per-object state.

use std::mem;

/// Alignment of the tag header and of every payload.
///
/// Payloads are opaque byte blocks, so they get the strictest alignment any
/// ordinary object needs (the same guarantee `malloc` gives).
pub(crate) const TAG_ALIGN: usize = 16;

/// Marking state of a heap object.
///
/// Exactly one color holds at any time. New allocations start White; `visit`
/// moves reachable objects to Gray (or straight to Black for leaf types);
/// draining the gray worklists turns Gray into Black; sweep reclaims White
/// objects and recolors Black survivors White for the next cycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Collectible candidate; not yet proven reachable this cycle.
    White = 0,
    /// Reachable, waiting on a gray worklist to be scanned.
    Gray = 1,
    /// Reachable and scanned.
    Black = 2,
}

/// Tag stored immediately before each allocated payload.
///
/// Layout in memory:
/// ```text
/// ┌─────────────────────────────────────────┐
/// │ Tag (16 bytes, 16-byte aligned)         │
/// │  - color: Color (1 byte)                │
/// │  - ty: u32 (owning TypeNode index)      │
/// │  - size: usize (block size, tag incl.)  │
/// ├─────────────────────────────────────────┤  ← payload pointer
/// │ Payload (caller-specified size)         │
/// └─────────────────────────────────────────┘
/// ```
///
/// The owning-type slot is a plain index and the gray linkage lives in the
/// type's worklist, so the header never aliases two meanings onto one field.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    /// Current marking state.
    color: Color,

    /// Index of the owning TypeNode in the registry arena.
    ty: u32,

    /// Size of the whole block (tag + payload), for deallocation and stats.
    size: usize,
}

impl Tag {
    /// Create a tag for a freshly allocated block. New objects are White.
    pub(crate) fn new(ty: u32, size: usize) -> Self {
        Self {
            color: Color::White,
            ty,
            size,
        }
    }

    /// Current color.
    #[inline]
    pub(crate) fn color(&self) -> Color {
        self.color
    }

    /// Set the color.
    #[inline]
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Index of the owning type.
    #[inline]
    pub(crate) fn type_index(&self) -> u32 {
        self.ty
    }

    /// Total block size, tag included.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Recover the tag from a payload pointer.
    ///
    /// # Safety
    ///
    /// `payload` must point at the payload of a live block produced by the
    /// heap allocator.
    #[inline]
    pub(crate) unsafe fn from_payload(payload: *mut u8) -> *mut Tag {
        (payload as *mut Tag).sub(1)
    }

    /// Payload pointer of a tagged block.
    ///
    /// # Safety
    ///
    /// `tag` must point at the header of a live block produced by the heap
    /// allocator.
    #[inline]
    pub(crate) unsafe fn payload(tag: *mut Tag) -> *mut u8 {
        (tag as *mut u8).add(mem::size_of::<Tag>())
    }
}
