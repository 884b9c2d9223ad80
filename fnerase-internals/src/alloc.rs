//! The allocator capability used when a payload does not fit inline.
//!
//! Owning wrappers store payloads that are too large, too strictly aligned or
//! explicitly requested to live on the heap in a block obtained from a
//! [`HeapAlloc`]. The allocator value itself is moved into that block, next to
//! the payload, so that the block can later be released through the same
//! allocator without the wrapper having to remember its type.

use core::{alloc::Layout, fmt, ptr::NonNull};

/// Allocation failure reported by a [`HeapAlloc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")
    }
}

impl core::error::Error for AllocError {}

/// An allocator that owning wrappers can place payloads with.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// 1. A pointer returned by a successful [`allocate`](HeapAlloc::allocate) call
///    is valid for reads and writes of `layout.size()` bytes and aligned to
///    `layout.align()`
/// 2. The block stays valid until it is passed to
///    [`deallocate`](HeapAlloc::deallocate), even if the allocator value that
///    returned it has been moved in the meantime
/// 3. A moved allocator value can deallocate blocks obtained before the move
pub unsafe trait HeapAlloc {
    /// Allocates a block of memory described by `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the memory could not be obtained.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block previously obtained from this allocator.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// 1. `ptr` was returned by [`allocate`](HeapAlloc::allocate) on this
    ///    allocator (or a value it was moved from) with the same `layout`
    /// 2. `ptr` has not been deallocated already
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global heap, as exposed by the `alloc` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Global;

// SAFETY:
// 1. Non-empty blocks come straight from the global allocator, which upholds
//    the size and alignment requirements
// 2. Zero-sized requests receive a dangling pointer aligned to the requested
//    alignment, which is valid for zero-sized accesses and is never passed to
//    the global allocator
// 3. `Global` carries no state, so every value can release every block
unsafe impl HeapAlloc for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            let dangling = core::ptr::without_provenance_mut::<u8>(layout.align());
            return NonNull::new(dangling).ok_or(AllocError);
        }

        // SAFETY:
        // 1. The layout has a non-zero size, checked above
        let ptr = unsafe { alloc_crate::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }

        // SAFETY:
        // 1. The caller guarantees that `ptr` was allocated by `allocate` with
        //    this layout, and non-empty layouts are always served by the
        //    global allocator
        unsafe {
            alloc_crate::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

// SAFETY:
// 1. Forwards to the referenced allocator, which upholds the contract itself
// 2. The reference is `'static`, so every copy refers to the same allocator
unsafe impl<H: HeapAlloc + ?Sized> HeapAlloc for &'static H {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        H::allocate(self, layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY:
        // 1. Guaranteed by the caller, and the referenced allocator is the
        //    one that served the block
        unsafe {
            H::deallocate(self, ptr, layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_round_trip() {
        let layout = Layout::new::<[u64; 8]>();
        let ptr = Global.allocate(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % layout.align(), 0);

        // SAFETY: The block was just allocated with this layout
        unsafe {
            ptr.cast::<[u64; 8]>().write([7; 8]);
        }
        // SAFETY: The block was initialized above
        let value = unsafe { ptr.cast::<[u64; 8]>().read() };
        assert_eq!(value, [7; 8]);

        // SAFETY: Allocated above with the same layout
        unsafe {
            Global.deallocate(ptr, layout);
        }
    }

    #[test]
    fn test_zero_sized_requests_are_aligned() {
        let layout = Layout::from_size_align(0, 64).unwrap();
        let ptr = Global.allocate(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize, 64);

        // SAFETY: Allocated above with the same layout
        unsafe {
            Global.deallocate(ptr, layout);
        }
    }

    #[test]
    fn test_alloc_error_display() {
        assert_eq!(alloc_crate::format!("{AllocError}"), "memory allocation failed");
    }
}
