//! The inline slot of an owning wrapper.

use core::{cell::UnsafeCell, marker::PhantomData, mem::MaybeUninit, ptr::NonNull};

use crate::{unique::INLINE_CAPACITY, util::Erased};

/// An explicitly untyped, suitably aligned block of bytes.
///
/// Holds either a payload of at most [`INLINE_CAPACITY`] bytes, or the address
/// of a heap block containing the payload. The bytes are only ever interpreted
/// by the vtable installed next to the slot.
///
/// The bytes sit in an [`UnsafeCell`] because payloads called through `&self`
/// may contain interior mutability of their own.
#[repr(C, align(16))]
pub(crate) struct InlineSlot {
    /// The payload bytes, or the address of the heap block
    bytes: UnsafeCell<MaybeUninit<[u8; INLINE_CAPACITY]>>,
    /// The slot may contain values that are neither `Send` nor `Sync`
    _marker: PhantomData<*mut Erased>,
}

impl InlineSlot {
    /// Creates a slot containing no value.
    #[inline]
    pub(crate) const fn uninit() -> Self {
        Self {
            bytes: UnsafeCell::new(MaybeUninit::uninit()),
            _marker: PhantomData,
        }
    }

    /// Returns the address of the first byte of the slot.
    ///
    /// The address is aligned to [`INLINE_ALIGN`](crate::INLINE_ALIGN) and
    /// valid for writes of [`INLINE_CAPACITY`] bytes for as long as the slot
    /// is neither moved nor dropped.
    #[inline]
    pub(crate) fn as_ptr(&self) -> NonNull<Erased> {
        // Pointers derived from a shared reference to an `UnsafeCell` carry
        // write permission for its contents, exactly like `UnsafeCell::get`.
        NonNull::from(&self.bytes).cast::<Erased>()
    }
}
