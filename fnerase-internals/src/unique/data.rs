//! Payload placement for owning wrappers.
//!
//! This module encapsulates how a payload is found, written and destroyed for
//! each [`Storage`] mode. A [`Place`] is chosen together with the vtable when
//! a wrapper is constructed, which keeps the interpretation of the slot in
//! sync with what was written into it.

use core::{alloc::Layout, marker::PhantomData, ptr::NonNull};

use crate::{
    alloc::{AllocError, HeapAlloc},
    unique::{INLINE_ALIGN, INLINE_CAPACITY, Storage},
    util::{Erased, trace_event},
};

/// The heap block backing a payload in [`Storage::External`].
///
/// This struct uses `#[repr(C)]` so that the payload is always at offset zero,
/// which lets the invoke functions treat the block address as the payload
/// address.
#[repr(C)]
pub(super) struct ExternalBlock<F, H> {
    /// The payload
    value: F,
    /// The allocator that provided this block, used to release it
    alloc: H,
}

/// The way a payload of type `F` is laid out relative to the inline slot.
///
/// # Safety
///
/// Implementors must guarantee that [`payload`](Place::payload) and
/// [`DROP`](Place::DROP) interpret a slot written by the matching write
/// function in this module correctly.
pub(super) unsafe trait Place<F> {
    /// The storage mode reported for payloads placed this way.
    const STORAGE: Storage;

    /// Destroys the payload and releases its storage, `None` if there is
    /// nothing to do.
    const DROP: Option<unsafe fn(NonNull<Erased>)>;

    /// Returns the address of the payload.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `slot` is the address of an inline slot containing a payload of type
    ///    `F` placed this way
    unsafe fn payload(slot: NonNull<Erased>) -> NonNull<F>;
}

/// Payloads stored inline without drop glue.
pub(super) struct TrivialPlace;

/// Payloads stored inline and dropped in place.
pub(super) struct InlinePlace;

/// Payloads stored in an [`ExternalBlock<F, H>`].
pub(super) struct ExternalPlace<H>(PhantomData<H>);

// SAFETY:
// 1. Trivial payloads are written at the start of the slot by `write_inline`
// 2. They have no drop glue, so skipping destruction is equivalent to dropping
unsafe impl<F> Place<F> for TrivialPlace {
    const STORAGE: Storage = Storage::Trivial;
    const DROP: Option<unsafe fn(NonNull<Erased>)> = None;

    #[inline]
    unsafe fn payload(slot: NonNull<Erased>) -> NonNull<F> {
        slot.cast::<F>()
    }
}

// SAFETY:
// 1. Inline payloads are written at the start of the slot by `write_inline`
// 2. `drop_inline::<F>` drops the payload in place
unsafe impl<F> Place<F> for InlinePlace {
    const STORAGE: Storage = Storage::Inline;
    const DROP: Option<unsafe fn(NonNull<Erased>)> = Some(drop_inline::<F>);

    #[inline]
    unsafe fn payload(slot: NonNull<Erased>) -> NonNull<F> {
        slot.cast::<F>()
    }
}

// SAFETY:
// 1. `write_external` stores the address of an `ExternalBlock<F, H>` at the
//    start of the slot, and the payload is at offset zero of that block
// 2. `drop_external::<F, H>` drops the payload and releases the block through
//    the allocator stored in it
unsafe impl<F, H: HeapAlloc> Place<F> for ExternalPlace<H> {
    const STORAGE: Storage = Storage::External;
    const DROP: Option<unsafe fn(NonNull<Erased>)> = Some(drop_external::<F, H>);

    #[inline]
    unsafe fn payload(slot: NonNull<Erased>) -> NonNull<F> {
        // SAFETY:
        // 1. The slot holds the block address, guaranteed by the caller
        let block = unsafe { read_block::<F, H>(slot) };
        block.cast::<F>()
    }
}

/// Reads the address of the external block stored in the slot.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` contains the address of an [`ExternalBlock<F, H>`] written by
///    [`write_external`]
#[inline]
unsafe fn read_block<F, H>(slot: NonNull<Erased>) -> NonNull<ExternalBlock<F, H>> {
    // SAFETY:
    // 1. The slot starts with an initialized block address, guaranteed by the
    //    caller, and slots are aligned for pointers
    unsafe { slot.cast::<NonNull<ExternalBlock<F, H>>>().read() }
}

/// Returns the layout of the heap block used for an external `F` allocated
/// with `H`.
#[inline]
pub(super) const fn external_layout<F, H>() -> Layout {
    Layout::new::<ExternalBlock<F, H>>()
}

/// Writes a payload directly into the slot.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` is the address of an inline slot that currently contains no
///    payload
/// 2. `F` fits the slot, as decided by [`Storage::select`]
#[inline]
pub(super) unsafe fn write_inline<F, I>(slot: NonNull<Erased>, init: I)
where
    I: FnOnce() -> F,
{
    debug_assert!(core::mem::size_of::<F>() <= INLINE_CAPACITY);
    debug_assert!(core::mem::align_of::<F>() <= INLINE_ALIGN);

    // SAFETY:
    // 1. The slot is large and aligned enough for `F`, guaranteed by the caller
    // 2. Nothing is overwritten, as the slot is empty
    unsafe {
        slot.cast::<F>().write(init());
    }
}

/// Moves a payload and its allocator into a fresh heap block and stores the
/// block address in the slot.
///
/// The payload is produced before anything is allocated, so a panicking `init`
/// leaks nothing. If the allocation fails, the payload is dropped.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` is the address of an inline slot that currently contains no
///    payload
pub(super) unsafe fn write_external<F, H, I>(
    slot: NonNull<Erased>,
    init: I,
    alloc: H,
) -> Result<(), AllocError>
where
    H: HeapAlloc,
    I: FnOnce() -> F,
{
    let value = init();
    let layout = external_layout::<F, H>();
    let block = alloc.allocate(layout)?.cast::<ExternalBlock<F, H>>();

    trace_event!(
        type_name = core::any::type_name::<F>(),
        size = layout.size(),
        align = layout.align(),
        "allocated external callable storage"
    );

    // SAFETY:
    // 1. The block was just allocated with the layout of `ExternalBlock<F, H>`
    unsafe {
        block.write(ExternalBlock { value, alloc });
    }

    // SAFETY:
    // 1. Slots are large and aligned enough for a pointer
    // 2. Nothing is overwritten, as the slot is empty
    unsafe {
        slot.cast::<NonNull<ExternalBlock<F, H>>>().write(block);
    }

    Ok(())
}

/// Drops an inline payload in place.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` contains an initialized `F` written by [`write_inline`]
/// 2. The payload is not used after this call
unsafe fn drop_inline<F>(slot: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    unsafe {
        slot.cast::<F>().drop_in_place();
    }
}

/// Drops an external payload and releases its block.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` contains the address of an initialized `ExternalBlock<F, H>`
///    written by [`write_external`]
/// 2. Neither the payload nor the block is used after this call
unsafe fn drop_external<F, H: HeapAlloc>(slot: NonNull<Erased>) {
    // SAFETY:
    // 1. Guaranteed by the caller
    let block = unsafe { read_block::<F, H>(slot) };

    // SAFETY:
    // 1. The payload is at offset zero and initialized, guaranteed by the caller
    // 2. It is dropped exactly once, since it is not used after this call
    unsafe {
        block.cast::<F>().drop_in_place();
    }

    let block_ptr: *mut ExternalBlock<F, H> = block.as_ptr();
    // SAFETY:
    // 1. The block is allocated and initialized, so projecting to a field stays
    //    in bounds
    let alloc_ptr: *const H = unsafe { &raw const (*block_ptr).alloc };

    // SAFETY:
    // 1. The allocator field is initialized and aligned
    // 2. The allocator is moved out, and the block is released right after
    //    without dropping its fields again
    let alloc: H = unsafe { alloc_ptr.read() };

    let layout = external_layout::<F, H>();
    trace_event!(
        type_name = core::any::type_name::<F>(),
        size = layout.size(),
        "released external callable storage"
    );

    // SAFETY:
    // 1. The block was allocated by this allocator (moved into the block right
    //    after allocating) with the same layout
    // 2. The block has not been released before, guaranteed by the caller
    unsafe {
        alloc.deallocate(block.cast::<u8>(), layout);
    }
}
