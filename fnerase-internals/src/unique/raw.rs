//! The type-erased, owning callable handle.
//!
//! This module encapsulates the `vtable` and `slot` fields of [`RawUniqueFn`],
//! ensuring they are only visible within this module. This visibility
//! restriction guarantees the safety invariant: **the vtable always matches
//! the payload written into the slot**.
//!
//! # Safety Invariant
//!
//! The constructors select the vtable and the placement from the same
//! [`Storage`] decision, write the payload, and only then store the vtable.
//! Afterwards the fields only change together: [`RawUniqueFn::take`] moves
//! both out at once.
//!
//! # Moves
//!
//! Moving a [`RawUniqueFn`] copies the slot bytewise. That is a valid move of
//! an inline payload, since every Rust value can be relocated by copying it,
//! and it moves the address of an external block without touching the block.
//! No manager function runs on moves.

use core::{alloc::Layout, marker::PhantomData};

use crate::{
    alloc::{AllocError, HeapAlloc},
    signature::{Callable, CallableMut, Signature},
    unique::{
        Storage,
        data::{self, ExternalPlace, InlinePlace, TrivialPlace},
        slot::InlineSlot,
        vtable::UniqueVtable,
    },
    util::{self, trace_event},
};

/// An owning wrapper around a callable whose type has been erased.
///
/// The payload may borrow data for `'a`, so the wrapper cannot outlive `'a`.
///
/// The raw handle does not track thread-safety or which call path the public
/// wrapper exposes. It is neither `Send` nor `Sync`; the typed wrappers in
/// `fnerase` add those guarantees when the payload allows them.
pub struct RawUniqueFn<'a, S: Signature> {
    /// The vtable of the payload
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. If this is `None`, the slot contains no payload.
    /// 2. If this is `Some`, the slot contains a payload written for exactly
    ///    this vtable, which has not been destroyed yet.
    /// 3. If this is `Some`, the vtable was created for the signature `S`.
    vtable: Option<&'static UniqueVtable>,
    /// The payload, or the address of the heap block containing it
    slot: InlineSlot,
    /// The payload may borrow data for `'a` and is called with `S`
    _marker: PhantomData<(&'a (), S)>,
}

impl<'a, S: Signature> RawUniqueFn<'a, S> {
    /// Creates an empty wrapper.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            vtable: None,
            slot: InlineSlot::uninit(),
            _marker: PhantomData,
        }
    }

    /// Creates a wrapper whose payload is called through `&self`.
    ///
    /// The payload is produced by `init` and written directly into its final
    /// storage. `alloc` is only used, and only kept, when the payload ends up
    /// in [`Storage::External`].
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if external storage was needed and `alloc`
    /// failed to provide it. The payload is dropped in that case.
    pub fn new_const<F, H, I>(init: I, alloc: H, force_external: bool) -> Result<Self, AllocError>
    where
        F: Callable<S> + 'a,
        H: HeapAlloc + 'a,
        I: FnOnce() -> F,
    {
        let vtable = match Storage::select::<F>(force_external) {
            Storage::Trivial => UniqueVtable::new_const::<S, F, TrivialPlace>(),
            Storage::Inline => UniqueVtable::new_const::<S, F, InlinePlace>(),
            Storage::External => UniqueVtable::new_const::<S, F, ExternalPlace<H>>(),
        };

        // SAFETY:
        // 1. The vtable was created for `S` and `F` with the placement matching
        //    the storage selected for `force_external`
        unsafe { Self::install(vtable, init, alloc) }
    }

    /// Creates a wrapper whose payload is only called through `&mut self`.
    ///
    /// See [`RawUniqueFn::new_const`] for the meaning of the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if external storage was needed and `alloc`
    /// failed to provide it.
    pub fn new_mut<F, H, I>(init: I, alloc: H, force_external: bool) -> Result<Self, AllocError>
    where
        F: CallableMut<S> + 'a,
        H: HeapAlloc + 'a,
        I: FnOnce() -> F,
    {
        let vtable = match Storage::select::<F>(force_external) {
            Storage::Trivial => UniqueVtable::new_mut::<S, F, TrivialPlace>(),
            Storage::Inline => UniqueVtable::new_mut::<S, F, InlinePlace>(),
            Storage::External => UniqueVtable::new_mut::<S, F, ExternalPlace<H>>(),
        };

        // SAFETY:
        // 1. The vtable was created for `S` and `F` with the placement matching
        //    the storage selected for `force_external`
        unsafe { Self::install(vtable, init, alloc) }
    }

    /// Creates a wrapper whose payload has both a `&self` and a `&mut self`
    /// call path.
    ///
    /// See [`RawUniqueFn::new_const`] for the meaning of the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if external storage was needed and `alloc`
    /// failed to provide it.
    pub fn new_dual<F, H, I>(init: I, alloc: H, force_external: bool) -> Result<Self, AllocError>
    where
        F: Callable<S> + CallableMut<S> + 'a,
        H: HeapAlloc + 'a,
        I: FnOnce() -> F,
    {
        let vtable = match Storage::select::<F>(force_external) {
            Storage::Trivial => UniqueVtable::new_dual::<S, F, TrivialPlace>(),
            Storage::Inline => UniqueVtable::new_dual::<S, F, InlinePlace>(),
            Storage::External => UniqueVtable::new_dual::<S, F, ExternalPlace<H>>(),
        };

        // SAFETY:
        // 1. The vtable was created for `S` and `F` with the placement matching
        //    the storage selected for `force_external`
        unsafe { Self::install(vtable, init, alloc) }
    }

    /// Writes the payload according to the storage of `vtable`, then installs
    /// the vtable.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `vtable` was created for the signature `S` and the payload type `F`,
    ///    with [`ExternalPlace<H>`] if its storage is [`Storage::External`]
    unsafe fn install<F, H, I>(
        vtable: &'static UniqueVtable,
        init: I,
        alloc: H,
    ) -> Result<Self, AllocError>
    where
        H: HeapAlloc,
        I: FnOnce() -> F,
    {
        let mut this = Self::empty();
        let slot = this.slot.as_ptr();

        if vtable.storage().is_inline() {
            // SAFETY:
            // 1. The slot of a fresh wrapper is empty
            // 2. Inline storage is only selected for payloads that fit
            unsafe {
                data::write_inline(slot, init);
            }
        } else {
            // SAFETY:
            // 1. The slot of a fresh wrapper is empty
            unsafe { data::write_external(slot, init, alloc) }?;
        }

        trace_event!(
            type_name = vtable.type_name(),
            storage = ?vtable.storage(),
            "created owning callable"
        );

        this.vtable = Some(vtable);
        Ok(this)
    }

    /// Returns the layout of the heap block an external payload of type `F`
    /// allocated with `H` occupies.
    ///
    /// Useful to report allocation failures through
    /// `alloc::alloc::handle_alloc_error`.
    #[inline]
    pub const fn external_layout<F, H>() -> Layout {
        data::external_layout::<F, H>()
    }

    /// Returns `true` if the wrapper contains a payload.
    #[inline]
    pub const fn is_some(&self) -> bool {
        self.vtable.is_some()
    }

    /// Returns where the payload is stored, or `None` for an empty wrapper.
    #[inline]
    pub fn storage(&self) -> Option<Storage> {
        self.vtable.map(UniqueVtable::storage)
    }

    /// Returns the [`core::any::type_name`] of the payload, or `None` for an
    /// empty wrapper.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        self.vtable.map(UniqueVtable::type_name)
    }

    /// Returns `true` if the payload can be called through `&self`.
    ///
    /// Returns `false` for an empty wrapper.
    #[inline]
    pub fn has_const_path(&self) -> bool {
        self.vtable.is_some_and(UniqueVtable::has_const_path)
    }

    /// Calls the payload through `&self`.
    ///
    /// Returns `None`, without calling anything, if the payload was created
    /// without a `&self` call path.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty.
    #[inline]
    #[track_caller]
    pub fn call(&self, args: S::Args) -> Option<S::Output> {
        let Some(vtable) = self.vtable else {
            util::called_empty()
        };

        // SAFETY:
        // 1. The vtable matches the payload in the slot, guaranteed by the
        //    invariants of this type
        // 2. The vtable was created for `S`, guaranteed by the invariants of
        //    this type
        // 3. Payloads are only borrowed mutably through `&mut self`, which cannot
        //    coexist with the `&self` held here
        unsafe { vtable.invoke::<S>(self.slot.as_ptr(), args) }
    }

    /// Calls the payload through `&mut self`.
    ///
    /// Payloads without a separate `&mut self` call path are called through
    /// `&self`.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty.
    #[inline]
    #[track_caller]
    pub fn call_mut(&mut self, args: S::Args) -> S::Output {
        let Some(vtable) = self.vtable else {
            util::called_empty()
        };

        // SAFETY:
        // 1. The vtable matches the payload in the slot, guaranteed by the
        //    invariants of this type
        // 2. The vtable was created for `S`, guaranteed by the invariants of
        //    this type
        // 3. `&mut self` guarantees that no other borrow of the payload exists
        unsafe { vtable.invoke_mut::<S>(self.slot.as_ptr(), args) }
    }

    /// Moves the payload out into a new wrapper, leaving this one empty.
    #[inline]
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Self::empty())
    }
}

impl<S: Signature> core::ops::Drop for RawUniqueFn<'_, S> {
    #[inline]
    fn drop(&mut self) {
        if let Some(vtable) = self.vtable.take() {
            // SAFETY:
            // 1. The vtable matches the payload in the slot, guaranteed by the
            //    invariants of this type
            // 2. The vtable has been removed, so the payload is destroyed exactly
            //    once and the slot is never interpreted again
            unsafe {
                vtable.drop(self.slot.as_ptr());
            }
        }
    }
}

impl<S: Signature> Default for RawUniqueFn<'_, S> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature> core::fmt::Debug for RawUniqueFn<'_, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.vtable {
            Some(vtable) => f
                .debug_struct("RawUniqueFn")
                .field("type_name", &vtable.type_name())
                .field("storage", &vtable.storage())
                .finish(),
            None => f.write_str("RawUniqueFn(<empty>)"),
        }
    }
}
