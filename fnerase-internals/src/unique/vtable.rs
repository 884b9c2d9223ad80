//! Vtable for type-erased owning wrappers.
//!
//! This module contains the [`UniqueVtable`] which enables calling and
//! destroying a payload after its concrete type has been erased. The vtable
//! stores function pointers that dispatch to the correct typed
//! implementations.
//!
//! This module encapsulates the fields of [`UniqueVtable`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the vtable's function pointers always match the payload type
//! and the placement used for the slot they are called with**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because vtables are created as `&'static`
//! references via the constructors below, which pair the function pointers
//! with a specific payload type `F` and [`Place`] `P` at compile time.
//!
//! # Signature Erasure
//!
//! The vtable does not name the signature it was created for. A `&'static`
//! reference to a type mentioning the signature would require the signature,
//! and with it every argument type, to be `'static`. The invoke functions are
//! therefore stored as [`ErasedInvoke`] and converted back to [`SlotInvoke<S>`]
//! by the caller, which knows `S`.

use core::{marker::PhantomData, ptr::NonNull};

use crate::{
    signature::{Callable, CallableMut, Signature},
    unique::{Storage, data::Place},
    util::Erased,
};

/// Signature of the invoke functions of a payload called with `S`.
pub(crate) type SlotInvoke<S> =
    unsafe fn(NonNull<Erased>, <S as Signature>::Args) -> <S as Signature>::Output;

/// An invoke function with its signature erased.
type ErasedInvoke = unsafe fn();

/// Erases the signature of an invoke function.
const fn erase<S: Signature>(invoke: SlotInvoke<S>) -> ErasedInvoke {
    // SAFETY: Function pointers of every signature have the same size and
    // representation. The result is only called after converting it back
    // with `restore::<S>`
    unsafe { core::mem::transmute::<SlotInvoke<S>, ErasedInvoke>(invoke) }
}

/// Restores the signature of an invoke function.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `invoke` was created by `erase::<S>` for the same signature `S`, up to
///    lifetimes
#[inline]
unsafe fn restore<S: Signature>(invoke: ErasedInvoke) -> SlotInvoke<S> {
    // SAFETY: Function pointers of every signature have the same size and
    // representation, and `invoke` was a `SlotInvoke<S>` before it was
    // erased, guaranteed by the caller
    unsafe { core::mem::transmute::<ErasedInvoke, SlotInvoke<S>>(invoke) }
}

/// Vtable for type-erased owning wrappers.
///
/// # Safety Invariant
///
/// The fields `invoke`, `invoke_mut` and `drop` are guaranteed to point to the
/// functions defined below (or the ones from [`Place`]) instantiated with the
/// signature `S`, the payload type `F` and the placement `P` that were used
/// to create this [`UniqueVtable`].
pub(crate) struct UniqueVtable {
    /// Gets the [`core::any::type_name`] of the payload type.
    type_name: fn() -> &'static str,
    /// Where the payload is stored.
    storage: Storage,
    /// Calls the payload through `&self`, `None` if it has no such call path.
    invoke: Option<ErasedInvoke>,
    /// Calls the payload through `&mut self`. For payloads that only have a
    /// `&self` call path this is the same function as `invoke`.
    invoke_mut: ErasedInvoke,
    /// Destroys the payload and releases its storage, `None` if nothing needs
    /// to happen.
    drop: Option<unsafe fn(NonNull<Erased>)>,
}

/// Holds the vtables of payloads of type `F`, placed with `P` and called with
/// the signature `S`.
///
/// The vtables are associated constants, so a single `&'static` instance
/// exists per combination without requiring any of the types to be
/// `'static`.
struct VtableFor<S, F, P>(PhantomData<(S, fn() -> F, P)>);

impl<S, F, P> VtableFor<S, F, P>
where
    S: Signature,
    F: Callable<S>,
    P: Place<F>,
{
    /// The vtable for payloads that are only called through `&self`.
    const CONST: &'static UniqueVtable = &UniqueVtable {
        type_name: core::any::type_name::<F>,
        storage: P::STORAGE,
        invoke: Some(erase::<S>(invoke::<S, F, P>)),
        invoke_mut: erase::<S>(invoke::<S, F, P>),
        drop: P::DROP,
    };
}

impl<S, F, P> VtableFor<S, F, P>
where
    S: Signature,
    F: CallableMut<S>,
    P: Place<F>,
{
    /// The vtable for payloads that are only called through `&mut self`.
    const MUT: &'static UniqueVtable = &UniqueVtable {
        type_name: core::any::type_name::<F>,
        storage: P::STORAGE,
        invoke: None,
        invoke_mut: erase::<S>(invoke_mut::<S, F, P>),
        drop: P::DROP,
    };
}

impl<S, F, P> VtableFor<S, F, P>
where
    S: Signature,
    F: Callable<S> + CallableMut<S>,
    P: Place<F>,
{
    /// The vtable for payloads with a separate call path for `&self` and
    /// `&mut self`.
    const DUAL: &'static UniqueVtable = &UniqueVtable {
        type_name: core::any::type_name::<F>,
        storage: P::STORAGE,
        invoke: Some(erase::<S>(invoke::<S, F, P>)),
        invoke_mut: erase::<S>(invoke_mut::<S, F, P>),
        drop: P::DROP,
    };
}

impl UniqueVtable {
    /// Creates a vtable for payloads that are only called through `&self`.
    pub(super) const fn new_const<S, F, P>() -> &'static Self
    where
        S: Signature,
        F: Callable<S>,
        P: Place<F>,
    {
        VtableFor::<S, F, P>::CONST
    }

    /// Creates a vtable for payloads that are only called through `&mut self`.
    pub(super) const fn new_mut<S, F, P>() -> &'static Self
    where
        S: Signature,
        F: CallableMut<S>,
        P: Place<F>,
    {
        VtableFor::<S, F, P>::MUT
    }

    /// Creates a vtable for payloads that have a separate call path for
    /// `&self` and `&mut self`.
    pub(super) const fn new_dual<S, F, P>() -> &'static Self
    where
        S: Signature,
        F: Callable<S> + CallableMut<S>,
        P: Place<F>,
    {
        VtableFor::<S, F, P>::DUAL
    }

    /// Gets the [`core::any::type_name`] of the payload type that was used to
    /// create this [`UniqueVtable`].
    #[inline]
    pub(super) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Returns where the payload is stored.
    #[inline]
    pub(super) fn storage(&self) -> Storage {
        self.storage
    }

    /// Returns `true` if the payload can be called through `&self`.
    #[inline]
    pub(super) fn has_const_path(&self) -> bool {
        self.invoke.is_some()
    }

    /// Calls the payload through `&self`, or returns `None` if the payload has
    /// no such call path.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`UniqueVtable`] must be the vtable that was installed when the
    ///    payload was written into `slot`
    /// 2. The vtable was created for the signature `S`, up to lifetimes
    /// 3. The payload is not mutably borrowed for the duration of the call
    #[inline]
    pub(super) unsafe fn invoke<S: Signature>(
        &self,
        slot: NonNull<Erased>,
        args: S::Args,
    ) -> Option<S::Output> {
        let invoke = self.invoke?;

        // SAFETY:
        // 1. `invoke` was erased from `invoke::<S, F, P>` below, with `S`
        //    guaranteed by the caller
        let invoke = unsafe { restore::<S>(invoke) };

        // SAFETY: `invoke` points to the function `invoke::<S, F, P>` below.
        // That function's safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        Some(unsafe { invoke(slot, args) })
    }

    /// Calls the payload through `&mut self`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`UniqueVtable`] must be the vtable that was installed when the
    ///    payload was written into `slot`
    /// 2. The vtable was created for the signature `S`, up to lifetimes
    /// 3. The payload is not otherwise borrowed for the duration of the call
    #[inline]
    pub(super) unsafe fn invoke_mut<S: Signature>(
        &self,
        slot: NonNull<Erased>,
        args: S::Args,
    ) -> S::Output {
        // SAFETY:
        // 1. `invoke_mut` was erased from `invoke::<S, F, P>` or
        //    `invoke_mut::<S, F, P>` below, with `S` guaranteed by the caller
        let invoke_mut = unsafe { restore::<S>(self.invoke_mut) };

        // SAFETY: `invoke_mut` points to either `invoke::<S, F, P>` or
        // `invoke_mut::<S, F, P>` below. Their safety requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { invoke_mut(slot, args) }
    }

    /// Destroys the payload stored in `slot` and releases its storage.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`UniqueVtable`] must be the vtable that was installed when the
    ///    payload was written into `slot`
    /// 2. The payload has not been destroyed before, and the slot is not used
    ///    again until a new payload is written into it
    #[inline]
    pub(super) unsafe fn drop(&self, slot: NonNull<Erased>) {
        if let Some(drop) = self.drop {
            // SAFETY: We know that `drop` points to the `DROP` function of the
            // `Place` used to create this vtable. Its safety requirements are upheld:
            // 1. Guaranteed by the caller
            // 2. Guaranteed by the caller
            unsafe {
                drop(slot);
            }
        }
    }
}

/// Calls the payload through `&self`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` contains a payload of type `F` placed according to `P`
/// 2. The payload is not mutably borrowed for the duration of the call
unsafe fn invoke<S, F, P>(slot: NonNull<Erased>, args: S::Args) -> S::Output
where
    S: Signature,
    F: Callable<S>,
    P: Place<F>,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let payload = unsafe { P::payload(slot) };

    // SAFETY:
    // 1. The payload is initialized and aligned, guaranteed by the caller
    // 2. Shared access is allowed, guaranteed by the caller
    let payload: &F = unsafe { payload.as_ref() };
    payload.call(args)
}

/// Calls the payload through `&mut self`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `slot` contains a payload of type `F` placed according to `P`
/// 2. The payload is not otherwise borrowed for the duration of the call
unsafe fn invoke_mut<S, F, P>(slot: NonNull<Erased>, args: S::Args) -> S::Output
where
    S: Signature,
    F: CallableMut<S>,
    P: Place<F>,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let mut payload = unsafe { P::payload(slot) };

    // SAFETY:
    // 1. The payload is initialized and aligned, guaranteed by the caller
    // 2. Exclusive access is allowed, guaranteed by the caller
    let payload: &mut F = unsafe { payload.as_mut() };
    payload.call_mut(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alloc::Global,
        unique::data::{ExternalPlace, InlinePlace, TrivialPlace},
    };

    type Sig = fn(i32) -> i32;

    fn add_one(x: i32) -> i32 {
        x + 1
    }

    struct Counter {
        count: usize,
    }

    impl CallableMut<fn() -> usize> for Counter {
        fn call_mut(&mut self, (): ()) -> usize {
            self.count += 1;
            self.count
        }
    }

    #[test]
    fn test_unique_vtable_per_placement() {
        let trivial = UniqueVtable::new_const::<Sig, fn(i32) -> i32, TrivialPlace>();
        let external = UniqueVtable::new_const::<Sig, fn(i32) -> i32, ExternalPlace<Global>>();
        assert!(!core::ptr::eq(trivial, external));
        assert_eq!(trivial.storage(), Storage::Trivial);
        assert_eq!(external.storage(), Storage::External);
    }

    #[test]
    fn test_unique_vtable_borrowed_signature() {
        type Check<'w> = fn(&'w str) -> bool;

        fn starts_with_a(word: &str) -> bool {
            word.starts_with('a')
        }

        fn call<'w>(word: &'w str) -> bool {
            let vtable = UniqueVtable::new_const::<Check<'w>, Check<'w>, TrivialPlace>();
            let mut payload: Check<'w> = starts_with_a;
            let slot = NonNull::from(&mut payload).cast::<Erased>();

            // SAFETY: The slot holds an `fn(&str) -> bool` placed inline
            unsafe { vtable.invoke_mut::<Check<'w>>(slot, (word,)) }
        }

        let word = alloc_crate::string::String::from("apple");
        assert!(call(&word));
        assert!(!call("pear"));
    }

    #[test]
    fn test_unique_vtable_metadata() {
        let vtable = UniqueVtable::new_const::<Sig, fn(i32) -> i32, TrivialPlace>();
        assert_eq!(vtable.type_name(), core::any::type_name::<fn(i32) -> i32>());
        assert_eq!(vtable.storage(), Storage::Trivial);
        assert!(vtable.has_const_path());

        let vtable = UniqueVtable::new_mut::<fn() -> usize, Counter, InlinePlace>();
        assert_eq!(vtable.storage(), Storage::Inline);
        assert!(!vtable.has_const_path());
    }

    #[test]
    fn test_unique_vtable_invoke() {
        let vtable = UniqueVtable::new_const::<Sig, fn(i32) -> i32, TrivialPlace>();
        let mut payload: fn(i32) -> i32 = add_one;
        let slot = NonNull::from(&mut payload).cast::<Erased>();

        // SAFETY: The slot holds an `fn(i32) -> i32` placed inline
        assert_eq!(unsafe { vtable.invoke::<Sig>(slot, (41,)) }, Some(42));
        // SAFETY: The slot holds an `fn(i32) -> i32` placed inline
        assert_eq!(unsafe { vtable.invoke_mut::<Sig>(slot, (1,)) }, 2);
        // SAFETY: Trivial payloads have nothing to destroy
        unsafe {
            vtable.drop(slot);
        }
    }
}
