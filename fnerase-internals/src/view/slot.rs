//! The one-word slot of a view and the invoke functions that interpret it.
//!
//! This module pairs every way of filling a [`ViewSlot`] with the invoke
//! function that reads it back. The functions are instantiated per callable
//! type, so the address of the selected instantiation is the only place the
//! concrete type is remembered.

use core::ptr::NonNull;

use crate::{
    signature::{Callable, CallableMut, Signature},
    util::Erased,
};

/// Either the address of a callable or a function pointer stored by value.
///
/// The slot does not know which of the two it holds. The invoke function that
/// was selected together with the slot does.
#[derive(Clone, Copy)]
pub(crate) union ViewSlot<S: Signature> {
    /// Address of a callable of some type `F`, obtained from a reference
    object: NonNull<Erased>,
    /// A plain function pointer of the declared signature
    function: S,
}

impl<S: Signature> ViewSlot<S> {
    /// A slot that holds nothing meaningful, used by empty views.
    #[inline]
    pub(super) const fn vacant() -> Self {
        Self {
            object: NonNull::dangling(),
        }
    }

    /// A slot holding the address of a callable.
    #[inline]
    pub(super) const fn object<F>(object: NonNull<F>) -> Self {
        Self {
            object: object.cast::<Erased>(),
        }
    }

    /// A slot holding a function pointer by value.
    #[inline]
    pub(super) const fn function(function: S) -> Self {
        Self { function }
    }
}

/// Signature of the invoke functions installed next to a [`ViewSlot`].
pub(crate) type ViewInvoke<S> =
    unsafe fn(ViewSlot<S>, <S as Signature>::Args) -> <S as Signature>::Output;

/// Calls the callable whose address is stored in the slot through `&self`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The slot was created by [`ViewSlot::object`] from a pointer to an `F`
/// 2. That `F` is alive and not mutably borrowed for the duration of the call
pub(super) unsafe fn invoke_object<S, F>(slot: ViewSlot<S>, args: S::Args) -> S::Output
where
    S: Signature,
    F: Callable<S>,
{
    // SAFETY:
    // 1. The slot holds the `object` field, guaranteed by the caller
    let object = unsafe { slot.object };
    let object = object.cast::<F>();

    // SAFETY:
    // 1. The pointer was created from a reference to an `F`, so it is aligned and
    //    non-null
    // 2. The pointee is alive and only shared for the duration of the call,
    //    guaranteed by the caller
    let object: &F = unsafe { object.as_ref() };
    object.call(args)
}

/// Calls the callable whose address is stored in the slot through `&mut self`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The slot was created by [`ViewSlot::object`] from a pointer to an `F`
///    that was derived from a mutable reference
/// 2. That `F` is alive and not otherwise borrowed for the duration of the call
pub(super) unsafe fn invoke_object_mut<S, F>(slot: ViewSlot<S>, args: S::Args) -> S::Output
where
    S: Signature,
    F: CallableMut<S>,
{
    // SAFETY:
    // 1. The slot holds the `object` field, guaranteed by the caller
    let object = unsafe { slot.object };
    let mut object = object.cast::<F>();

    // SAFETY:
    // 1. The pointer was created from a mutable reference to an `F`, so it is
    //    aligned, non-null and carries write permission
    // 2. No other reference to the pointee exists during the call, guaranteed by
    //    the caller
    let object: &mut F = unsafe { object.as_mut() };
    object.call_mut(args)
}

/// Calls the function pointer stored by value in the slot.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The slot was created by [`ViewSlot::function`]
pub(super) unsafe fn invoke_function<S>(slot: ViewSlot<S>, args: S::Args) -> S::Output
where
    S: Signature + Callable<S>,
{
    // SAFETY:
    // 1. The slot holds the `function` field, guaranteed by the caller
    let function: S = unsafe { slot.function };
    function.call(args)
}
