//! The type-erased, non-owning callable handle.
//!
//! This module encapsulates the `slot` and `invoke` fields of
//! [`RawFuncView`], ensuring they can only be set together. This guarantees
//! the safety invariant: **the invoke function always matches the contents of
//! the slot**.
//!
//! # Safety Invariant
//!
//! The constructors pair each way of filling the slot with the invoke function
//! instantiated for it, and the fields are never modified afterwards. The
//! lifetime of the referenced callable is not tracked here: the typed views in
//! the `fnerase` crate carry it.

use core::ptr::NonNull;

use crate::{
    signature::{Callable, CallableMut, Signature},
    util,
    view::slot::{self, ViewInvoke, ViewSlot},
};

/// A view over a callable whose type has been erased.
///
/// Holds either the address of a callable living elsewhere or a function
/// pointer by value, together with the matching invoke function. It never owns
/// anything, so it is `Copy` and has no drop glue.
#[derive(Clone, Copy)]
pub struct RawFuncView<S: Signature> {
    /// The address of the callable, or the function pointer itself
    slot: ViewSlot<S>,
    /// The invoke function matching `slot`
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. If this is `None`, the view is empty and the slot is never read.
    /// 2. If this is `Some`, it is one of the invoke functions in
    ///    [`slot`](crate::view::slot) instantiated for the exact way the slot
    ///    was filled.
    invoke: Option<ViewInvoke<S>>,
}

impl<S: Signature> RawFuncView<S> {
    /// Creates an empty view.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            slot: ViewSlot::vacant(),
            invoke: None,
        }
    }

    /// Creates a view that calls `*object` through `&self`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that, every time the view is called:
    ///
    /// 1. `object` points to a live `F`
    /// 2. No mutable reference to that `F` exists
    #[inline]
    pub const unsafe fn from_object<F: Callable<S>>(object: NonNull<F>) -> Self {
        Self {
            slot: ViewSlot::object(object),
            invoke: Some(slot::invoke_object::<S, F>),
        }
    }

    /// Creates a view that calls `*object` through `&mut self`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that, every time the view is called:
    ///
    /// 1. `object` was derived from a mutable reference and points to a live `F`
    /// 2. No other reference to that `F` exists, and the view is not called
    ///    re-entrantly
    #[inline]
    pub const unsafe fn from_object_mut<F: CallableMut<S>>(object: NonNull<F>) -> Self {
        Self {
            slot: ViewSlot::object(object),
            invoke: Some(slot::invoke_object_mut::<S, F>),
        }
    }

    /// Creates a view that calls a function pointer stored by value.
    #[inline]
    pub const fn from_function(function: S) -> Self
    where
        S: Callable<S>,
    {
        Self {
            slot: ViewSlot::function(function),
            invoke: Some(slot::invoke_function::<S>),
        }
    }

    /// Returns `true` if the view refers to a callable.
    #[inline]
    pub const fn is_some(&self) -> bool {
        self.invoke.is_some()
    }

    /// Calls the referenced callable.
    ///
    /// # Panics
    ///
    /// Panics if the view is empty.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the requirements of the constructor that
    /// created this view still hold.
    #[inline]
    #[track_caller]
    pub unsafe fn call(&self, args: S::Args) -> S::Output {
        let Some(invoke) = self.invoke else {
            util::called_empty()
        };

        // SAFETY:
        // 1. `invoke` matches the contents of the slot, guaranteed by the
        //    invariants of this type
        // 2. The referenced callable is valid to call, guaranteed by the caller
        unsafe { invoke(self.slot, args) }
    }
}

impl<S: Signature> Default for RawFuncView<S> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature> core::fmt::Debug for RawFuncView<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawFuncView")
            .field("is_some", &self.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_func_view_size() {
        assert_eq!(
            core::mem::size_of::<RawFuncView<fn(i32) -> i32>>(),
            2 * core::mem::size_of::<usize>()
        );
        assert_eq!(
            core::mem::size_of::<RawFuncView<fn(u64, u64, u64) -> [u64; 8]>>(),
            2 * core::mem::size_of::<usize>()
        );
    }

    #[test]
    fn test_raw_func_view_empty() {
        let view = RawFuncView::<fn() -> u8>::default();
        assert!(!view.is_some());
        assert!(RawFuncView::from_function((|| 1) as fn() -> u8).is_some());
    }

    #[test]
    #[should_panic(expected = "called an empty callable wrapper")]
    fn test_raw_func_view_empty_call_panics() {
        let view = RawFuncView::<fn() -> u8>::empty();
        // SAFETY: An empty view has no callable to keep alive
        let _ = unsafe { view.call(()) };
    }

    #[test]
    fn test_raw_func_view_object() {
        let values = [1, 2, 3];
        let sum = |offset: i32| values.iter().sum::<i32>() + offset;
        let view = {
            // SAFETY: `sum` outlives every call below and is never mutated
            unsafe { RawFuncView::<fn(i32) -> i32>::from_object(NonNull::from(&sum)) }
        };
        let copy = view;
        // SAFETY: `sum` is still alive
        assert_eq!(unsafe { view.call((36,)) }, 42);
        // SAFETY: `sum` is still alive
        assert_eq!(unsafe { copy.call((0,)) }, 6);
    }

    #[test]
    fn test_raw_func_view_object_mut() {
        let mut calls = 0;
        let mut count = |step: u32| {
            calls += step;
            calls
        };
        let view = {
            // SAFETY: `count` is only accessed through the view until it is
            // dropped
            unsafe { RawFuncView::<fn(u32) -> u32>::from_object_mut(NonNull::from(&mut count)) }
        };
        // SAFETY: `count` is alive and not otherwise borrowed
        assert_eq!(unsafe { view.call((1,)) }, 1);
        // SAFETY: `count` is alive and not otherwise borrowed
        assert_eq!(unsafe { view.call((2,)) }, 3);
    }
}
