//! Marker types and traits for access and thread-safety semantics.
//!
//! These markers are used as generic parameters in types like
//! [`UniqueFn<'a, S, A, T>`](crate::UniqueFn) to encode at compile time which call
//! operator a wrapper exposes, and whether it may cross thread boundaries.
//!
//! # Design Philosophy
//!
//! The constraints encoded by these markers are enforced at construction time.
//! It is impossible to construct a wrapper that violates the invariants
//! associated with its marker types. This means you can trust that a
//! `UniqueFn<_, _, SendSync>` truly is `Send + Sync`, and that a
//! `UniqueFn<_, Const>` truly can be called through a shared reference.
//!
//! # Access Markers
//!
//! Access markers appear as the `A` type parameter of
//! [`UniqueFn<'a, S, A, T>`](crate::UniqueFn):
//!
//! - [`Const`]: The payload is called through `&self`, so the wrapper can be
//!   called through a shared reference
//! - [`Mutable`]: The payload is called through `&mut self`, so the wrapper
//!   needs exclusive access to be called
//! - [`Dual`]: The payload may have both call operators, with different
//!   behaviour. Calls through `&mut self` always work, calls through `&self`
//!   fail at run time when the payload has no such operator
//!
//! # Thread Safety Markers
//!
//! Thread safety markers appear as the last type parameter (`T`) of every
//! wrapper:
//!
//! - [`SendSync`]: The payload is `Send + Sync`, and so is the wrapper
//! - [`Local`]: The payload may be anything, and the wrapper is neither `Send`
//!   nor `Sync`
//!
//! # Examples
//!
//! ```
//! use std::{cell::Cell, rc::Rc};
//!
//! use fnerase::prelude::*;
//!
//! // Thread-safe wrapper, can be sent to another thread
//! let double: UniqueFn<fn(u32) -> u32> = UniqueFn::new(|x: u32| x * 2);
//! std::thread::spawn(move || assert_eq!(double.call(21), 42))
//!     .join()
//!     .unwrap();
//!
//! // Local wrapper holding an `Rc`
//! let counter = Rc::new(Cell::new(0u32));
//! let mut bump: UniqueFn<fn() -> u32, markers::Mutable, markers::Local> = UniqueFn::new({
//!     let counter = counter.clone();
//!     move || {
//!         counter.set(counter.get() + 1);
//!         counter.get()
//!     }
//! });
//! assert_eq!(bump.call(), 1);
//! assert_eq!(counter.get(), 1);
//! ```

use fnerase_internals::{AllocError, Callable, CallableMut, HeapAlloc, RawUniqueFn, Signature};

/// Marker type for wrappers called through `&self`.
///
/// Payloads of a `Const` wrapper implement [`Callable`]. Closures get that
/// implementation when they implement [`Fn`].
///
/// # Examples
///
/// ```
/// use fnerase::prelude::*;
///
/// let add: UniqueFn<fn(i32, i32) -> i32, markers::Const> = UniqueFn::new(|a: i32, b: i32| a + b);
/// let shared = &add;
/// assert_eq!(shared.call(40, 2), 42);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Const;

/// Marker type for wrappers called through `&mut self`.
///
/// Payloads of a `Mutable` wrapper implement [`CallableMut`]. Closures get that
/// implementation when they implement [`FnMut`], so closures mutating their
/// captures can be stored.
///
/// # Examples
///
/// ```
/// use fnerase::prelude::*;
///
/// let mut total = 0;
/// let mut sum: UniqueFn<fn(i32) -> i32, markers::Mutable> = UniqueFn::new(move |x: i32| {
///     total += x;
///     total
/// });
/// assert_eq!(sum.call(40), 40);
/// assert_eq!(sum.call(2), 42);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Mutable;

/// Marker type for wrappers exposing both call operators of their payload.
///
/// Calls through `&mut self` use the payload's [`CallableMut`]
/// implementation. Calls through `&self` use its [`Callable`] implementation,
/// and return [`ConstCallError`](crate::ConstCallError) if the wrapper was
/// created with [`UniqueFn::new_mut_only`](crate::UniqueFn::new_mut_only).
///
/// # Examples
///
/// ```
/// use fnerase::{Callable, CallableMut, prelude::*};
///
/// struct Offset(i32);
///
/// impl Callable<fn(i32) -> i32> for Offset {
///     fn call(&self, (x,): (i32,)) -> i32 {
///         self.0 + x
///     }
/// }
///
/// impl CallableMut<fn(i32) -> i32> for Offset {
///     fn call_mut(&mut self, (x,): (i32,)) -> i32 {
///         self.0 -= x;
///         self.0
///     }
/// }
///
/// let mut offset: UniqueFn<fn(i32) -> i32, markers::Dual> = UniqueFn::new(Offset(10));
/// assert_eq!(offset.call(1), Ok(11));
/// assert_eq!(offset.call_mut(1), 9);
/// assert_eq!(offset.call(1), Ok(10));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Dual;

/// Marker type indicating that a wrapper and its payload are `Send + Sync`.
///
/// This is the default thread-safety marker. Most callables are `Send + Sync`
/// already: function pointers, and closures capturing `Send + Sync` values.
///
/// # Examples
///
/// ```
/// use fnerase::prelude::*;
///
/// let greeting = String::from("hello");
/// let greet: SharedFn<fn() -> usize> = SharedFn::new(move || greeting.len());
///
/// let handle = std::thread::spawn({
///     let greet = greet.clone();
///     move || greet.call()
/// });
/// assert_eq!(handle.join().unwrap(), 5);
/// assert_eq!(greet.call(), 5);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SendSync;

/// Marker type indicating that a wrapper is not `Send` or `Sync`.
///
/// Use `Local` when the payload contains `Rc`, `Cell`, raw pointers or any
/// other type that is not `Send + Sync`.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
///
/// use fnerase::prelude::*;
///
/// let name = Rc::new(String::from("local"));
/// let len: UniqueFn<fn() -> usize, markers::Const, markers::Local> =
///     UniqueFn::new(move || name.len());
/// assert_eq!(len.call(), 5);
///
/// // This wrapper cannot be sent to another thread
/// // std::thread::spawn(move || len.call()); // ❌ Won't compile
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Local;

mod sealed_access_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for Const {}
    impl Sealed for Mutable {}
    impl Sealed for Dual {}
}

/// Marker trait for the call operator an owning wrapper exposes.
///
/// This trait is implemented for [`Const`], [`Mutable`] and [`Dual`]. It is
/// sealed and cannot be implemented outside of this crate.
pub trait AccessMarker: sealed_access_marker::Sealed {}

impl AccessMarker for Const {}
impl AccessMarker for Mutable {}
impl AccessMarker for Dual {}

/// Marker trait connecting an access marker with the payloads it accepts.
///
/// - [`Const`] accepts payloads implementing [`Callable<S>`]
/// - [`Mutable`] accepts payloads implementing [`CallableMut<S>`]
/// - [`Dual`] accepts payloads implementing both
///
/// A payload that does not provide the required call operator is rejected at
/// compile time:
///
/// ```compile_fail
/// use fnerase::prelude::*;
///
/// let mut count = 0;
/// // A closure mutating its captures is not `Fn`, so it has no `&self` call path
/// let f: UniqueFn<fn() -> i32, markers::Const> = UniqueFn::new(move || {
///     count += 1;
///     count
/// });
/// ```
pub trait AccessFor<S: Signature, F>: AccessMarker {
    /// Writes the payload produced by `init` into a new raw wrapper with the
    /// call paths of this access marker.
    #[doc(hidden)]
    fn emplace<'a, H, I>(
        init: I,
        alloc: H,
        force_external: bool,
    ) -> Result<RawUniqueFn<'a, S>, AllocError>
    where
        F: 'a,
        H: HeapAlloc + 'a,
        I: FnOnce() -> F;
}

impl<S, F> AccessFor<S, F> for Const
where
    S: Signature,
    F: Callable<S>,
{
    #[inline]
    fn emplace<'a, H, I>(
        init: I,
        alloc: H,
        force_external: bool,
    ) -> Result<RawUniqueFn<'a, S>, AllocError>
    where
        F: 'a,
        H: HeapAlloc + 'a,
        I: FnOnce() -> F,
    {
        RawUniqueFn::new_const(init, alloc, force_external)
    }
}

impl<S, F> AccessFor<S, F> for Mutable
where
    S: Signature,
    F: CallableMut<S>,
{
    #[inline]
    fn emplace<'a, H, I>(
        init: I,
        alloc: H,
        force_external: bool,
    ) -> Result<RawUniqueFn<'a, S>, AllocError>
    where
        F: 'a,
        H: HeapAlloc + 'a,
        I: FnOnce() -> F,
    {
        RawUniqueFn::new_mut(init, alloc, force_external)
    }
}

impl<S, F> AccessFor<S, F> for Dual
where
    S: Signature,
    F: Callable<S> + CallableMut<S>,
{
    #[inline]
    fn emplace<'a, H, I>(
        init: I,
        alloc: H,
        force_external: bool,
    ) -> Result<RawUniqueFn<'a, S>, AllocError>
    where
        F: 'a,
        H: HeapAlloc + 'a,
        I: FnOnce() -> F,
    {
        RawUniqueFn::new_dual(init, alloc, force_external)
    }
}

/// Marker trait combining object and thread-safety requirements.
///
/// This trait enforces thread-safety constraints for payloads (and the
/// allocators stored next to them) at construction time.
///
/// # Implementations
///
/// - For `T = Local`: Implemented for all `Sized` types, regardless of their
///   `Send`/`Sync` status.
/// - For `T = SendSync`: Implemented only for `Sized` types that are also
///   `Send + Sync`.
///
/// # Enforcement at Construction
///
/// You cannot create a wrapper with the [`SendSync`] marker around a payload
/// that is not `Send + Sync`:
///
/// ```compile_fail
/// use std::rc::Rc;
///
/// use fnerase::prelude::*;
///
/// let name = Rc::new(String::from("shared"));
/// let len: UniqueFn<fn() -> usize, markers::Const, markers::SendSync> =
///     UniqueFn::new(move || name.len());
/// ```
///
/// Use [`Local`] instead for non-thread-safe payloads:
///
/// ```
/// use std::rc::Rc;
///
/// use fnerase::prelude::*;
///
/// let name = Rc::new(String::from("shared"));
/// let len: UniqueFn<fn() -> usize, markers::Const, markers::Local> =
///     UniqueFn::new(move || name.len());
/// ```
pub trait ObjectMarkerFor<T>: Sized {}

impl<O: Sized> ObjectMarkerFor<Local> for O {}

impl<O: Sized> ObjectMarkerFor<SendSync> for O where O: Send + Sync {}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    #[test]
    fn test_object_markers() {
        assert_impl_all!(u8: ObjectMarkerFor<SendSync>, ObjectMarkerFor<Local>);
        assert_impl_all!(Rc<u8>: ObjectMarkerFor<Local>);
        assert_not_impl_any!(Rc<u8>: ObjectMarkerFor<SendSync>);
        assert_not_impl_any!(Cell<u8>: ObjectMarkerFor<SendSync>);
    }

    #[test]
    fn test_access_for() {
        type Sig = fn(u8) -> u8;

        assert_impl_all!(Const: AccessFor<Sig, fn(u8) -> u8>);
        assert_impl_all!(Mutable: AccessFor<Sig, fn(u8) -> u8>);
        assert_impl_all!(Dual: AccessFor<Sig, fn(u8) -> u8>);

        assert_not_impl_any!(Const: AccessFor<Sig, fn(u16) -> u8>);
        assert_not_impl_any!(Mutable: AccessFor<Sig, fn(u8) -> u16>);
    }

    #[test]
    fn test_markers_are_zero_sized() {
        assert_eq!(core::mem::size_of::<Const>(), 0);
        assert_eq!(core::mem::size_of::<Mutable>(), 0);
        assert_eq!(core::mem::size_of::<Dual>(), 0);
        assert_eq!(core::mem::size_of::<SendSync>(), 0);
        assert_eq!(core::mem::size_of::<Local>(), 0);
    }
}
