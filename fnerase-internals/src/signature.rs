//! Call signatures and the two call paths a wrapped callable can expose.
//!
//! A wrapper is declared over a [`Signature`], which is always a function
//! pointer type such as `fn(i32, &'static str) -> bool`. A callable qualifies
//! for that signature when it implements [`Callable`] (invoked through `&self`)
//! or [`CallableMut`] (invoked through `&mut self`) for it.
//!
//! Closures, function items and function pointers get both traits for free:
//!
//! - arguments must match the declared argument types exactly;
//! - the result only has to convert [`Into`] the declared result type.
//!
//! A result the signature has no room for is dropped by wrapping the callable
//! in the `Discard` adapter of the `fnerase` crate.
//!
//! Call objects implement the traits themselves. An implementation can be
//! generic over the signature to accept every argument type that converts into
//! the one it really needs, which is how a call object is made usable from
//! wrappers with narrower argument types.
//!
//! # Examples
//!
//! ```
//! use fnerase_internals::{Callable, CallableMut};
//!
//! struct Offset {
//!     base: i64,
//! }
//!
//! impl<X: Into<i64>> Callable<fn(X) -> i64> for Offset {
//!     fn call(&self, (x,): (X,)) -> i64 {
//!         self.base + x.into()
//!     }
//! }
//!
//! impl CallableMut<fn(i64) -> i64> for Offset {
//!     fn call_mut(&mut self, (x,): (i64,)) -> i64 {
//!         self.base += x;
//!         self.base
//!     }
//! }
//!
//! let mut offset = Offset { base: 40 };
//! assert_eq!(Callable::<fn(i16) -> i64>::call(&offset, (2,)), 42);
//! assert_eq!(CallableMut::<fn(i64) -> i64>::call_mut(&mut offset, (2,)), 42);
//! ```

/// A function pointer type used as the declared signature of a wrapper.
///
/// Implemented for `fn(A1, .., An) -> R` with up to six arguments. Argument
/// types that contain references need a named lifetime (`fn(&'a str)`), since
/// higher-ranked function pointer types are distinct types.
pub trait Signature: Copy {
    /// The argument list as a tuple.
    type Args;
    /// The declared result type.
    type Output;
}

/// A callable that can be invoked through a shared reference.
///
/// This is the const call path: the call operator does not need exclusive
/// access to the callable, so it may be invoked from any number of shared
/// references.
pub trait Callable<S: Signature> {
    /// Calls the callable with the argument tuple of the signature.
    fn call(&self, args: S::Args) -> S::Output;
}

/// A callable that needs exclusive access to be invoked.
///
/// This is the non-const call path: the call operator may mutate the state of
/// the callable.
pub trait CallableMut<S: Signature> {
    /// Calls the callable with the argument tuple of the signature.
    fn call_mut(&mut self, args: S::Args) -> S::Output;
}

/// Implements [`Signature`] for a function pointer arity, together with the
/// blanket [`Callable`] and [`CallableMut`] implementations for closures.
macro_rules! impl_signature {
    ($($arg:ident),*) => {
        impl<R, $($arg),*> Signature for fn($($arg),*) -> R {
            type Args = ($($arg,)*);
            type Output = R;
        }

        impl<Func, R, O, $($arg),*> Callable<fn($($arg),*) -> R> for Func
        where
            Func: Fn($($arg),*) -> O,
            O: Into<R>,
        {
            #[inline]
            #[allow(non_snake_case)]
            fn call(&self, ($($arg,)*): ($($arg,)*)) -> R {
                self($($arg),*).into()
            }
        }

        impl<Func, R, O, $($arg),*> CallableMut<fn($($arg),*) -> R> for Func
        where
            Func: FnMut($($arg),*) -> O,
            O: Into<R>,
        {
            #[inline]
            #[allow(non_snake_case)]
            fn call_mut(&mut self, ($($arg,)*): ($($arg,)*)) -> R {
                self($($arg),*).into()
            }
        }
    };
}

impl_signature!();
impl_signature!(A1);
impl_signature!(A1, A2);
impl_signature!(A1, A2, A3);
impl_signature!(A1, A2, A3, A4);
impl_signature!(A1, A2, A3, A4, A5);
impl_signature!(A1, A2, A3, A4, A5, A6);
