use core::{
    fmt,
    ops::{Deref, DerefMut},
};

#[cfg(feature = "std")]
use std::sync as impl_;

#[cfg(not(feature = "std"))]
use spin as impl_;

use fnerase_internals::{Callable, CallableMut, Signature};

/// A callable behind a lock, so it can be called through `&self`.
///
/// [`Exclusive`] turns any [`CallableMut`] into a [`Callable`]: every call
/// locks the callable for its duration. This is how a
/// [`SharedFn`](crate::SharedFn) shares callables that mutate their state,
/// and every clone of the shared wrapper observes the same state.
///
/// With the `std` feature the lock is a [`std::sync::Mutex`], otherwise a
/// spin lock from the [`spin`] crate. A callable that calls its own shared
/// wrapper re-entrantly deadlocks.
///
/// # Examples
///
/// ```
/// use fnerase::{Callable, Exclusive};
///
/// let mut total = 0;
/// let add = Exclusive::new(move |x: i32| {
///     total += x;
///     total
/// });
///
/// assert_eq!(Callable::<fn(i32) -> i32>::call(&add, (40,)), 40);
/// assert_eq!(Callable::<fn(i32) -> i32>::call(&add, (2,)), 42);
/// ```
#[repr(transparent)]
pub struct Exclusive<F>(impl_::Mutex<F>);

/// The guard returned by [`Exclusive::lock`].
///
/// The callable stays locked until the guard is dropped.
#[repr(transparent)]
pub struct ExclusiveGuard<'a, F>(impl_::MutexGuard<'a, F>);

impl<F> Exclusive<F> {
    /// Wraps `callable` in a lock.
    #[must_use]
    pub const fn new(callable: F) -> Self {
        Self(impl_::Mutex::new(callable))
    }

    /// Locks the callable, blocking until it is available.
    ///
    /// A panic while the lock was held does not poison it.
    #[inline]
    pub fn lock(&self) -> ExclusiveGuard<'_, F> {
        #[cfg(not(feature = "std"))]
        let guard = self.0.lock();

        #[cfg(feature = "std")]
        let guard = self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        ExclusiveGuard(guard)
    }

    /// Returns the callable without locking, since `&mut self` guarantees no
    /// other access exists.
    #[inline]
    pub fn get_mut(&mut self) -> &mut F {
        #[cfg(not(feature = "std"))]
        let callable = self.0.get_mut();

        #[cfg(feature = "std")]
        let callable = self.0.get_mut().unwrap_or_else(std::sync::PoisonError::into_inner);

        callable
    }

    /// Consumes the lock and returns the callable.
    #[inline]
    pub fn into_inner(self) -> F {
        #[cfg(not(feature = "std"))]
        let callable = self.0.into_inner();

        #[cfg(feature = "std")]
        let callable = self.0.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);

        callable
    }
}

impl<S: Signature, F: CallableMut<S>> Callable<S> for Exclusive<F> {
    #[inline]
    fn call(&self, args: S::Args) -> S::Output {
        CallableMut::<S>::call_mut(&mut *self.lock(), args)
    }
}

impl<F> Deref for ExclusiveGuard<'_, F> {
    type Target = F;

    #[inline]
    fn deref(&self) -> &F {
        &self.0
    }
}

impl<F> DerefMut for ExclusiveGuard<'_, F> {
    #[inline]
    fn deref_mut(&mut self) -> &mut F {
        &mut self.0
    }
}

impl<F: Default> Default for Exclusive<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F> fmt::Debug for Exclusive<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exclusive").finish_non_exhaustive()
    }
}

impl<F> fmt::Debug for ExclusiveGuard<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{vec, vec::Vec};
    use core::cell::Cell;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    #[test]
    fn test_exclusive_thread_safety() {
        // Only `Send` is needed to share a locked callable
        assert_impl_all!(Exclusive<Cell<u8>>: Send, Sync);
        assert_not_impl_any!(Exclusive<*const u8>: Send, Sync);
    }

    #[test]
    fn test_exclusive_calls_through_shared_reference() {
        let mut log = Vec::new();
        let record = Exclusive::new(move |x: u8| {
            log.push(x);
            log.len()
        });
        assert_eq!(Callable::<fn(u8) -> usize>::call(&record, (1,)), 1);
        assert_eq!(Callable::<fn(u8) -> usize>::call(&record, (2,)), 2);
    }

    #[test]
    fn test_exclusive_access() {
        let mut values = Exclusive::new(vec![1, 2]);
        values.lock().push(3);
        values.get_mut().push(4);
        assert_eq!(*values.lock(), [1, 2, 3, 4]);
        assert_eq!(values.into_inner(), [1, 2, 3, 4]);
    }
}
