use fnerase_internals::{Callable, CallableMut};

/// A callable whose result is thrown away.
///
/// Closures, function items and function pointers only qualify for a
/// signature whose result type their own result converts [`Into`]. Wrapping
/// one in `Discard` makes it qualify for the same argument list with no
/// result at all, whatever it returns:
///
/// ```
/// use fnerase::prelude::*;
///
/// let add_one = |x: i32| x + 1;
///
/// let view: FuncView<'_, fn(i32)> = FuncView::new(Discard::from_ref(&add_one));
/// view.call(41);
///
/// let owned: UniqueFn<fn(i32)> = UniqueFn::new(Discard(add_one));
/// owned.call(41);
/// ```
///
/// Without the adapter the callable is rejected, since `i32` does not
/// convert into `()`:
///
/// ```compile_fail
/// use fnerase::prelude::*;
///
/// let owned: UniqueFn<fn(i32)> = UniqueFn::new(|x: i32| x + 1);
/// ```
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Discard<F>(pub F);

impl<F> Discard<F> {
    /// Views a borrowed callable as a `Discard` adapter.
    ///
    /// Lets a [`FuncView`](crate::FuncView) discard the result of a callable
    /// it borrows, without moving the callable.
    #[inline]
    #[must_use]
    pub const fn from_ref(callable: &F) -> &Self {
        // SAFETY: `Discard<F>` is `#[repr(transparent)]` over `F`, so both
        // have the same layout, and the lifetime of the borrow is kept
        unsafe { &*core::ptr::from_ref(callable).cast::<Self>() }
    }

    /// Views a mutably borrowed callable as a `Discard` adapter.
    ///
    /// Lets a [`FuncViewMut`](crate::FuncViewMut) discard the result of a
    /// callable it borrows, without moving the callable.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::{Discard, FuncViewMut};
    ///
    /// let mut log = Vec::new();
    /// let mut push = |line: &'static str| {
    ///     log.push(line);
    ///     log.len()
    /// };
    ///
    /// let mut view: FuncViewMut<'_, fn(&'static str)> =
    ///     FuncViewMut::new(Discard::from_mut(&mut push));
    /// view.call("started");
    /// view.call("stopped");
    /// assert_eq!(log, ["started", "stopped"]);
    /// ```
    #[inline]
    #[must_use]
    pub fn from_mut(callable: &mut F) -> &mut Self {
        // SAFETY: `Discard<F>` is `#[repr(transparent)]` over `F`, so both
        // have the same layout, and the exclusive borrow is kept
        unsafe { &mut *core::ptr::from_mut(callable).cast::<Self>() }
    }

    /// Returns the wrapped callable.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> F {
        self.0
    }
}

macro_rules! impl_discard {
    ($($arg:ident: $ty:ident),*) => {
        impl<F, O, $($ty),*> Callable<fn($($ty),*)> for Discard<F>
        where
            F: Fn($($ty),*) -> O,
        {
            #[inline]
            fn call(&self, ($($arg,)*): ($($ty,)*)) {
                (self.0)($($arg),*);
            }
        }

        impl<F, O, $($ty),*> CallableMut<fn($($ty),*)> for Discard<F>
        where
            F: FnMut($($ty),*) -> O,
        {
            #[inline]
            fn call_mut(&mut self, ($($arg,)*): ($($ty,)*)) {
                (self.0)($($arg),*);
            }
        }
    };
}

for_each_arity!(impl_discard);

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{FuncView, FuncViewMut, SharedFn, UniqueFn, markers::Mutable};

    #[test]
    fn test_discard_signatures() {
        assert_impl_all!(Discard<fn(i32) -> i32>: Callable<fn(i32)>, CallableMut<fn(i32)>);
        assert_impl_all!(Discard<fn(u8, u8)>: Callable<fn(u8, u8)>);
        assert_not_impl_any!(Discard<fn(i32) -> i32>: Callable<fn(i32) -> i32>);
        assert_not_impl_any!(Discard<fn(i32) -> i32>: Callable<fn(i64)>);
        assert_not_impl_any!(fn(i32) -> i32: Callable<fn(i32)>);
    }

    #[test]
    fn test_discard_in_every_wrapper() {
        let calls = AtomicUsize::new(0);
        let record = |x: usize| calls.fetch_add(x, Ordering::SeqCst);

        let view: FuncView<'_, fn(usize)> = FuncView::new(Discard::from_ref(&record));
        view.call(1);

        let owned: UniqueFn<'_, fn(usize)> = UniqueFn::new(Discard(record));
        owned.call(10);

        let shared: SharedFn<'_, fn(usize)> = SharedFn::new(Discard(record));
        shared.clone().call(100);

        assert_eq!(calls.load(Ordering::SeqCst), 111);
    }

    #[test]
    fn test_discard_mutable() {
        let mut total = 0u32;
        {
            let mut add = |x: u32| {
                total += x;
                total
            };
            let mut view: FuncViewMut<'_, fn(u32)> = FuncViewMut::new(Discard::from_mut(&mut add));
            view.call(40);
            view.call(2);
        }
        assert_eq!(total, 42);

        let mut count = 0u8;
        let mut bump: UniqueFn<'_, fn(), Mutable> = UniqueFn::new(Discard(move || {
            count += 1;
            count
        }));
        bump.call();
        bump.call();
        assert_eq!(Discard(7u8).into_inner(), 7);
    }
}
