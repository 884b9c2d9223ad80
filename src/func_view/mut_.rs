use core::{fmt, ptr::NonNull};

use fnerase_internals::{CallableMut, RawFuncView, Signature};

use crate::markers::{self, SendSync};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw` field
/// an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use fnerase_internals::{RawFuncView, Signature};

    use crate::markers::SendSync;

    /// A mutably borrowed, type-erased callable.
    ///
    /// [`FuncViewMut`] is the counterpart of [`FuncView`](crate::FuncView) for
    /// callables that need exclusive access to be called, such as closures
    /// that mutate their captures. It holds the mutable borrow for `'a`, so
    /// the callable cannot be touched while the view is in use.
    ///
    /// Unlike [`FuncView`](crate::FuncView) it is not `Copy`. Use
    /// [`reborrow`](FuncViewMut::reborrow) to pass it on without giving it
    /// away.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncViewMut;
    ///
    /// fn feed(mut sink: FuncViewMut<'_, fn(u32)>, values: &[u32]) {
    ///     for &value in values {
    ///         sink.call(value);
    ///     }
    /// }
    ///
    /// let mut total = 0;
    /// let mut add = |value: u32| total += value;
    /// feed(FuncViewMut::new(&mut add), &[40, 2]);
    /// assert_eq!(total, 42);
    /// ```
    // # Safety invariants
    //
    // This view behaves like a `&'a mut F` for some unknown `F`.
    pub struct FuncViewMut<'a, S: Signature, ThreadSafety: 'static = SendSync> {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. `T` must either be `SendSync` or `Local`.
        /// 2. If the view refers to a callable by address: the callable is
        ///    alive for `'a`, this view holds the only access to it, and it was
        ///    registered through the `&mut self` call path.
        /// 3. If `T = SendSync`: the callable is `Send`.
        raw: RawFuncView<S>,
        _lifetime: PhantomData<&'a mut ()>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<'a, S: Signature, T> FuncViewMut<'a, S, T> {
        /// Creates a new view from a raw view.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `T` must either be `SendSync` or `Local`.
        /// 2. If the view refers to a callable by address: the callable is
        ///    alive for `'a`, this view holds the only access to it, and it was
        ///    registered through the `&mut self` call path.
        /// 3. If `T = SendSync`: the callable is `Send`.
        #[must_use]
        pub(crate) const unsafe fn from_raw(raw: RawFuncView<S>) -> Self {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Guaranteed by our caller
            // 2. Guaranteed by our caller
            // 3. Guaranteed by our caller
            Self {
                raw,
                _lifetime: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        /// Returns a reference to the inner raw view.
        #[must_use]
        pub(crate) const fn as_raw(&self) -> &RawFuncView<S> {
            &self.raw
        }
    }
}

pub use limit_field_access::FuncViewMut;

impl<'a, S: Signature, T> FuncViewMut<'a, S, T> {
    /// Creates an empty view.
    ///
    /// Calling an empty view panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncViewMut;
    ///
    /// let view = FuncViewMut::<'_, fn()>::empty();
    /// assert!(!view.is_some());
    /// ```
    #[must_use]
    pub const fn empty() -> Self {
        // SAFETY:
        // 1. `T` is restricted by the constructors exposed to users
        // 2. An empty view refers to nothing
        // 3. An empty view refers to nothing
        unsafe { Self::from_raw(RawFuncView::empty()) }
    }

    /// Creates a view calling `callable` through `&mut self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncViewMut;
    ///
    /// let mut next = 40;
    /// let mut counter = || {
    ///     next += 1;
    ///     next
    /// };
    /// let mut view: FuncViewMut<'_, fn() -> i32> = FuncViewMut::new(&mut counter);
    /// view.call();
    /// assert_eq!(view.call(), 42);
    /// ```
    #[must_use]
    pub fn new<F>(callable: &'a mut F) -> Self
    where
        F: CallableMut<S> + markers::ObjectMarkerFor<T>,
    {
        let object = NonNull::from(callable);

        // SAFETY:
        // 1. `object` was derived from a mutable reference that lives for `'a`
        // 2. The returned view holds that borrow, and `call` takes `&mut self`,
        //    so the view cannot be called re-entrantly
        let raw = unsafe { RawFuncView::from_object_mut(object) };

        // SAFETY:
        // 1. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 2. `callable` is borrowed mutably for `'a`, and registered through the
        //    `&mut self` call path
        // 3. If `T = SendSync`: `F: ObjectMarkerFor<SendSync>` requires
        //    `F: Send + Sync`
        unsafe { Self::from_raw(raw) }
    }

    /// Creates a view holding a function pointer by value.
    #[must_use]
    pub const fn from_fn(function: S) -> Self
    where
        S: fnerase_internals::Callable<S>,
    {
        // SAFETY:
        // 1. `T` is restricted by the constructors exposed to users
        // 2. The view holds the function pointer itself, not an address
        // 3. Function pointers are `Send + Sync`
        unsafe { Self::from_raw(RawFuncView::from_function(function)) }
    }

    /// Returns `true` if the view refers to a callable.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        self.as_raw().is_some()
    }

    /// Reborrows the view for a shorter lifetime.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncViewMut;
    ///
    /// fn twice(mut f: FuncViewMut<'_, fn()>) {
    ///     f.call();
    ///     f.call();
    /// }
    ///
    /// let mut calls = 0;
    /// let mut bump = || calls += 1;
    /// let mut view: FuncViewMut<'_, fn()> = FuncViewMut::new(&mut bump);
    /// twice(view.reborrow());
    /// twice(view.reborrow());
    /// assert_eq!(calls, 4);
    /// ```
    #[must_use]
    pub fn reborrow<'b>(&'b mut self) -> FuncViewMut<'b, S, T> {
        // SAFETY:
        // 1. `T` is unchanged
        // 2. `self` is mutably borrowed for `'b`, so the new view holds the only
        //    access to the callable while it exists
        // 3. `T` is unchanged
        unsafe { FuncViewMut::from_raw(*self.as_raw()) }
    }

    /// Calls the callable with the arguments of the signature as a tuple.
    ///
    /// # Panics
    ///
    /// Panics if the view is empty.
    #[inline]
    #[track_caller]
    pub fn call_tuple(&mut self, args: S::Args) -> S::Output {
        // SAFETY:
        // 1. The callable, if any, is alive and exclusively borrowed by this
        //    view, guaranteed by the invariants of this type
        // 2. `self` is borrowed mutably, so the call is not re-entrant
        unsafe { self.as_raw().call(args) }
    }
}

macro_rules! impl_call {
    ($($arg:ident: $ty:ident),*) => {
        impl<'a, R, $($ty,)* T> FuncViewMut<'a, fn($($ty),*) -> R, T> {
            /// Calls the callable with the arguments of the signature.
            ///
            /// # Panics
            ///
            /// Panics if the view is empty.
            #[inline]
            #[track_caller]
            pub fn call(&mut self, $($arg: $ty),*) -> R {
                self.call_tuple(($($arg,)*))
            }
        }
    };
}

for_each_arity!(impl_call);

impl<'a, S: Signature, T> CallableMut<S> for FuncViewMut<'a, S, T> {
    #[inline]
    fn call_mut(&mut self, args: S::Args) -> S::Output {
        self.call_tuple(args)
    }
}

impl<'a, S: Signature, T> Default for FuncViewMut<'a, S, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, S: Signature, T> fmt::Debug for FuncViewMut<'a, S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncViewMut")
            .field("is_some", &self.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a, S: Signature> From<FuncViewMut<'a, S, SendSync>> for FuncViewMut<'a, S, markers::Local> {
    fn from(view: FuncViewMut<'a, S, SendSync>) -> Self {
        // SAFETY:
        // 1. `T = Local`
        // 2. `view` is consumed, so the new view takes over its exclusive access
        // 3. `T` is not `SendSync`
        unsafe { FuncViewMut::from_raw(*view.as_raw()) }
    }
}

// SAFETY: The `SendSync` marker indicates that the referenced callable is
// `Send + Sync`. The view holds the only access to it, like a `&mut F`.
unsafe impl<'a, S: Signature> Send for FuncViewMut<'a, S, SendSync> {}

// SAFETY: The `SendSync` marker indicates that the referenced callable is
// `Send + Sync`. A shared reference to the view cannot call the callable.
unsafe impl<'a, S: Signature> Sync for FuncViewMut<'a, S, SendSync> {}
