use core::{fmt, ptr::NonNull};

use fnerase_internals::{Callable, RawFuncView, Signature};

use crate::markers::{self, SendSync};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw` field
/// an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use fnerase_internals::{RawFuncView, Signature};

    use crate::markers::SendSync;

    /// A borrowed, type-erased callable.
    ///
    /// [`FuncView`] refers to a callable that lives elsewhere, or holds a plain
    /// function pointer by value, and calls it through `&self`. It never owns
    /// anything and never allocates.
    ///
    /// # Key Characteristics
    ///
    /// - **Two words**: one for the callable's address (or the function
    ///   pointer), one for the invoke function
    /// - **Always `Copy` + `Clone`**: copies call the same callable
    /// - **Lifetime-bound**: a view built with [`new`](FuncView::new) cannot
    ///   outlive the callable it borrows
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncView;
    ///
    /// let base = 40;
    /// let add = |x: i32| base + x;
    /// let view: FuncView<'_, fn(i32) -> i32> = FuncView::new(&add);
    /// assert_eq!(view.call(2), 42);
    ///
    /// fn apply(f: FuncView<'_, fn(i32) -> i32>, x: i32) -> i32 {
    ///     f.call(x)
    /// }
    /// assert_eq!(apply(view, 0), 40);
    /// ```
    ///
    /// Binding a view to a temporary is rejected, since the temporary is gone
    /// before the view could be used:
    ///
    /// ```compile_fail
    /// use fnerase::FuncView;
    ///
    /// fn make_adder(base: i32) -> impl Fn(i32) -> i32 {
    ///     move |x| base + x
    /// }
    ///
    /// let view: FuncView<'_, fn(i32) -> i32> = FuncView::new(&make_adder(40));
    /// assert_eq!(view.call(2), 42);
    /// ```
    // # Safety invariants
    //
    // This view behaves like a `&'a F` for some unknown `F`, and upholds the
    // usual safety invariants of shared references:
    //
    // 1. The callable is alive for the entire lifetime `'a`.
    // 2. The callable is not mutably borrowed for the entire lifetime `'a`.
    pub struct FuncView<'a, S: Signature, ThreadSafety: 'static = SendSync> {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. `T` must either be `SendSync` or `Local`.
        /// 2. If the view refers to a callable by address: the callable is
        ///    alive and not mutably borrowed for the lifetime `'a`, and it was
        ///    registered through the `&self` call path.
        /// 3. If `T = SendSync`: the callable is `Send + Sync`.
        raw: RawFuncView<S>,
        _lifetime: PhantomData<&'a ()>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<'a, S: Signature, T> FuncView<'a, S, T> {
        /// Creates a new view from a raw view.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `T` must either be `SendSync` or `Local`.
        /// 2. If the view refers to a callable by address: the callable is
        ///    alive and not mutably borrowed for the lifetime `'a`, and it was
        ///    registered through the `&self` call path.
        /// 3. If `T = SendSync`: the callable is `Send + Sync`.
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

pub use limit_field_access::FuncView;

impl<'a, S: Signature, T> FuncView<'a, S, T> {
    /// Creates an empty view.
    ///
    /// Calling an empty view panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncView;
    ///
    /// let view = FuncView::<'_, fn() -> u8>::empty();
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

    /// Creates a view calling `callable` through `&self`.
    ///
    /// The view borrows `callable` for `'a`. Any type implementing
    /// [`Callable<S>`] is accepted: closures and function items implementing
    /// [`Fn`] with matching arguments and a result convertible into the
    /// declared one, and call objects.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncView;
    ///
    /// fn half(x: u32) -> u32 {
    ///     x / 2
    /// }
    ///
    /// // The result of `half` widens to `u64`
    /// let view: FuncView<'_, fn(u32) -> u64> = FuncView::new(&half);
    /// assert_eq!(view.call(84), 42u64);
    /// ```
    #[must_use]
    pub fn new<F>(callable: &'a F) -> Self
    where
        F: Callable<S> + markers::ObjectMarkerFor<T>,
    {
        let object = NonNull::from(callable);

        // SAFETY:
        // 1. The borrow of `callable` lives for `'a`, which the returned view
        //    carries, so no mutable reference can exist while the view is used
        let raw = unsafe { RawFuncView::from_object(object) };

        // SAFETY:
        // 1. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 2. `callable` is borrowed immutably for `'a`, and registered through the
        //    `&self` call path
        // 3. If `T = SendSync`: `F: ObjectMarkerFor<SendSync>` requires
        //    `F: Send + Sync`
        unsafe { Self::from_raw(raw) }
    }

    /// Creates a view holding a function pointer by value.
    ///
    /// Such a view refers to nothing, so it may be given any lifetime, up to
    /// `'static`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::FuncView;
    ///
    /// fn negate(x: i64) -> i64 {
    ///     -x
    /// }
    ///
    /// let view: FuncView<'static, fn(i64) -> i64> = FuncView::from_fn(negate);
    /// assert_eq!(view.call(-42), 42);
    /// ```
    #[must_use]
    pub const fn from_fn(function: S) -> Self
    where
        S: Callable<S>,
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

    /// Calls the callable with the arguments of the signature as a tuple.
    ///
    /// This is what the positional `call` methods forward to.
    ///
    /// # Panics
    ///
    /// Panics if the view is empty.
    #[inline]
    #[track_caller]
    pub fn call_tuple(&self, args: S::Args) -> S::Output {
        // SAFETY:
        // 1. The callable, if any, is alive and not mutably borrowed for `'a`,
        //    guaranteed by the invariants of this type
        unsafe { self.as_raw().call(args) }
    }

    /// Changes the thread-safety marker of the view to [`Local`].
    ///
    /// [`Local`]: markers::Local
    #[must_use]
    pub const fn into_local(self) -> FuncView<'a, S, markers::Local> {
        // SAFETY:
        // 1. `T = Local`
        // 2. The same callable is referred to, for the same lifetime
        // 3. `T` is not `SendSync`
        unsafe { FuncView::from_raw(*self.as_raw()) }
    }
}

macro_rules! impl_call {
    ($($arg:ident: $ty:ident),*) => {
        impl<'a, R, $($ty,)* T> FuncView<'a, fn($($ty),*) -> R, T> {
            /// Calls the callable with the arguments of the signature.
            ///
            /// # Panics
            ///
            /// Panics if the view is empty.
            #[inline]
            #[track_caller]
            pub fn call(&self, $($arg: $ty),*) -> R {
                self.call_tuple(($($arg,)*))
            }
        }
    };
}

for_each_arity!(impl_call);

impl<'a, S: Signature, T> Callable<S> for FuncView<'a, S, T> {
    #[inline]
    fn call(&self, args: S::Args) -> S::Output {
        self.call_tuple(args)
    }
}

impl<'a, S: Signature, T> Copy for FuncView<'a, S, T> {}

impl<'a, S: Signature, T> Clone for FuncView<'a, S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: Signature, T> Default for FuncView<'a, S, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, S: Signature, T> fmt::Debug for FuncView<'a, S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncView")
            .field("is_some", &self.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a, S: Signature> From<FuncView<'a, S, SendSync>> for FuncView<'a, S, markers::Local> {
    fn from(view: FuncView<'a, S, SendSync>) -> Self {
        view.into_local()
    }
}

// SAFETY: The `SendSync` marker indicates that the referenced callable is
// `Send + Sync`. A view only gives shared access to it, which is safe to do
// from any thread.
unsafe impl<'a, S: Signature> Send for FuncView<'a, S, SendSync> {}

// SAFETY: The `SendSync` marker indicates that the referenced callable is
// `Send + Sync`. A view only gives shared access to it, which is safe to do
// from any thread.
unsafe impl<'a, S: Signature> Sync for FuncView<'a, S, SendSync> {}
