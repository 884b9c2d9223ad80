use core::{fmt, ptr::NonNull};

use fnerase_internals::{Callable, CallableMut, RawFuncView, Signature};
use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    FuncView,
    markers::{self, Local, SendSync},
    shared_fn::Exclusive,
};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `view`
/// field an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use fnerase_internals::{RawFuncView, Signature};
    use triomphe::Arc;

    use super::Keepalive;
    use crate::markers::SendSync;

    /// A reference-counted, type-erased callable.
    ///
    /// [`SharedFn`] calls a callable that lives inside an [`Arc`]. Clones are
    /// cheap (one atomic increment) and call the same callable; the callable
    /// is dropped together with the last clone.
    ///
    /// Calls always go through `&self`. Callables that need `&mut self` are
    /// shared through [`SharedFn::new_mut`], which puts them behind an
    /// [`Exclusive`](crate::Exclusive) lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let suffix = String::from("!");
    /// let shout: SharedFn<fn(&'static str) -> String> =
    ///     SharedFn::new(move |s: &'static str| s.to_uppercase() + &suffix);
    ///
    /// let copy = shout.clone();
    /// drop(shout);
    /// assert_eq!(copy.call("hi"), "HI!");
    /// ```
    ///
    /// The lifetime `'a` bounds everything the shared callable borrows, so
    /// callables capturing references to locals can be shared too:
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let limit = 10;
    /// let small: SharedFn<'_, fn(i32) -> bool> = SharedFn::new(|x: i32| x < limit);
    /// let other = small.clone();
    /// assert!(small.call(3));
    /// assert!(!other.call(30));
    /// ```
    pub struct SharedFn<'a, S: Signature, ThreadSafety: 'static = SendSync> {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. `T` must either be `SendSync` or `Local`.
        /// 2. If the view refers to a callable by address: the callable lives
        ///    inside the allocation kept alive by `owner`, no mutable reference
        ///    to it is ever created, and it was registered through the `&self`
        ///    call path. Otherwise the view is empty or holds a function
        ///    pointer, or the callable is borrowed for `'a`.
        /// 3. If `T = SendSync`: the callable is `Send + Sync`.
        view: RawFuncView<S>,
        /// Keeps the callable referred to by `view` alive
        owner: Option<Arc<dyn Keepalive + 'a>>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<'a, S: Signature, T> SharedFn<'a, S, T> {
        /// Creates a new shared wrapper from a raw view and its owner.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `T` must either be `SendSync` or `Local`.
        /// 2. If the view refers to a callable by address: the callable lives
        ///    inside the allocation kept alive by `owner`, no mutable reference
        ///    to it is ever created, and it was registered through the `&self`
        ///    call path. Otherwise the view is empty or holds a function
        ///    pointer, or the callable is borrowed for `'a`.
        /// 3. If `T = SendSync`: the callable is `Send + Sync`.
        #[must_use]
        pub(crate) const unsafe fn from_parts(
            view: RawFuncView<S>,
            owner: Option<Arc<dyn Keepalive + 'a>>,
        ) -> Self {
            // SAFETY: We must uphold the safety invariants of the view field:
            // 1. Guaranteed by our caller
            // 2. Guaranteed by our caller
            // 3. Guaranteed by our caller
            Self {
                view,
                owner,
                _thread_safety: PhantomData,
            }
        }

        /// Returns a reference to the inner raw view.
        #[must_use]
        pub(crate) const fn as_raw(&self) -> &RawFuncView<S> {
            &self.view
        }

        /// Returns a reference to the owner of the callable.
        #[must_use]
        pub(crate) const fn owner(&self) -> Option<&Arc<dyn Keepalive + 'a>> {
            self.owner.as_ref()
        }

        /// Consumes the wrapper and returns its raw view and owner.
        #[must_use]
        pub(crate) fn into_parts(self) -> (RawFuncView<S>, Option<Arc<dyn Keepalive + 'a>>) {
            (self.view, self.owner)
        }
    }
}

pub use limit_field_access::SharedFn;

/// Anything an [`Arc`] owner can hold.
///
/// Owners are only ever cloned and dropped, so the trait has no methods and
/// is implemented for every type.
pub(crate) trait Keepalive {}

impl<T: ?Sized> Keepalive for T {}

impl<'a, S: Signature, T> SharedFn<'a, S, T> {
    /// Creates an empty shared wrapper.
    ///
    /// Calling an empty wrapper panics.
    #[must_use]
    pub const fn empty() -> Self {
        // SAFETY:
        // 1. `T` is restricted by the constructors exposed to users
        // 2. The view is empty
        // 3. The view is empty
        unsafe { Self::from_parts(RawFuncView::empty(), None) }
    }

    /// Creates a shared wrapper calling the callable inside `arc`.
    ///
    /// The wrapper keeps a clone of `arc`, so other holders of the `Arc` keep
    /// sharing the callable with it.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::SharedFn;
    /// use triomphe::Arc;
    ///
    /// let double = Arc::new(|x: u32| x * 2);
    /// let f: SharedFn<fn(u32) -> u32> = SharedFn::from_arc(Arc::clone(&double));
    /// assert_eq!(f.call(21), 42);
    /// assert_eq!((*double)(4), 8);
    /// ```
    #[must_use]
    pub fn from_arc<F>(arc: Arc<F>) -> Self
    where
        F: Callable<S> + markers::ObjectMarkerFor<T> + 'a,
    {
        let object = NonNull::from(&*arc);

        // SAFETY:
        // 1. `arc` is stored in the returned wrapper, so the callable outlives
        //    every call made through it
        // 2. The callable is shared through an `Arc` that is never unwrapped
        //    mutably by this crate, so no mutable reference to it exists
        let view = unsafe { RawFuncView::from_object(object) };
        let owner = arc.unsize(unsize::Coercion!(to dyn Keepalive));

        // SAFETY:
        // 1. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 2. The callable lives inside `owner` and was registered through the
        //    `&self` call path
        // 3. If `T = SendSync`: `F: ObjectMarkerFor<SendSync>` requires
        //    `F: Send + Sync`
        unsafe { Self::from_parts(view, Some(owner)) }
    }

    /// Creates a shared wrapper holding a function pointer by value.
    ///
    /// No allocation is made.
    #[must_use]
    pub const fn from_fn(function: S) -> Self
    where
        S: Callable<S>,
    {
        // SAFETY:
        // 1. `T` is restricted by the constructors exposed to users
        // 2. The view holds the function pointer itself
        // 3. Function pointers are `Send + Sync`
        unsafe { Self::from_parts(RawFuncView::from_function(function), None) }
    }

    /// Creates a shared wrapper from a view.
    ///
    /// The view is copied and nothing is allocated. The wrapper borrows the
    /// callable of the view for as long as the view did.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::{FuncView, SharedFn};
    ///
    /// static OFFSET: fn(i32) -> i32 = |x| x + 40;
    ///
    /// let view: FuncView<'static, fn(i32) -> i32> = FuncView::new(&OFFSET);
    /// let f = SharedFn::from_view(view);
    /// assert_eq!(f.call(2), 42);
    /// ```
    #[must_use]
    pub const fn from_view(view: FuncView<'a, S, T>) -> Self {
        // SAFETY:
        // 1. `T` is unchanged
        // 2. The callable of the view, if any, is borrowed for `'a` and
        //    was registered through the `&self` call path
        // 3. `T` is unchanged
        unsafe { Self::from_parts(*view.as_raw(), None) }
    }

    /// Moves `callable` into a new [`Arc`] and shares it.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// fn add_42(x: i32) -> i32 {
    ///     x + 42
    /// }
    ///
    /// let f: SharedFn<fn(i32) -> i32> = SharedFn::new(add_42);
    /// let g = f.clone();
    /// assert_eq!(f.call(0), g.call(0));
    /// ```
    #[must_use]
    pub fn new<F>(callable: F) -> Self
    where
        F: Callable<S> + markers::ObjectMarkerFor<T> + 'a,
    {
        Self::from_arc(Arc::new(callable))
    }

    /// Moves a callable that needs `&mut self` into a new [`Arc`], behind an
    /// [`Exclusive`] lock, and shares it.
    ///
    /// All clones of the wrapper call the same callable and observe the same
    /// state.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let mut next = 0u64;
    /// let ids: SharedFn<fn() -> u64> = SharedFn::new_mut(move || {
    ///     next += 1;
    ///     next
    /// });
    ///
    /// let other = ids.clone();
    /// assert_eq!(ids.call(), 1);
    /// assert_eq!(other.call(), 2);
    /// assert_eq!(ids.call(), 3);
    /// ```
    #[must_use]
    pub fn new_mut<F>(callable: F) -> Self
    where
        F: CallableMut<S> + 'a,
        Exclusive<F>: markers::ObjectMarkerFor<T>,
    {
        Self::from_exclusive(Arc::new(Exclusive::new(callable)))
    }

    /// Shares a callable that already lives behind an [`Exclusive`] lock.
    ///
    /// The caller may keep its own clone of `arc` and lock the callable to
    /// inspect its state.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::{CallableMut, Exclusive, SharedFn};
    /// use triomphe::Arc;
    ///
    /// struct Log(Vec<&'static str>);
    ///
    /// impl CallableMut<fn(&'static str)> for Log {
    ///     fn call_mut(&mut self, (line,): (&'static str,)) {
    ///         self.0.push(line);
    ///     }
    /// }
    ///
    /// let log = Arc::new(Exclusive::new(Log(Vec::new())));
    /// let f: SharedFn<fn(&'static str)> = SharedFn::from_exclusive(Arc::clone(&log));
    /// f.call("first");
    /// f.clone().call("second");
    /// assert_eq!(log.lock().0, ["first", "second"]);
    /// ```
    #[must_use]
    pub fn from_exclusive<F>(arc: Arc<Exclusive<F>>) -> Self
    where
        F: CallableMut<S> + 'a,
        Exclusive<F>: markers::ObjectMarkerFor<T>,
    {
        Self::from_arc(arc)
    }

    /// Returns a view of the shared callable, borrowing this wrapper.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::{FuncView, SharedFn};
    ///
    /// fn apply(f: FuncView<'_, fn(u8) -> u8>) -> u8 {
    ///     f.call(21)
    /// }
    ///
    /// let f: SharedFn<fn(u8) -> u8> = SharedFn::new(|x: u8| x * 2);
    /// assert_eq!(apply(f.view()), 42);
    /// ```
    #[must_use]
    pub const fn view(&self) -> FuncView<'_, S, T> {
        // SAFETY:
        // 1. `T` is unchanged
        // 2. The callable, if any, is kept alive by `self.owner` while `self` is
        //    borrowed, is never borrowed mutably, and was registered through the
        //    `&self` call path
        // 3. `T` is unchanged
        unsafe { FuncView::from_raw(*self.as_raw()) }
    }

    /// Returns `true` if the wrapper refers to a callable.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        self.as_raw().is_some()
    }

    /// Moves the callable out into a new wrapper, leaving this one empty.
    #[must_use]
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    /// Returns the number of wrappers and [`Arc`]s sharing the callable, or
    /// `None` if nothing is allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::SharedFn;
    ///
    /// let f: SharedFn<fn() -> u8> = SharedFn::new(|| 1u8);
    /// let g = f.clone();
    /// assert_eq!(g.owner_count(), Some(2));
    /// assert_eq!(SharedFn::<fn() -> u8>::from_fn(|| 1).owner_count(), None);
    /// ```
    #[must_use]
    pub fn owner_count(&self) -> Option<usize> {
        self.owner().map(Arc::count)
    }

    /// Calls the callable with the arguments of the signature as a tuple.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty.
    #[inline]
    #[track_caller]
    pub fn call_tuple(&self, args: S::Args) -> S::Output {
        // SAFETY:
        // 1. The callable, if any, is kept alive by `self.owner` and never
        //    borrowed mutably, guaranteed by the invariants of this type
        unsafe { self.as_raw().call(args) }
    }

    /// Changes the thread-safety marker of the wrapper to [`Local`].
    #[must_use]
    pub fn into_local(self) -> SharedFn<'a, S, Local> {
        let (view, owner) = self.into_parts();

        // SAFETY:
        // 1. `T = Local`
        // 2. The view and its owner are unchanged
        // 3. `T` is not `SendSync`
        unsafe { SharedFn::from_parts(view, owner) }
    }
}

macro_rules! impl_call {
    ($($arg:ident: $ty:ident),*) => {
        impl<R, $($ty,)* T> SharedFn<'_, fn($($ty),*) -> R, T> {
            /// Calls the callable with the arguments of the signature.
            ///
            /// # Panics
            ///
            /// Panics if the wrapper is empty.
            #[inline]
            #[track_caller]
            pub fn call(&self, $($arg: $ty),*) -> R {
                self.call_tuple(($($arg,)*))
            }
        }
    };
}

for_each_arity!(impl_call);

impl<S: Signature, T> Callable<S> for SharedFn<'_, S, T> {
    #[inline]
    fn call(&self, args: S::Args) -> S::Output {
        self.call_tuple(args)
    }
}

impl<S: Signature, T> Clone for SharedFn<'_, S, T> {
    fn clone(&self) -> Self {
        // SAFETY:
        // 1. `T` is unchanged
        // 2. The clone of the owner keeps the same callable alive
        // 3. `T` is unchanged
        unsafe { Self::from_parts(*self.as_raw(), self.owner().cloned()) }
    }
}

impl<S: Signature, T> Default for SharedFn<'_, S, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature, T> fmt::Debug for SharedFn<'_, S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFn")
            .field("is_some", &self.is_some())
            .field("owner_count", &self.owner_count())
            .finish()
    }
}

impl<'a, S: Signature> From<SharedFn<'a, S, SendSync>> for SharedFn<'a, S, Local> {
    fn from(f: SharedFn<'a, S, SendSync>) -> Self {
        f.into_local()
    }
}

// SAFETY: The `SendSync` marker indicates that the shared callable is
// `Send + Sync`, so its owner may be cloned and dropped on any thread.
unsafe impl<S: Signature> Send for SharedFn<'_, S, SendSync> {}

// SAFETY: The `SendSync` marker indicates that the shared callable is
// `Send + Sync`. Shared references only reach the `&self` call path.
unsafe impl<S: Signature> Sync for SharedFn<'_, S, SendSync> {}
