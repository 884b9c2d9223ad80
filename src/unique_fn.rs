use core::{any::type_name, fmt};

use fnerase_internals::{
    AllocError, Callable, CallableMut, Global, HeapAlloc, RawUniqueFn, Signature, Storage,
};

use crate::{
    error::ConstCallError,
    markers::{self, AccessFor, Const, Dual, Local, Mutable, SendSync},
};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw` field
/// an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use fnerase_internals::{RawUniqueFn, Signature};

    use crate::markers::{Const, SendSync};

    /// An owning, type-erased callable with inline storage for small payloads.
    ///
    /// [`UniqueFn`] takes ownership of a callable (the *payload*) and hides
    /// its concrete type behind the signature `S`. Payloads of at most
    /// [`INLINE_CAPACITY`](crate::INLINE_CAPACITY) bytes are kept inside the
    /// wrapper; larger ones are moved into a single heap block obtained from
    /// an allocator (by default [`Global`](crate::Global)).
    ///
    /// # Type Parameters
    ///
    /// - **`'a`**: How long the payload may borrow data for. Payloads that own
    ///   all their data make `UniqueFn<'static, ..>`
    /// - **`S`**: The declared signature, a function pointer type such as
    ///   `fn(i32) -> i32`
    /// - **`Access`**: Which call operator the wrapper exposes, either
    ///   [`Const`] (the default), [`Mutable`](crate::markers::Mutable) or
    ///   [`Dual`](crate::markers::Dual)
    /// - **`ThreadSafety`**: Either [`SendSync`] (the default) or
    ///   [`Local`](crate::markers::Local)
    ///
    /// # Moves
    ///
    /// Moving a [`UniqueFn`] moves the payload along with it, wherever it is
    /// stored. The wrapper is move-only: there is no [`Clone`] implementation.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let greeting = String::from("hello");
    /// let greet: UniqueFn<fn(&'static str) -> String> =
    ///     UniqueFn::new(move |name: &'static str| format!("{greeting}, {name}"));
    ///
    /// assert_eq!(greet.call("world"), "hello, world");
    /// ```
    ///
    /// Closures that mutate their captures need the
    /// [`Mutable`](crate::markers::Mutable) marker:
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let mut total = 0;
    /// let mut add: UniqueFn<fn(i32) -> i32, markers::Mutable> = UniqueFn::new(move |x: i32| {
    ///     total += x;
    ///     total
    /// });
    ///
    /// add.call(40);
    /// assert_eq!(add.call(2), 42);
    /// ```
    #[repr(transparent)]
    pub struct UniqueFn<
        'a,
        S: Signature,
        Access: 'static = Const,
        ThreadSafety: 'static = SendSync,
    > {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. `A` must either be `Const`, `Mutable` or `Dual`.
        /// 2. `T` must either be `SendSync` or `Local`.
        /// 3. If `A = Const`: the payload, if any, was created with a `&self`
        ///    call path.
        /// 4. If `T = SendSync`: the payload and the allocator stored with it
        ///    are `Send + Sync`.
        raw: RawUniqueFn<'a, S>,
        _access: PhantomData<Access>,
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<'a, S: Signature, A, T> UniqueFn<'a, S, A, T> {
        /// Creates a new wrapper from a raw wrapper.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. `A` must either be `Const`, `Mutable` or `Dual`.
        /// 2. `T` must either be `SendSync` or `Local`.
        /// 3. If `A = Const`: the payload, if any, was created with a `&self`
        ///    call path.
        /// 4. If `T = SendSync`: the payload and the allocator stored with it
        ///    are `Send + Sync`.
        #[must_use]
        pub(crate) const unsafe fn from_raw(raw: RawUniqueFn<'a, S>) -> Self {
            // SAFETY: We must uphold the safety invariants of the raw field:
            // 1. Guaranteed by our caller
            // 2. Guaranteed by our caller
            // 3. Guaranteed by our caller
            // 4. Guaranteed by our caller
            Self {
                raw,
                _access: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        /// Consumes the wrapper and returns the inner raw wrapper.
        #[must_use]
        pub(crate) fn into_raw(self) -> RawUniqueFn<'a, S> {
            self.raw
        }

        /// Returns a reference to the inner raw wrapper.
        #[must_use]
        pub(crate) const fn as_raw(&self) -> &RawUniqueFn<'a, S> {
            &self.raw
        }

        /// Returns a mutable reference to the inner raw wrapper.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. The raw wrapper is only replaced by one upholding the same
        ///    invariants, for example an empty one.
        #[must_use]
        pub(crate) unsafe fn as_raw_mut(&mut self) -> &mut RawUniqueFn<'a, S> {
            &mut self.raw
        }
    }
}

pub use limit_field_access::UniqueFn;

/// Reports a failed allocation the way [`Box`](alloc::boxed::Box) does.
#[track_caller]
fn or_alloc_error<'a, S, F, H>(
    raw: Result<RawUniqueFn<'a, S>, AllocError>,
) -> RawUniqueFn<'a, S>
where
    S: Signature,
{
    match raw {
        Ok(raw) => raw,
        Err(AllocError) => {
            alloc::alloc::handle_alloc_error(RawUniqueFn::<S>::external_layout::<F, H>())
        }
    }
}

impl<'a, S: Signature, A, T> UniqueFn<'a, S, A, T> {
    /// Creates an empty wrapper.
    ///
    /// Calling an empty wrapper panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let f = UniqueFn::<fn() -> u8>::empty();
    /// assert!(!f.is_some());
    /// assert_eq!(f.storage(), None);
    /// ```
    #[must_use]
    pub const fn empty() -> Self {
        // SAFETY:
        // 1. `A` is restricted by the constructors exposed to users
        // 2. `T` is restricted by the constructors exposed to users
        // 3. There is no payload
        // 4. There is no payload
        unsafe { Self::from_raw(RawUniqueFn::empty()) }
    }

    /// Creates a wrapper owning `callable`.
    ///
    /// The payload is stored inline when it fits, otherwise it is moved into
    /// a block allocated from [`Global`].
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
    /// let f: UniqueFn<fn(i32) -> i32> = UniqueFn::new(add_42);
    /// assert_eq!(f.call(0), 42);
    /// ```
    #[must_use]
    #[track_caller]
    pub fn new<F>(callable: F) -> Self
    where
        A: AccessFor<S, F>,
        F: markers::ObjectMarkerFor<T> + 'a,
    {
        Self::emplace(move || callable)
    }

    /// Creates a wrapper whose payload is built by `init`, directly in its
    /// final storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let table: UniqueFn<fn(usize) -> u64> = UniqueFn::emplace(|| {
    ///     let squares: Vec<u64> = (0..16).map(|i| i * i).collect();
    ///     move |i: usize| squares[i]
    /// });
    /// assert_eq!(table.call(7), 49);
    /// ```
    #[must_use]
    #[track_caller]
    pub fn emplace<F, I>(init: I) -> Self
    where
        A: AccessFor<S, F>,
        F: markers::ObjectMarkerFor<T> + 'a,
        I: FnOnce() -> F,
    {
        let raw = or_alloc_error::<S, F, Global>(A::emplace(init, Global, false));

        // SAFETY:
        // 1. `A: AccessFor<S, F>` is only implemented for the access markers
        // 2. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 3. `Const::emplace` installs a `&self` call path
        // 4. If `T = SendSync`: `F` implements `ObjectMarkerFor<SendSync>`, and
        //    `Global` is `Send + Sync`
        unsafe { Self::from_raw(raw) }
    }

    /// Creates a wrapper owning `callable`, using `alloc` if the payload needs
    /// external storage.
    ///
    /// The allocator is stored next to the payload and releases its block
    /// when the wrapper is dropped. It is dropped without being used when the
    /// payload is stored inline.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocator fails.
    #[must_use]
    #[track_caller]
    pub fn new_in<F, H>(callable: F, alloc: H) -> Self
    where
        A: AccessFor<S, F>,
        F: markers::ObjectMarkerFor<T> + 'a,
        H: HeapAlloc + markers::ObjectMarkerFor<T> + 'a,
    {
        Self::emplace_in(move || callable, alloc)
    }

    /// Creates a wrapper whose payload is built by `init`, using `alloc` if
    /// the payload needs external storage.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocator fails.
    #[must_use]
    #[track_caller]
    pub fn emplace_in<F, H, I>(init: I, alloc: H) -> Self
    where
        A: AccessFor<S, F>,
        F: markers::ObjectMarkerFor<T> + 'a,
        H: HeapAlloc + markers::ObjectMarkerFor<T> + 'a,
        I: FnOnce() -> F,
    {
        let raw = or_alloc_error::<S, F, H>(A::emplace(init, alloc, false));

        // SAFETY:
        // 1. `A: AccessFor<S, F>` is only implemented for the access markers
        // 2. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 3. `Const::emplace` installs a `&self` call path
        // 4. If `T = SendSync`: `F` and `H` implement
        //    `ObjectMarkerFor<SendSync>`, which requires `Send + Sync`
        unsafe { Self::from_raw(raw) }
    }

    /// Creates a wrapper owning `callable`, reporting allocation failures
    /// instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the payload needed external storage and
    /// `alloc` failed to provide it. The callable is dropped in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let big = [1u64; 16];
    /// let sum: UniqueFn<fn() -> u64> =
    ///     UniqueFn::try_new_in(move || big.iter().sum::<u64>(), fnerase::Global)?;
    /// assert_eq!(sum.call(), 16);
    /// # Ok::<(), fnerase::AllocError>(())
    /// ```
    pub fn try_new_in<F, H>(callable: F, alloc: H) -> Result<Self, AllocError>
    where
        A: AccessFor<S, F>,
        F: markers::ObjectMarkerFor<T> + 'a,
        H: HeapAlloc + markers::ObjectMarkerFor<T> + 'a,
    {
        Self::try_emplace_in(move || callable, alloc)
    }

    /// Creates a wrapper whose payload is built by `init`, reporting
    /// allocation failures instead of aborting.
    ///
    /// `init` runs before the allocation is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the payload needed external storage and
    /// `alloc` failed to provide it. The payload is dropped in that case.
    pub fn try_emplace_in<F, H, I>(init: I, alloc: H) -> Result<Self, AllocError>
    where
        A: AccessFor<S, F>,
        F: markers::ObjectMarkerFor<T> + 'a,
        H: HeapAlloc + markers::ObjectMarkerFor<T> + 'a,
        I: FnOnce() -> F,
    {
        let raw = A::emplace(init, alloc, false)?;

        // SAFETY:
        // 1. `A: AccessFor<S, F>` is only implemented for the access markers
        // 2. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 3. `Const::emplace` installs a `&self` call path
        // 4. If `T = SendSync`: `F` and `H` implement
        //    `ObjectMarkerFor<SendSync>`, which requires `Send + Sync`
        Ok(unsafe { Self::from_raw(raw) })
    }

    /// Creates a wrapper owning `callable`, always in external storage.
    ///
    /// The payload stays at the same address for as long as the wrapper
    /// lives, even when the wrapper itself is moved.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::{Storage, prelude::*};
    ///
    /// let f: UniqueFn<fn() -> u8> = UniqueFn::new_boxed(|| 42u8);
    /// assert_eq!(f.storage(), Some(Storage::External));
    /// assert_eq!(f.call(), 42);
    /// ```
    #[must_use]
    #[track_caller]
    pub fn new_boxed<F>(callable: F) -> Self
    where
        A: AccessFor<S, F>,
        F: markers::ObjectMarkerFor<T> + 'a,
    {
        let raw = or_alloc_error::<S, F, Global>(A::emplace(move || callable, Global, true));

        // SAFETY:
        // 1. `A: AccessFor<S, F>` is only implemented for the access markers
        // 2. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 3. `Const::emplace` installs a `&self` call path
        // 4. If `T = SendSync`: `F` implements `ObjectMarkerFor<SendSync>`, and
        //    `Global` is `Send + Sync`
        unsafe { Self::from_raw(raw) }
    }

    /// Returns `true` if the wrapper owns a payload.
    #[must_use]
    pub const fn is_some(&self) -> bool {
        self.as_raw().is_some()
    }

    /// Returns where the payload is stored, or `None` for an empty wrapper.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::{Storage, prelude::*};
    ///
    /// let small: UniqueFn<fn() -> usize> = UniqueFn::new(|| 1usize);
    /// assert_eq!(small.storage(), Some(Storage::Trivial));
    ///
    /// let name = String::from("inline");
    /// let len: UniqueFn<fn() -> usize> = UniqueFn::new(move || name.len());
    /// assert_eq!(len.storage(), Some(Storage::Inline));
    ///
    /// let wide = [0u8; 64];
    /// let len: UniqueFn<fn() -> usize> = UniqueFn::new(move || wide.len());
    /// assert_eq!(len.storage(), Some(Storage::External));
    /// ```
    #[must_use]
    pub fn storage(&self) -> Option<Storage> {
        self.as_raw().storage()
    }

    /// Moves the payload out into a new wrapper, leaving this one empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let mut f: UniqueFn<fn() -> u8> = UniqueFn::new(|| 42u8);
    /// let g = f.take();
    /// assert!(!f.is_some());
    /// assert_eq!(g.call(), 42);
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        // SAFETY:
        // 1. The raw wrapper is replaced by an empty one
        let raw = unsafe { self.as_raw_mut() }.take();

        // SAFETY:
        // 1. `A` is unchanged
        // 2. `T` is unchanged
        // 3. The payload was created for a wrapper with the same `A`
        // 4. The payload was created for a wrapper with the same `T`
        unsafe { Self::from_raw(raw) }
    }

    /// Changes the thread-safety marker of the wrapper to [`Local`].
    #[must_use]
    pub fn into_local(self) -> UniqueFn<'a, S, A, Local> {
        let raw = self.into_raw();

        // SAFETY:
        // 1. `A` is unchanged
        // 2. `T = Local`
        // 3. `A` is unchanged
        // 4. `T` is not `SendSync`
        unsafe { UniqueFn::from_raw(raw) }
    }
}

impl<S: Signature, T> UniqueFn<'_, S, Const, T> {
    /// Calls the payload with the arguments of the signature as a tuple.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty.
    #[inline]
    #[track_caller]
    pub fn call_tuple(&self, args: S::Args) -> S::Output {
        match self.as_raw().call(args) {
            Some(output) => output,
            None => unreachable!("`Const` payloads always have a `&self` call path"),
        }
    }
}

impl<S: Signature, T> UniqueFn<'_, S, Mutable, T> {
    /// Calls the payload with the arguments of the signature as a tuple.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty.
    #[inline]
    #[track_caller]
    pub fn call_tuple(&mut self, args: S::Args) -> S::Output {
        // SAFETY:
        // 1. Calling the payload does not replace the raw wrapper
        unsafe { self.as_raw_mut() }.call_mut(args)
    }
}

impl<'a, S: Signature, T> UniqueFn<'a, S, Dual, T> {
    /// Creates a wrapper owning a payload that can only be called through
    /// `&mut self`.
    ///
    /// Calls through `&self` report a [`ConstCallError`] for such a payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnerase::prelude::*;
    ///
    /// let mut next = 0u8;
    /// let mut ids: UniqueFn<fn() -> u8, markers::Dual> = UniqueFn::new_mut_only(move || {
    ///     next += 1;
    ///     next
    /// });
    /// assert_eq!(ids.call_mut(), 1);
    /// assert!(ids.call().is_err());
    /// ```
    #[must_use]
    #[track_caller]
    pub fn new_mut_only<F>(callable: F) -> Self
    where
        F: CallableMut<S> + markers::ObjectMarkerFor<T> + 'a,
    {
        let raw = or_alloc_error::<S, F, Global>(RawUniqueFn::new_mut(
            move || callable,
            Global,
            false,
        ));

        // SAFETY:
        // 1. `A = Dual`
        // 2. `T` is `SendSync` or `Local`, the only types `ObjectMarkerFor` is
        //    implemented for
        // 3. `A` is not `Const`
        // 4. If `T = SendSync`: `F` implements `ObjectMarkerFor<SendSync>`, and
        //    `Global` is `Send + Sync`
        unsafe { Self::from_raw(raw) }
    }

    /// Returns `true` if the payload can be called through `&self`.
    ///
    /// Returns `false` for an empty wrapper.
    #[must_use]
    pub fn has_const_path(&self) -> bool {
        self.as_raw().has_const_path()
    }

    /// Calls the payload through `&self` with the arguments of the signature
    /// as a tuple.
    ///
    /// # Errors
    ///
    /// Returns [`ConstCallError`] if the payload was created with
    /// [`new_mut_only`](UniqueFn::new_mut_only).
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty.
    #[inline]
    #[track_caller]
    pub fn try_call_tuple(&self, args: S::Args) -> Result<S::Output, ConstCallError> {
        self.as_raw().call(args).ok_or_else(|| {
            ConstCallError::new(self.as_raw().type_name().unwrap_or_default())
        })
    }

    /// Calls the payload through `&mut self` with the arguments of the
    /// signature as a tuple.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty.
    #[inline]
    #[track_caller]
    pub fn call_mut_tuple(&mut self, args: S::Args) -> S::Output {
        // SAFETY:
        // 1. Calling the payload does not replace the raw wrapper
        unsafe { self.as_raw_mut() }.call_mut(args)
    }
}

macro_rules! impl_call {
    ($($arg:ident: $ty:ident),*) => {
        impl<R, $($ty,)* T> UniqueFn<'_, fn($($ty),*) -> R, Const, T> {
            /// Calls the payload with the arguments of the signature.
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

        impl<R, $($ty,)* T> UniqueFn<'_, fn($($ty),*) -> R, Mutable, T> {
            /// Calls the payload with the arguments of the signature.
            ///
            /// # Panics
            ///
            /// Panics if the wrapper is empty.
            #[inline]
            #[track_caller]
            pub fn call(&mut self, $($arg: $ty),*) -> R {
                self.call_tuple(($($arg,)*))
            }
        }

        impl<R, $($ty,)* T> UniqueFn<'_, fn($($ty),*) -> R, Dual, T> {
            /// Calls the payload through `&self` with the arguments of the
            /// signature.
            ///
            /// # Errors
            ///
            /// Returns [`ConstCallError`] if the payload has no `&self` call
            /// operator.
            ///
            /// # Panics
            ///
            /// Panics if the wrapper is empty.
            #[inline]
            #[track_caller]
            pub fn call(&self, $($arg: $ty),*) -> Result<R, ConstCallError> {
                self.try_call_tuple(($($arg,)*))
            }

            /// Calls the payload through `&mut self` with the arguments of the
            /// signature.
            ///
            /// # Panics
            ///
            /// Panics if the wrapper is empty.
            #[inline]
            #[track_caller]
            pub fn call_mut(&mut self, $($arg: $ty),*) -> R {
                self.call_mut_tuple(($($arg,)*))
            }
        }
    };
}

for_each_arity!(impl_call);

impl<S: Signature, T> Callable<S> for UniqueFn<'_, S, Const, T> {
    #[inline]
    fn call(&self, args: S::Args) -> S::Output {
        self.call_tuple(args)
    }
}

impl<S: Signature, T> CallableMut<S> for UniqueFn<'_, S, Mutable, T> {
    #[inline]
    fn call_mut(&mut self, args: S::Args) -> S::Output {
        self.call_tuple(args)
    }
}

impl<S: Signature, T> CallableMut<S> for UniqueFn<'_, S, Dual, T> {
    #[inline]
    fn call_mut(&mut self, args: S::Args) -> S::Output {
        self.call_mut_tuple(args)
    }
}

impl<S: Signature, A, T> Default for UniqueFn<'_, S, A, T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature, A, T> fmt::Debug for UniqueFn<'_, S, A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = type_name::<A>().rsplit("::").next().unwrap_or_default();
        match self.as_raw().type_name() {
            Some(payload) => f
                .debug_struct("UniqueFn")
                .field("access", &access)
                .field("payload", &payload)
                .field("storage", &self.storage())
                .finish(),
            None => write!(f, "UniqueFn<{access}>(<empty>)"),
        }
    }
}

impl<'a, S: Signature, A> From<UniqueFn<'a, S, A, SendSync>> for UniqueFn<'a, S, A, Local> {
    fn from(f: UniqueFn<'a, S, A, SendSync>) -> Self {
        f.into_local()
    }
}

// SAFETY: The `SendSync` marker indicates that the payload and its allocator
// are `Send + Sync`, so the wrapper owning them can move between threads.
unsafe impl<S: Signature, A> Send for UniqueFn<'_, S, A, SendSync> {}

// SAFETY: The `SendSync` marker indicates that the payload and its allocator
// are `Send + Sync`. Shared references only reach the `&self` call path.
unsafe impl<S: Signature, A> Sync for UniqueFn<'_, S, A, SendSync> {}

#[cfg(test)]
mod tests {
    use alloc::{boxed::Box, format, rc::Rc, string::String, vec::Vec};
    use core::cell::Cell;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    struct Tracked {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    impl Callable<fn() -> usize> for Tracked {
        fn call(&self, (): ()) -> usize {
            self.drops.get()
        }
    }

    struct Tally {
        total: i64,
    }

    impl Callable<fn(i64) -> i64> for Tally {
        fn call(&self, (x,): (i64,)) -> i64 {
            self.total + x
        }
    }

    impl CallableMut<fn(i64) -> i64> for Tally {
        fn call_mut(&mut self, (x,): (i64,)) -> i64 {
            self.total += x;
            self.total
        }
    }

    #[test]
    fn test_unique_fn_traits() {
        type Sig = fn(u8) -> u8;
        assert_impl_all!(UniqueFn<'static, Sig>: Send, Sync, Callable<Sig>);
        assert_impl_all!(UniqueFn<'static, Sig, Mutable>: Send, Sync, CallableMut<Sig>);
        assert_impl_all!(UniqueFn<'static, Sig, Dual>: Send, Sync, CallableMut<Sig>);
        assert_not_impl_any!(UniqueFn<'static, Sig>: Clone, Copy);
        assert_not_impl_any!(UniqueFn<'static, Sig, Mutable>: Callable<Sig>);
        assert_not_impl_any!(UniqueFn<'static, Sig, Const, Local>: Send, Sync);
    }

    #[test]
    fn test_unique_fn_const() {
        let prefix = String::from("id-");
        let f: UniqueFn<fn(u32) -> String> =
            UniqueFn::new(move |id: u32| format!("{prefix}{id}"));
        assert_eq!(f.call(7), "id-7");
        assert_eq!(Callable::<fn(u32) -> String>::call(&f, (8,)), "id-8");
        assert_eq!(f.storage(), Some(Storage::Inline));
    }

    #[test]
    fn test_unique_fn_emplace_each_access() {
        let f: UniqueFn<fn(i64) -> i64> = UniqueFn::emplace(|| Tally { total: 40 });
        assert_eq!(f.call(2), 42);

        let mut g: UniqueFn<fn(i64) -> i64, Mutable> = UniqueFn::emplace(|| Tally { total: 0 });
        g.call(40);
        assert_eq!(g.call(2), 42);

        let mut h: UniqueFn<fn(i64) -> i64, Dual> = UniqueFn::emplace(|| Tally { total: 1 });
        assert_eq!(h.call_mut(40), 41);
        assert_eq!(h.call(1), Ok(42));
        assert_eq!(h.storage(), Some(Storage::Trivial));
    }

    #[test]
    fn test_unique_fn_moves_preserve_results() {
        let values: Vec<i32> = (1..=6).collect();
        let f: UniqueFn<fn(i32) -> i32> = UniqueFn::new(move |x: i32| values.iter().sum::<i32>() + x);
        let moved = f;
        let boxed = Box::new(moved);
        assert_eq!(boxed.call(21), 42);
    }

    #[test]
    fn test_unique_fn_mutable() {
        let mut calls = 0u32;
        let mut f: UniqueFn<fn() -> u32, Mutable> = UniqueFn::new(move || {
            calls += 1;
            calls
        });
        assert_eq!(f.call(), 1);
        assert_eq!(CallableMut::<fn() -> u32>::call_mut(&mut f, ()), 2);
    }

    #[test]
    fn test_unique_fn_dual() {
        let mut f: UniqueFn<fn(i64) -> i64, Dual> = UniqueFn::new(Tally { total: 40 });
        assert!(f.has_const_path());
        assert_eq!(f.call(2), Ok(42));
        assert_eq!(f.call_mut(2), 42);
        assert_eq!(f.call_mut(2), 44);
        assert_eq!(f.call(0), Ok(44));

        let mut only_mut: UniqueFn<fn(i64) -> i64, Dual> =
            UniqueFn::new_mut_only(|x: i64| x * 2);
        assert!(!only_mut.has_const_path());
        assert_eq!(only_mut.call_mut(21), 42);
        let error = only_mut.call(21).unwrap_err();
        assert!(error.type_name().contains("closure"));
    }

    #[test]
    fn test_unique_fn_drop_and_take() {
        let drops = Rc::new(Cell::new(0));
        let mut f: UniqueFn<fn() -> usize, Const, Local> = UniqueFn::new(Tracked {
            drops: Rc::clone(&drops),
        });
        let g = f.take();
        assert!(!f.is_some());
        assert_eq!(drops.get(), 0);
        assert_eq!(g.call(), 0);

        f = g;
        assert_eq!(f.call(), 0);
        f = UniqueFn::default();
        assert_eq!(drops.get(), 1);
        drop(f);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_unique_fn_borrows_locals() {
        fn count_matches<'w>(words: &'w [String], needle: &str) -> usize {
            let matches: UniqueFn<'_, fn(&'w String) -> bool> =
                UniqueFn::new(|word: &'w String| word.contains(needle));
            words.iter().filter(|&word| matches.call(word)).count()
        }

        let words = [
            String::from("borrow"),
            String::from("own"),
            String::from("burrow"),
        ];
        assert_eq!(count_matches(&words, "rrow"), 2);

        let mut seen = Vec::new();
        {
            let mut record: UniqueFn<'_, fn(&'static str), Mutable> =
                UniqueFn::new(|word: &str| seen.push(word.len()));
            record.call("four");
            record.call("three");
        }
        assert_eq!(seen, [4, 5]);
    }

    #[test]
    fn test_unique_fn_local() {
        let shared = Rc::new(41);
        let f: UniqueFn<fn() -> i32, Const, Local> = UniqueFn::new(move || *shared + 1);
        assert_eq!(f.call(), 42);

        let g: UniqueFn<fn() -> i32, Const, Local> = UniqueFn::<fn() -> i32>::new(|| 7).into();
        assert_eq!(g.call(), 7);
    }

    #[test]
    fn test_unique_fn_debug() {
        let f = UniqueFn::<fn() -> u8, Mutable>::empty();
        assert_eq!(format!("{f:?}"), "UniqueFn<Mutable>(<empty>)");

        let f: UniqueFn<fn() -> u8> = UniqueFn::new(|| 1u8);
        let debug = format!("{f:?}");
        assert!(debug.starts_with("UniqueFn { access: \"Const\", payload: "));
        assert!(debug.ends_with("storage: Some(Trivial) }"));
    }

    #[test]
    #[should_panic(expected = "called an empty callable wrapper")]
    fn test_unique_fn_empty_call_panics() {
        let f = UniqueFn::<fn(u8) -> u8>::default();
        f.call(0);
    }
}
