use fnerase_internals::{Callable, CallableMut, Signature};

use crate::{
    markers::{self, AccessMarker, Const, Local, Mutable, SendSync},
    shared_fn::{Exclusive, SharedFn},
};

/// A callable that names its own signature and call operator.
///
/// Implementing this trait lets [`make_shared_fn`] build a [`SharedFn`]
/// without spelling out the signature, and pick the right way to share the
/// callable:
///
/// - [`Const`]: the callable implements [`Callable<Self::Signature>`] and is
///   shared as is
/// - [`Mutable`]: the callable implements [`CallableMut<Self::Signature>`] and
///   is shared behind an [`Exclusive`] lock
///
/// Function pointers implement this trait with their own type as signature.
///
/// # Examples
///
/// ```
/// use fnerase::{Callable, CallOperator, make_shared_fn, markers};
///
/// struct Scale {
///     factor: f64,
/// }
///
/// impl CallOperator for Scale {
///     type Signature = fn(f64) -> f64;
///     type Access = markers::Const;
/// }
///
/// impl Callable<fn(f64) -> f64> for Scale {
///     fn call(&self, (x,): (f64,)) -> f64 {
///         x * self.factor
///     }
/// }
///
/// let scale = make_shared_fn(Scale { factor: 2.0 });
/// assert_eq!(scale.call(21.0), 42.0);
/// ```
pub trait CallOperator: Sized {
    /// The signature of the call operator.
    type Signature: Signature;
    /// [`Const`] if the call operator takes `&self`, [`Mutable`] if it takes
    /// `&mut self`.
    type Access: AccessMarker;
}

macro_rules! impl_call_operator {
    ($($arg:ident: $ty:ident),*) => {
        impl<R, $($ty),*> CallOperator for fn($($ty),*) -> R {
            type Signature = Self;
            type Access = Const;
        }
    };
}

for_each_arity!(impl_call_operator);

/// Connects an access marker with the way a callable is shared.
///
/// Implemented for [`Const`] (shared with [`SharedFn::new`]) and [`Mutable`]
/// (shared with [`SharedFn::new_mut`]).
pub trait ShareWith<'a, S: Signature, F, T>: AccessMarker {
    /// Moves `callable` into a new shared wrapper.
    #[doc(hidden)]
    fn share(callable: F) -> SharedFn<'a, S, T>;
}

impl<'a, S, F, T> ShareWith<'a, S, F, T> for Const
where
    S: Signature,
    F: Callable<S> + markers::ObjectMarkerFor<T> + 'a,
{
    #[inline]
    fn share(callable: F) -> SharedFn<'a, S, T> {
        SharedFn::new(callable)
    }
}

impl<'a, S, F, T> ShareWith<'a, S, F, T> for Mutable
where
    S: Signature,
    F: CallableMut<S> + 'a,
    Exclusive<F>: markers::ObjectMarkerFor<T>,
{
    #[inline]
    fn share(callable: F) -> SharedFn<'a, S, T> {
        SharedFn::new_mut(callable)
    }
}

/// Creates a thread-safe [`SharedFn`] from a callable implementing
/// [`CallOperator`].
///
/// Callables with a `&mut self` call operator are put behind an
/// [`Exclusive`] lock, so all clones of the wrapper share the same state.
///
/// # Examples
///
/// ```
/// use fnerase::{CallOperator, CallableMut, make_shared_fn, markers};
///
/// #[derive(Default)]
/// struct Average {
///     sum: f64,
///     count: u32,
/// }
///
/// impl CallOperator for Average {
///     type Signature = fn(f64) -> f64;
///     type Access = markers::Mutable;
/// }
///
/// impl CallableMut<fn(f64) -> f64> for Average {
///     fn call_mut(&mut self, (x,): (f64,)) -> f64 {
///         self.sum += x;
///         self.count += 1;
///         self.sum / f64::from(self.count)
///     }
/// }
///
/// let average = make_shared_fn(Average::default());
/// let other = average.clone();
/// assert_eq!(average.call(40.0), 40.0);
/// assert_eq!(other.call(44.0), 42.0);
/// ```
///
/// Function pointers work too:
///
/// ```
/// use fnerase::make_shared_fn;
///
/// fn add_42(x: i32) -> i32 {
///     x + 42
/// }
///
/// let f = make_shared_fn(add_42 as fn(i32) -> i32);
/// assert_eq!(f.call(0), 42);
/// ```
#[must_use]
pub fn make_shared_fn<'a, F>(callable: F) -> SharedFn<'a, F::Signature, SendSync>
where
    F: CallOperator,
    F::Access: ShareWith<'a, F::Signature, F, SendSync>,
{
    <F::Access as ShareWith<'a, F::Signature, F, SendSync>>::share(callable)
}

/// Creates a [`Local`] [`SharedFn`] from a callable implementing
/// [`CallOperator`].
///
/// Unlike [`make_shared_fn`], the callable does not need to be `Send` or
/// `Sync`.
///
/// # Examples
///
/// ```
/// use std::{cell::RefCell, rc::Rc};
///
/// use fnerase::{CallOperator, CallableMut, make_local_shared_fn, markers};
///
/// struct Recorder(Rc<RefCell<Vec<u8>>>);
///
/// impl CallOperator for Recorder {
///     type Signature = fn(u8);
///     type Access = markers::Mutable;
/// }
///
/// impl CallableMut<fn(u8)> for Recorder {
///     fn call_mut(&mut self, (byte,): (u8,)) {
///         self.0.borrow_mut().push(byte);
///     }
/// }
///
/// let bytes = Rc::new(RefCell::new(Vec::new()));
/// let record = make_local_shared_fn(Recorder(Rc::clone(&bytes)));
/// record.call(4);
/// record.clone().call(2);
/// assert_eq!(*bytes.borrow(), [4, 2]);
/// ```
#[must_use]
pub fn make_local_shared_fn<'a, F>(callable: F) -> SharedFn<'a, F::Signature, Local>
where
    F: CallOperator,
    F::Access: ShareWith<'a, F::Signature, F, Local>,
{
    <F::Access as ShareWith<'a, F::Signature, F, Local>>::share(callable)
}
