//! Reference-counted, type-erased callables.
//!
//! A [`SharedFn`] is a [`FuncView`](crate::FuncView) bound to a callable that
//! lives inside a [`triomphe::Arc`], together with a type-erased clone of that
//! `Arc`. Cloning a [`SharedFn`] clones the `Arc`, so every clone calls the
//! same callable, and the callable lives until the last clone is dropped.
//!
//! Shared callables are always called through `&self`. Callables that need
//! `&mut self` are wrapped in an [`Exclusive`], which serialises the calls of
//! all clones behind a lock.
//!
//! # Factories
//!
//! - [`SharedFn::new`] / [`SharedFn::new_mut`] allocate the `Arc` for you
//! - [`make_shared_fn`] picks between the two for call objects that
//!   implement [`CallOperator`]

mod exclusive;
mod factory;
mod owned;

pub use self::{
    exclusive::{Exclusive, ExclusiveGuard},
    factory::{CallOperator, ShareWith, make_local_shared_fn, make_shared_fn},
    owned::SharedFn,
};
