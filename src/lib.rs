#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Type-erased callable wrappers for `no_std` Rust.
//!
//! ## Overview
//!
//! This crate provides three ways to hold "something that can be called with
//! these arguments and returns this" without naming the concrete type of the
//! callable:
//!
//! - [`FuncView`] (and [`FuncViewMut`]): borrows a callable. Two words large,
//!   `Copy`, never allocates. The view carries the lifetime of the borrow, so
//!   it cannot outlive the callable.
//! - [`UniqueFn`]: owns a callable. Callables of up to [`INLINE_CAPACITY`]
//!   bytes are stored inside the wrapper itself, larger ones in a single heap
//!   block from a caller-chosen allocator.
//! - [`SharedFn`]: shares a callable through a reference-counted
//!   [`triomphe::Arc`]. Clones call the same callable.
//!
//! Every wrapper is declared over a **signature**, a function pointer type
//! such as `fn(&'static str, u32) -> bool`, and is called with the arguments
//! of that signature:
//!
//! ```
//! use fnerase::prelude::*;
//!
//! fn apply_twice(f: FuncView<'_, fn(i32) -> i32>, x: i32) -> i32 {
//!     f.call(f.call(x))
//! }
//!
//! let offset = 20;
//! let add = move |x: i32| x + offset;
//! assert_eq!(apply_twice(FuncView::new(&add), 2), 42);
//!
//! let owned: UniqueFn<fn(i32) -> i32> = UniqueFn::new(add);
//! assert_eq!(apply_twice(FuncView::new(&owned), 2), 42);
//!
//! let shared: SharedFn<fn(i32) -> i32> = SharedFn::new(add);
//! assert_eq!(apply_twice(shared.view(), 2), 42);
//! ```
//!
//! ## Compatible Callables
//!
//! A callable qualifies for a signature through the [`Callable`] trait (called
//! through `&self`) or the [`CallableMut`] trait (called through `&mut self`):
//!
//! - Closures, function items and function pointers implement both whenever
//!   they take exactly the declared argument types and return something that
//!   converts [`Into`] the declared result type. Wrapped in [`Discard`],
//!   they also back signatures without a result, whatever they return.
//! - Call objects implement the traits themselves, possibly generically over
//!   the signature to accept every argument type that converts into the one
//!   they need.
//!
//! Incompatible callables are rejected at compile time.
//!
//! ## Lifetimes
//!
//! Every wrapper carries a lifetime bounding what its callable borrows, so
//! owned and shared callables may capture references to locals:
//!
//! ```
//! use fnerase::prelude::*;
//!
//! fn count_long<'w>(words: &'w [String], min_len: usize) -> usize {
//!     let long: UniqueFn<'_, fn(&'w String) -> bool> =
//!         UniqueFn::new(|w: &'w String| w.len() >= min_len);
//!     words.iter().filter(|w| long.call(*w)).count()
//! }
//!
//! let words = [String::from("a"), String::from("abc")];
//! assert_eq!(count_long(&words, 2), 1);
//! ```
//!
//! Signatures taking references name their lifetime, as above, since
//! higher-ranked signatures such as `fn(&String) -> bool` are not supported.
//!
//! ## Type Parameters
//!
//! Besides the signature, the wrappers carry **markers** (see [`markers`]):
//!
//! - **Access** ([`UniqueFn`] only): [`Const`], [`Mutable`] or [`Dual`],
//!   selecting whether the wrapper is called through `&self`, `&mut self`, or
//!   both.
//! - **Thread safety**: [`SendSync`] (the default) only accepts callables that
//!   are `Send + Sync` and makes the wrapper `Send + Sync`; [`Local`] accepts
//!   any callable.
//!
//! ## Storage of Owned Callables
//!
//! [`UniqueFn`] decides once per callable type, at compile time, where the
//! callable lives (see [`Storage`]):
//!
//! - **Trivial**: fits the inline slot and has no drop glue
//! - **Inline**: fits the inline slot, dropped in place
//! - **External**: too large or too strictly aligned, or explicitly requested
//!   with [`UniqueFn::new_boxed`]. Allocated through a [`HeapAlloc`], by
//!   default [`Global`]
//!
//! ## Errors
//!
//! Misuse is rejected at compile time wherever possible. At run time,
//! [`ConstCallError`] reports a `&self` call on a [`Dual`] wrapper whose
//! callable only has a `&mut self` call operator, and [`AllocError`] reports a
//! failed allocation from the `try_*` constructors. Calling an empty wrapper
//! panics.
//!
//! ## Features
//!
//! - `std`: uses [`std::sync::Mutex`] for [`Exclusive`] instead of a spin lock
//! - `tracing`: emits `trace!` events when owned callables are created,
//!   allocated and released
//!
//! [`Const`]: crate::markers::Const
//! [`Mutable`]: crate::markers::Mutable
//! [`Dual`]: crate::markers::Dual
//! [`SendSync`]: crate::markers::SendSync
//! [`Local`]: crate::markers::Local

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod macros;

pub mod error;
pub mod markers;
pub mod prelude;

mod discard;
mod func_view;
mod shared_fn;
mod unique_fn;

pub use fnerase_internals::{
    Callable, CallableMut, Global, HeapAlloc, INLINE_ALIGN, INLINE_CAPACITY, Signature, Storage,
};

pub use self::{
    discard::Discard,
    error::{AllocError, ConstCallError},
    func_view::{FuncView, FuncViewMut},
    shared_fn::{
        CallOperator, Exclusive, ExclusiveGuard, ShareWith, SharedFn, make_local_shared_fn,
        make_shared_fn,
    },
    unique_fn::UniqueFn,
};
