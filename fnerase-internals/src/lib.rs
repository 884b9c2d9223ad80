#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`fnerase`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased slots and unsafe dispatch
//! machinery that power the [`fnerase`] callable wrappers. The concrete type
//! of a wrapped callable never appears in a wrapper's type: it is remembered
//! only by the function pointers selected when the wrapper is created.
//!
//! **This crate is an implementation detail.** No semantic versioning guarantees
//! are provided. Users should depend on the [`fnerase`] crate, not this one.
//!
//! # Architecture
//!
//! - **[`signature`]**: The dispatch contract
//!   - [`Signature`]: Implemented for `fn(A1, ..) -> R` pointer types
//!   - [`Callable`]/[`CallableMut`]: The `&self` and `&mut self` call paths
//!
//! - **[`view`]**: Non-owning erased callables
//!   - [`RawFuncView`]: A two-word slot plus one invoke function pointer
//!   - [`ViewSlot`]: Object address or function pointer, never both
//!
//! - **[`unique`]**: Owning erased callables with small-buffer storage
//!   - [`RawUniqueFn`]: An inline slot plus a `&'static` vtable
//!   - [`InlineSlot`]: 32 bytes, 16-aligned, explicitly untyped
//!   - [`UniqueVtable`]: Invoke functions for both call paths and the
//!     manager (drop) function
//!   - [`Storage`]: The storage selection for a payload type
//!
//! - **[`alloc`]**: The allocator capability used by the heap fallback
//!
//! # Safety Strategy
//!
//! Every slot is paired with the function pointers that were instantiated for
//! the payload written into it. Since the slot and those pointers can only be
//! set together, by the constructors of the raw types, and the fields are
//! private to their modules, the pointers always match the bytes they
//! interpret.
//!
//! [`fnerase`]: https://docs.rs/fnerase/latest/fnerase/
//! [`ViewSlot`]: view::slot::ViewSlot
//! [`InlineSlot`]: unique::slot::InlineSlot
//! [`UniqueVtable`]: unique::vtable::UniqueVtable

extern crate alloc as alloc_crate;

pub mod alloc;
pub mod signature;
mod unique;
mod util;
mod view;

pub use self::{
    alloc::{AllocError, Global, HeapAlloc},
    signature::{Callable, CallableMut, Signature},
    unique::{INLINE_ALIGN, INLINE_CAPACITY, RawUniqueFn, Storage},
    view::RawFuncView,
};
