//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use fnerase::prelude::*;
//!
//! fn run(callbacks: &[SharedFn<fn(u32) -> u32>], x: u32) -> u32 {
//!     callbacks.iter().fold(x, |acc, f| f.call(acc))
//! }
//!
//! let callbacks: [SharedFn<fn(u32) -> u32>; 2] = [
//!     SharedFn::new(|x: u32| x * 2),
//!     SharedFn::new(|x: u32| x + 2),
//! ];
//! assert_eq!(run(&callbacks, 20), 42);
//! ```
//!
//! # What's Included
//!
//! - **[`FuncView`]**, **[`FuncViewMut`]**, **[`UniqueFn`]** and
//!   **[`SharedFn`]**: the wrappers
//! - **[`Callable`]** and **[`CallableMut`]**: the traits call objects
//!   implement
//! - **[`Discard`]**: the adapter dropping a callable's result
//! - **[`make_shared_fn`]**: the auto-detecting factory for shared wrappers
//! - **[`markers`]**: access and thread-safety markers

pub use crate::{
    Callable, CallableMut, Discard, FuncView, FuncViewMut, SharedFn, UniqueFn, make_shared_fn,
    markers,
};
