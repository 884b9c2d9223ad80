//! Non-owning views over callables.
//!
//! - [`FuncView`] borrows a callable immutably and calls it through `&self`.
//!   It is two words large and `Copy`.
//! - [`FuncViewMut`] borrows a callable mutably and calls it through
//!   `&mut self`. It is not `Copy`, since copies would alias the mutable
//!   borrow.
//!
//! Both carry the lifetime of the borrow, so a view can never outlive the
//! callable it refers to.

mod mut_;
mod ref_;

pub use self::{mut_::FuncViewMut, ref_::FuncView};
