//! Non-owning type-erased callables.
//!
//! A view is one [`ViewSlot`] and one invoke function pointer. The slot holds
//! either the address of a callable that lives elsewhere or a function pointer
//! by value; which one is implied by the installed invoke function.
//!
//! [`ViewSlot`]: slot::ViewSlot

mod raw;
pub(crate) mod slot;

pub use self::raw::RawFuncView;
