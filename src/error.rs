//! Errors reported by the wrappers at run time.
//!
//! Most misuse is rejected at compile time: incompatible signatures, views
//! bound to temporaries and thread-safety mismatches never build. What remains
//! is reported here:
//!
//! - [`ConstCallError`]: a [`Dual`](crate::markers::Dual) wrapper was called
//!   through `&self`, but its payload only has a `&mut self` call operator
//! - [`AllocError`]: the allocator passed to a `try_*` constructor could not
//!   provide external storage
//!
//! Calling an empty wrapper is a bug in the caller rather than an error, and
//! panics.

use core::fmt;

pub use fnerase_internals::AllocError;

/// A [`Dual`](crate::markers::Dual) wrapper was called through `&self`, but its
/// payload has no `&self` call operator.
///
/// # Examples
///
/// ```
/// use fnerase::prelude::*;
///
/// let mut calls = 0u32;
/// let mut count: UniqueFn<fn() -> u32, markers::Dual> = UniqueFn::new_mut_only(move || {
///     calls += 1;
///     calls
/// });
///
/// assert_eq!(count.call_mut(), 1);
/// let error = count.call().unwrap_err();
/// assert!(error.to_string().contains("has no `&self` call operator"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstCallError {
    /// The [`core::any::type_name`] of the payload
    type_name: &'static str,
}

impl ConstCallError {
    /// Creates an error for a payload with the given type name.
    #[must_use]
    pub(crate) const fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }

    /// Returns the [`core::any::type_name`] of the payload that was called.
    ///
    /// The exact contents of the name are not guaranteed, see
    /// [`core::any::type_name`].
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for ConstCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` has no `&self` call operator", self.type_name)
    }
}

impl core::error::Error for ConstCallError {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_const_call_error_display() {
        let error = ConstCallError::new("my_crate::Counter");
        assert_eq!(error.type_name(), "my_crate::Counter");
        assert_eq!(
            error.to_string(),
            "`my_crate::Counter` has no `&self` call operator"
        );
    }

    #[test]
    fn test_errors_are_thread_safe() {
        static_assertions::assert_impl_all!(ConstCallError: Send, Sync, Copy, core::error::Error);
        static_assertions::assert_impl_all!(AllocError: Send, Sync, Copy, core::error::Error);
    }
}
