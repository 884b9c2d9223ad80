//! Internal utility types and functions.

/// Marker type used when type-erasing the payload of a wrapper.
///
/// This zero-sized type stands in for the concrete callable type once it has
/// been erased. For example, `NonNull<Erased>` is the address of a callable
/// whose type is only known to the function pointers stored next to it.
pub(crate) struct Erased;

/// Panics because an empty wrapper was called.
///
/// Calling an empty wrapper is a contract violation by the caller, so it is
/// reported the same way indexing out of bounds is.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn called_empty() -> ! {
    panic!("called an empty callable wrapper")
}

/// Emits a `trace`-level event when the `tracing` feature is enabled, and
/// expands to nothing otherwise.
macro_rules! trace_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

pub(crate) use trace_event;
