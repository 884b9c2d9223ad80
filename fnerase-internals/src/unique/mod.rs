//! Owning type-erased callables with small-buffer storage.
//!
//! A [`RawUniqueFn`] is an [`InlineSlot`] plus a `&'static` [`UniqueVtable`].
//! Small payloads live directly in the slot, everything else lives in a block
//! obtained from a [`HeapAlloc`](crate::HeapAlloc) and the slot keeps the
//! block's address. The vtable knows which of the two applies.
//!
//! [`InlineSlot`]: slot::InlineSlot
//! [`UniqueVtable`]: vtable::UniqueVtable

mod data;
mod raw;
pub(crate) mod slot;
pub(crate) mod vtable;

pub use self::raw::RawUniqueFn;

/// Number of bytes a payload may occupy to be stored inline.
///
/// Two units of the strictest fundamental alignment, enough for a closure
/// capturing a few references or a small call object.
pub const INLINE_CAPACITY: usize = 32;

/// Strictest alignment a payload may require to be stored inline.
pub const INLINE_ALIGN: usize = 16;

/// Where an owning wrapper keeps its payload.
///
/// The storage of a payload type is decided once, at compile time, by
/// [`Storage::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Stored inline, and has no drop glue, so destroying it is a no-op.
    Trivial,
    /// Stored inline, and dropped in place.
    Inline,
    /// Stored in a heap block together with the allocator that provided it.
    External,
}

impl Storage {
    /// Selects the storage for payloads of type `F`.
    ///
    /// A payload is stored inline when it is at most [`INLINE_CAPACITY`] bytes
    /// large and needs at most [`INLINE_ALIGN`] alignment, unless
    /// `force_external` is set. Inline payloads without drop glue are
    /// [`Storage::Trivial`].
    ///
    /// ```
    /// use fnerase_internals::Storage;
    ///
    /// assert_eq!(Storage::select::<fn() -> u8>(false), Storage::Trivial);
    /// assert_eq!(Storage::select::<[u64; 4]>(false), Storage::Trivial);
    /// assert_eq!(Storage::select::<[u64; 5]>(false), Storage::External);
    /// assert_eq!(Storage::select::<u8>(true), Storage::External);
    /// ```
    #[inline]
    pub const fn select<F>(force_external: bool) -> Self {
        let fits = core::mem::size_of::<F>() <= INLINE_CAPACITY
            && core::mem::align_of::<F>() <= INLINE_ALIGN;

        if force_external || !fits {
            Self::External
        } else if core::mem::needs_drop::<F>() {
            Self::Inline
        } else {
            Self::Trivial
        }
    }

    /// Returns `true` if the payload lives in the wrapper itself.
    #[inline]
    pub const fn is_inline(self) -> bool {
        matches!(self, Self::Trivial | Self::Inline)
    }
}
