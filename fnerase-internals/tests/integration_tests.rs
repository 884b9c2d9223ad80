//! Integration tests for the fnerase-internals crate.
//!
//! ## View Tests
//! - `test_view_over_call_object`: Views over call objects through both call
//!   paths
//! - `test_view_over_function_pointer`: Function pointers stored by value
//!
//! ## Owning Wrapper Tests
//! - `test_trivial_payload_never_allocates`: Trivial payloads stay out of the
//!   allocator entirely
//! - `test_external_payload_allocates_once`: Oversized payloads cost exactly
//!   one allocation and one deallocation
//! - `test_forced_external_storage`: External storage on request, with a
//!   stable payload address
//! - `test_allocation_failure`: Failing allocators surface `AllocError` and
//!   drop the payload
//! - `test_dual_call_paths`: Separate `&self` and `&mut self` call operators
//! - `test_take_and_reassign`: Moving payloads out and assigning over
//!   non-empty wrappers
//!
//! ## Memory Management Tests
//! - `test_drop_exactly_once`: Every storage mode drops its payload exactly
//!   once, including on reassignment

use std::{
    alloc::Layout,
    cell::Cell,
    ptr::NonNull,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use fnerase_internals::{
    AllocError, Callable, CallableMut, Global, HeapAlloc, RawFuncView, RawUniqueFn, Storage,
};

// Test allocators
#[derive(Clone, Default)]
struct CountingAlloc {
    allocations: Arc<AtomicUsize>,
    deallocations: Arc<AtomicUsize>,
}

impl CountingAlloc {
    fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }
}

// SAFETY: Forwards every request to `Global`
unsafe impl HeapAlloc for CountingAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        // SAFETY: The block was allocated by `Global` in `allocate`
        unsafe { Global.deallocate(ptr, layout) }
    }
}

struct FailingAlloc;

// SAFETY: Never hands out memory
unsafe impl HeapAlloc for FailingAlloc {
    fn allocate(&self, _layout: Layout) -> Result<NonNull<u8>, AllocError> {
        Err(AllocError)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!("nothing was allocated")
    }
}

// Test callables
type Sig = fn(i32) -> i32;

/// Const call adds, non-const call subtracts.
struct Dual {
    a: i32,
}

impl Callable<Sig> for Dual {
    fn call(&self, (x,): (i32,)) -> i32 {
        self.a + x
    }
}

impl CallableMut<Sig> for Dual {
    fn call_mut(&mut self, (x,): (i32,)) -> i32 {
        self.a -= x;
        self.a
    }
}

struct Tracked {
    drops: Rc<Cell<usize>>,
    padding: [u64; 2],
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

impl Callable<fn() -> u64> for Tracked {
    fn call(&self, (): ()) -> u64 {
        self.padding.iter().sum()
    }
}

fn add_42(x: i32) -> i32 {
    x + 42
}

#[test]
fn test_view_over_call_object() {
    let object = Dual { a: 10 };
    // SAFETY: `object` outlives the view and is not mutated while it is used
    let view = unsafe { RawFuncView::<Sig>::from_object(NonNull::from(&object)) };
    assert!(view.is_some());
    // SAFETY: `object` is alive
    assert_eq!(unsafe { view.call((5,)) }, 15);

    let mut object = Dual { a: 10 };
    // SAFETY: `object` is only accessed through the view while it is used
    let view = unsafe { RawFuncView::<Sig>::from_object_mut(NonNull::from(&mut object)) };
    // SAFETY: `object` is alive and not otherwise borrowed
    assert_eq!(unsafe { view.call((3,)) }, 7);
    // SAFETY: `object` is alive and not otherwise borrowed
    assert_eq!(unsafe { view.call((3,)) }, 4);
    assert_eq!(object.a, 4);
}

#[test]
fn test_view_over_function_pointer() {
    let view = RawFuncView::<Sig>::from_function(add_42);
    let copy = view;
    // SAFETY: Function pointers have no lifetime to uphold
    assert_eq!(unsafe { copy.call((0,)) }, 42);

    let widened = RawFuncView::<fn(i32) -> i64>::from_function(|x: i32| i64::from(x) * 2);
    // SAFETY: Function pointers have no lifetime to uphold
    assert_eq!(unsafe { widened.call((21,)) }, 42);
}

#[test]
fn test_trivial_payload_never_allocates() {
    let alloc = CountingAlloc::default();
    let offset = 40;
    let raw = RawUniqueFn::<Sig>::new_const(move || move |x: i32| x + offset, alloc.clone(), false)
        .unwrap();
    assert_eq!(raw.storage(), Some(Storage::Trivial));

    let mut moved = raw;
    assert_eq!(moved.call((2,)), Some(42));
    let taken = moved.take();
    assert_eq!(taken.call((2,)), Some(42));
    drop(taken);
    drop(moved);

    assert_eq!(alloc.allocations(), 0);
    assert_eq!(alloc.deallocations(), 0);
}

#[test]
fn test_external_payload_allocates_once() {
    let alloc = CountingAlloc::default();
    let table: [i32; 64] = core::array::from_fn(|i| i as i32);
    let raw = RawUniqueFn::<fn(usize) -> i32>::new_const(
        move || move |i: usize| table[i],
        alloc.clone(),
        false,
    )
    .unwrap();
    assert_eq!(raw.storage(), Some(Storage::External));
    assert_eq!(alloc.allocations(), 1);

    let moved = raw;
    assert_eq!(moved.call((63,)), Some(63));
    assert_eq!(alloc.deallocations(), 0);

    drop(moved);
    assert_eq!(alloc.allocations(), 1);
    assert_eq!(alloc.deallocations(), 1);
}

#[test]
fn test_forced_external_storage() {
    let alloc = CountingAlloc::default();
    let raw = RawUniqueFn::<Sig>::new_dual(|| Dual { a: 1 }, alloc.clone(), true).unwrap();
    assert_eq!(raw.storage(), Some(Storage::External));
    assert_eq!(alloc.allocations(), 1);

    let mut moved = raw;
    assert_eq!(moved.call_mut((1,)), 0);
    assert_eq!(moved.call((5,)), Some(5));
    drop(moved);
    assert_eq!(alloc.deallocations(), 1);
}

#[test]
fn test_allocation_failure() {
    let drops = Rc::new(Cell::new(0));
    let result = RawUniqueFn::<fn() -> u64>::new_const(
        || Tracked {
            drops: drops.clone(),
            padding: [1; 2],
        },
        FailingAlloc,
        true,
    );
    assert_eq!(result.unwrap_err(), AllocError);
    assert_eq!(drops.get(), 1);

    // Inline payloads never touch the allocator
    let raw = RawUniqueFn::<fn() -> u64>::new_const(
        || Tracked {
            drops: drops.clone(),
            padding: [1; 2],
        },
        FailingAlloc,
        false,
    )
    .unwrap();
    assert_eq!(raw.call(()), Some(2));
}

#[test]
fn test_dual_call_paths() {
    let mut raw = RawUniqueFn::<Sig>::new_dual(|| Dual { a: 10 }, Global, false).unwrap();
    assert!(raw.has_const_path());
    assert_eq!(raw.call((1,)), Some(11));
    assert_eq!(raw.call_mut((1,)), 9);
    assert_eq!(raw.call_mut((1,)), 8);
    assert_eq!(raw.call((2,)), Some(10));

    let mut mutation_only = RawUniqueFn::<Sig>::new_mut(|| Dual { a: 10 }, Global, false).unwrap();
    assert!(!mutation_only.has_const_path());
    assert_eq!(mutation_only.call((1,)), None);
    assert_eq!(mutation_only.call_mut((1,)), 9);

    let mut const_only = RawUniqueFn::<Sig>::new_const(|| Dual { a: 10 }, Global, false).unwrap();
    assert_eq!(const_only.call_mut((1,)), 11);
    assert_eq!(const_only.call_mut((1,)), 11);
}

#[test]
fn test_take_and_reassign() {
    let mut raw = RawUniqueFn::<Sig>::new_const(|| add_42 as Sig, Global, false).unwrap();
    let taken = raw.take();
    assert!(!raw.is_some());
    assert_eq!(raw.type_name(), None);
    assert_eq!(taken.call((0,)), Some(42));

    raw = taken;
    assert_eq!(raw.call((1,)), Some(43));
    assert_eq!(raw.type_name(), Some(std::any::type_name::<Sig>()));
}

#[test]
fn test_drop_exactly_once() {
    let drops = Rc::new(Cell::new(0));
    let make = |drops: &Rc<Cell<usize>>| {
        let drops = drops.clone();
        move || Tracked {
            drops,
            padding: [0; 2],
        }
    };

    let inline = RawUniqueFn::<fn() -> u64>::new_const(make(&drops), Global, false).unwrap();
    assert_eq!(inline.storage(), Some(Storage::Inline));
    let external = RawUniqueFn::<fn() -> u64>::new_const(make(&drops), Global, true).unwrap();
    assert_eq!(external.storage(), Some(Storage::External));

    let mut inline = inline;
    let moved = inline.take();
    drop(inline);
    assert_eq!(drops.get(), 0);

    let mut external = external;
    assert_eq!(external.call(()), Some(0));
    external = moved;
    assert_eq!(drops.get(), 1);

    drop(external);
    assert_eq!(drops.get(), 2);
}
