//! Integration tests for the fnerase crate.
//!
//! ## Signature Matching Tests
//! - `test_signature_variance`: Call objects generic over their signature
//!   accept narrower arguments and wider results, in every wrapper
//! - `test_closure_result_conversion`: Closure results convert into the
//!   declared result type
//! - `test_discarded_results`: `Discard` lets callables with a result back
//!   signatures without one
//!
//! ## Owning Wrapper Tests
//! - `test_unique_fn_allocator`: Caller allocators serve external payloads
//!   only
//! - `test_unique_fn_allocation_failure`: `try_new_in` reports failures
//! - `test_unique_fn_dual_call_object`: Different `&self` and `&mut self`
//!   behaviour behind one wrapper
//! - `test_unique_fn_across_threads`: `SendSync` wrappers move between threads
//!
//! ## Shared Wrapper Tests
//! - `test_shared_fn_across_threads`: Clones share one locked state
//! - `test_shared_fn_from_arc_keeps_callable_alive`: The wrapper keeps its own
//!   reference to the callable

use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use fnerase::{
    AllocError, Callable, CallableMut, Discard, FuncView, Global, HeapAlloc, SharedFn, Storage,
    UniqueFn,
    markers::{Const, Dual},
};
use static_assertions::{assert_impl_all, assert_not_impl_any};

// Test allocators
#[derive(Clone, Default)]
struct CountingAlloc {
    allocations: Arc<AtomicUsize>,
    deallocations: Arc<AtomicUsize>,
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

// Signature matching: `C` converts into `B`, `B` converts into `A`
#[derive(Debug, PartialEq)]
struct A(u32);

#[derive(Debug, PartialEq)]
struct B(u32);

#[derive(Debug, PartialEq)]
struct C(u32);

impl From<B> for A {
    fn from(b: B) -> Self {
        A(b.0 + 100)
    }
}

impl From<C> for B {
    fn from(c: C) -> Self {
        B(c.0 + 10)
    }
}

/// Takes a `B` and returns it, accepting anything that converts into `B` and
/// returning anything `B` converts into.
struct PassB;

impl<X: Into<B>, Y: From<B>> Callable<fn(X) -> Y> for PassB {
    fn call(&self, (x,): (X,)) -> Y {
        Y::from(x.into())
    }
}

#[test]
fn test_signature_variance() {
    assert_impl_all!(PassB: Callable<fn(B) -> A>, Callable<fn(C) -> B>, Callable<fn(B) -> B>);
    assert_not_impl_any!(PassB: Callable<fn(B) -> C>, Callable<fn(A) -> B>);

    let view: FuncView<'_, fn(B) -> A> = FuncView::new(&PassB);
    assert_eq!(view.call(B(1)), A(101));
    let view: FuncView<'_, fn(C) -> B> = FuncView::new(&PassB);
    assert_eq!(view.call(C(1)), B(11));

    let owned: UniqueFn<fn(B) -> A> = UniqueFn::new(PassB);
    assert_eq!(owned.call(B(2)), A(102));
    let owned: UniqueFn<fn(C) -> B> = UniqueFn::new(PassB);
    assert_eq!(owned.call(C(2)), B(12));

    let shared: SharedFn<fn(B) -> A> = SharedFn::new(PassB);
    assert_eq!(shared.call(B(3)), A(103));
    let shared: SharedFn<fn(C) -> B> = SharedFn::new(PassB);
    assert_eq!(shared.call(C(3)), B(13));
}

#[test]
fn test_closure_result_conversion() {
    let to_b = |c: C| B(c.0);
    let view: FuncView<'_, fn(C) -> A> = FuncView::new(&to_b);
    assert_eq!(view.call(C(7)), A(107));

    // Arguments must match exactly for closures
    assert_not_impl_any!(fn(B) -> B: Callable<fn(C) -> B>);
    assert_impl_all!(fn(B) -> B: Callable<fn(B) -> A>);

    let widen: UniqueFn<fn(u8) -> u64> = UniqueFn::new(|x: u8| x);
    assert_eq!(widen.call(42), 42u64);
}

#[test]
fn test_discarded_results() {
    let add_one = |x: i32| x + 1;
    assert_not_impl_any!(fn(i32) -> i32: Callable<fn(i32)>);

    let view: FuncView<'_, fn(i32)> = FuncView::new(Discard::from_ref(&add_one));
    view.call(41);

    let owned: UniqueFn<'_, fn(i32)> = UniqueFn::new(Discard(add_one));
    owned.call(41);
    assert_eq!(owned.storage(), Some(Storage::Trivial));

    let hits = AtomicUsize::new(0);
    let hit = |n: usize| hits.fetch_add(n, Ordering::Relaxed) + n;
    let shared: SharedFn<'_, fn(usize)> = SharedFn::new(Discard(hit));
    shared.call(40);
    shared.clone().call(2);
    assert_eq!(hits.load(Ordering::Relaxed), 42);
}

#[test]
fn test_unique_fn_allocator() {
    let alloc = CountingAlloc::default();

    let small: UniqueFn<fn() -> u8> = UniqueFn::new_in(|| 42u8, alloc.clone());
    assert_eq!(small.storage(), Some(Storage::Trivial));
    assert_eq!(small.call(), 42);
    drop(small);
    assert_eq!(alloc.allocations.load(Ordering::SeqCst), 0);

    let table = [7u64; 32];
    let large: UniqueFn<fn(usize) -> u64> =
        UniqueFn::new_in(move |i: usize| table[i], alloc.clone());
    assert_eq!(large.storage(), Some(Storage::External));
    assert_eq!(alloc.allocations.load(Ordering::SeqCst), 1);

    let moved = large;
    assert_eq!(moved.call(31), 7);
    assert_eq!(alloc.deallocations.load(Ordering::SeqCst), 0);
    drop(moved);
    assert_eq!(alloc.allocations.load(Ordering::SeqCst), 1);
    assert_eq!(alloc.deallocations.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unique_fn_allocation_failure() {
    let table = [1u8; 64];
    let result: Result<UniqueFn<fn() -> usize>, AllocError> =
        UniqueFn::try_new_in(move || table.len(), FailingAlloc);
    assert_eq!(result.unwrap_err(), AllocError);

    let small: Result<UniqueFn<fn() -> usize>, AllocError> =
        UniqueFn::try_new_in(|| 1usize, FailingAlloc);
    assert_eq!(small.map(|f| f.call()), Ok(1));
}

/// Adds through `&self`, accumulates through `&mut self`.
struct Accumulator {
    total: i64,
}

impl Callable<fn(i64) -> i64> for Accumulator {
    fn call(&self, (x,): (i64,)) -> i64 {
        self.total + x
    }
}

impl CallableMut<fn(i64) -> i64> for Accumulator {
    fn call_mut(&mut self, (x,): (i64,)) -> i64 {
        self.total += x;
        self.total
    }
}

#[test]
fn test_unique_fn_dual_call_object() {
    let mut dual: UniqueFn<fn(i64) -> i64, Dual> = UniqueFn::new(Accumulator { total: 0 });
    assert_eq!(dual.call(5), Ok(5));
    assert_eq!(dual.call_mut(5), 5);
    assert_eq!(dual.call_mut(5), 10);
    assert_eq!(dual.call(5), Ok(15));

    // The same object behind a `Const` wrapper only exposes the `&self` path
    let constant: UniqueFn<fn(i64) -> i64, Const> = UniqueFn::new(Accumulator { total: 40 });
    assert_eq!(constant.call(2), 42);
    assert_eq!(constant.call(2), 42);

    let mut only_mut: UniqueFn<fn(i64) -> i64, Dual> = UniqueFn::new_mut_only({
        let mut total = 0;
        move |x: i64| {
            total += x;
            total
        }
    });
    assert_eq!(only_mut.call_mut(21), 21);
    assert_eq!(only_mut.call_mut(21), 42);
    let error = only_mut.call(0).unwrap_err();
    assert!(error.to_string().ends_with("has no `&self` call operator"));
}

#[test]
fn test_unique_fn_across_threads() {
    let name = String::from("worker");
    let f: UniqueFn<fn(usize) -> String> = UniqueFn::new(move |id: usize| format!("{name}-{id}"));
    let joined = thread::spawn(move || f.call(1)).join();
    assert_eq!(joined.ok().as_deref(), Some("worker-1"));
}

#[test]
fn test_shared_fn_across_threads() {
    let mut count = 0usize;
    let counter: SharedFn<fn() -> usize> = SharedFn::new_mut(move || {
        count += 1;
        count
    });

    thread::scope(|scope| {
        for _ in 0..4 {
            let counter = counter.clone();
            scope.spawn(move || {
                for _ in 0..100 {
                    counter.call();
                }
            });
        }
    });

    assert_eq!(counter.call(), 401);
}

#[test]
fn test_shared_fn_from_arc_keeps_callable_alive() {
    let callable = triomphe::Arc::new(|x: u32| x + 1);
    let f: SharedFn<fn(u32) -> u32> = SharedFn::from_arc(triomphe::Arc::clone(&callable));
    drop(callable);
    assert_eq!(f.owner_count(), Some(1));
    assert_eq!(f.call(41), 42);
}
