// Copyright (c) 2017 Ashley Jeffs
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! The backing store for one run: a flat array of payload slots addressed
//! through a handle array, plus (in keep mode) a free list of slots not
//! currently part of the live population. See `SPEC_FULL.md` §3 for the
//! model this implements.

use std::cell::UnsafeCell;

use crate::individual::{Evolvable, Scored};

pub(crate) struct IndividualStore<T: Evolvable> {
    slots: Vec<UnsafeCell<Scored<T>>>,
    /// `handles[rank]` is the backing-slot index of the individual currently
    /// ranked `rank` in the live population. Length is always
    /// `population_size`. Behind an `UnsafeCell` for the same reason as
    /// `slots`: `WorkerPool::scoped` hands out only a shared `&IndividualStore`
    /// to the whole run (workers hold it for the scope's lifetime), so the
    /// main thread's between-generation bookkeeping (sort, free-list churn)
    /// must mutate through `&self` too.
    handles: UnsafeCell<Vec<usize>>,
    /// Backing-slot indices not currently referenced by `handles`. Always
    /// empty in discard mode.
    free: UnsafeCell<Vec<usize>>,
    keep_mode: bool,
}

// Safety: concurrent access to distinct `UnsafeCell` slots from different
// threads is sound because every caller of `slot_mut`/`slot_ref` across
// threads operates on a set of indices partitioned to be disjoint for the
// duration of a generation step (see `workers.rs`). No two threads ever
// hold a live reference into the same slot at the same time. `handles` and
// `free` are only ever touched by the main thread, and only between
// dispatch rounds while every worker is parked at the handshake barrier, so
// there is never a concurrent access to them either.
unsafe impl<T: Evolvable> Sync for IndividualStore<T> {}

impl<T: Evolvable> IndividualStore<T> {
    /// Builds a store from already-initialized payloads. `payloads.len()`
    /// must be `population_size` in discard mode or `2 * population_size`
    /// in keep mode.
    pub fn new(payloads: Vec<T>, keep_mode: bool) -> Self {
        let total = payloads.len();
        let population_size = if keep_mode { total / 2 } else { total };
        let slots = payloads.into_iter().map(|p| UnsafeCell::new(Scored::new(p))).collect();
        let handles: Vec<usize> = (0..population_size).collect();
        let free: Vec<usize> = if keep_mode { (population_size..total).collect() } else { Vec::new() };
        IndividualStore {
            slots,
            handles: UnsafeCell::new(handles),
            free: UnsafeCell::new(free),
            keep_mode,
        }
    }

    pub fn population_size(&self) -> usize {
        unsafe { &*self.handles.get() }.len()
    }

    pub fn handles(&self) -> &[usize] {
        unsafe { &*self.handles.get() }
    }

    /// Exclusive view of the handle array for the main thread's SORT phase.
    /// Safe to call with only `&self` because the main thread is the sole
    /// accessor between dispatch rounds (see the `Sync` impl above).
    #[allow(clippy::mut_from_ref)]
    pub fn handles_mut(&self) -> &mut [usize] {
        unsafe { &mut *self.handles.get() }
    }

    /// The backing-slot index currently ranked `rank` in the live
    /// population (valid only after a sort for ranks to be meaningful).
    pub fn handle_at(&self, rank: usize) -> usize {
        self.handles()[rank]
    }

    pub fn set_handle_at(&self, rank: usize, backing_idx: usize) {
        self.handles_mut()[rank] = backing_idx;
    }

    /// Shared access to a backing slot. Safe as long as no other live
    /// reference (shared or exclusive) exists into the same `backing_idx`.
    pub fn slot_ref(&self, backing_idx: usize) -> &Scored<T> {
        unsafe { &*self.slots[backing_idx].get() }
    }

    /// Exclusive access to a backing slot. The caller must guarantee no
    /// other thread holds a live reference into the same `backing_idx` at
    /// the same time; the engine upholds this by construction (disjoint
    /// slice assignment, handle-array permutation, and free-list
    /// bookkeeping that's performed single-threaded between dispatches).
    #[allow(clippy::mut_from_ref)]
    pub fn slot_mut(&self, backing_idx: usize) -> &mut Scored<T> {
        unsafe { &mut *self.slots[backing_idx].get() }
    }

    /// Claims one backing slot from the free list for an offspring write.
    /// Keep mode only; called single-threaded by the main thread while
    /// building the generation's spawn plan, before workers are dispatched.
    pub fn claim_free_slot(&self) -> usize {
        debug_assert!(self.keep_mode);
        let free = unsafe { &mut *self.free.get() };
        free.pop().expect("keep-mode free list exhausted")
    }

    /// Returns a backing slot to the free list once its previous occupant
    /// has been displaced. Keep mode only; called single-threaded at
    /// COMMIT.
    pub fn recycle(&self, backing_idx: usize) {
        debug_assert!(self.keep_mode);
        let free = unsafe { &mut *self.free.get() };
        free.push(backing_idx);
    }

    pub fn is_keep_mode(&self) -> bool {
        self.keep_mode
    }

    /// Drops every slot except the one at `keep_backing_idx`, returning its
    /// payload. Used at teardown: the best individual survives, everything
    /// else is released.
    pub fn into_best(mut self, keep_backing_idx: usize) -> T {
        let mut best = None;
        for (i, cell) in self.slots.drain(..).enumerate() {
            let scored = cell.into_inner();
            if i == keep_backing_idx {
                best = Some(scored.payload);
            }
        }
        best.expect("keep_backing_idx out of range")
    }
}

/// Partitions `[0, total)` evenly across `n_threads`, with any remainder
/// folded into the final worker's slice.
pub(crate) fn index_range(total: usize, thread: usize, n_threads: usize) -> (usize, usize) {
    if n_threads == 0 {
        return (0, 0);
    }
    let per = total / n_threads;
    let start = (thread * per).min(total);
    let end = if thread + 1 == n_threads { total } else { (start + per).min(total) };
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_range_partitions_evenly_with_remainder_on_last() {
        // 10 items, 3 threads -> 3, 3, 4
        assert_eq!(index_range(10, 0, 3), (0, 3));
        assert_eq!(index_range(10, 1, 3), (3, 6));
        assert_eq!(index_range(10, 2, 3), (6, 10));
    }

    #[test]
    fn index_range_handles_single_thread() {
        assert_eq!(index_range(7, 0, 1), (0, 7));
    }

    #[test]
    fn index_range_handles_more_threads_than_items() {
        assert_eq!(index_range(2, 0, 4), (0, 0));
        assert_eq!(index_range(2, 3, 4), (0, 2));
    }

    #[derive(Clone)]
    struct Dummy(i64);

    impl Evolvable for Dummy {
        type Options = ();
        fn init(_opts: &()) -> Self {
            Dummy(0)
        }
        fn clone_from(&mut self, source: &Self, _opts: &()) {
            self.0 = source.0;
        }
        fn mutate(&mut self, _opts: &()) {
            self.0 += 1;
        }
        fn recombine(&mut self, a: &Self, b: &Self, _opts: &()) {
            self.0 = a.0.max(b.0);
        }
        fn fitness(&self, _opts: &()) -> i64 {
            self.0
        }
    }

    #[test]
    fn keep_mode_free_list_starts_with_second_half() {
        let payloads: Vec<Dummy> = (0..8).map(Dummy).collect();
        let store = IndividualStore::new(payloads, true);
        assert_eq!(store.population_size(), 4);
        let claimed = store.claim_free_slot();
        assert!(claimed >= 4);
        store.recycle(claimed);
    }

    #[test]
    fn discard_mode_has_no_free_list() {
        let payloads: Vec<Dummy> = (0..4).map(Dummy).collect();
        let store = IndividualStore::new(payloads, false);
        assert_eq!(store.population_size(), 4);
        assert!(!store.is_keep_mode());
    }

    #[test]
    fn into_best_returns_requested_slot_payload() {
        let payloads: Vec<Dummy> = (0..4).map(Dummy).collect();
        let store = IndividualStore::new(payloads, false);
        let best = store.into_best(2);
        assert_eq!(best.0, 2);
    }
}
