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

//! The long-lived worker pool. Threads are spawned once, inside a single
//! `crossbeam::thread::scope` that spans the whole run, and parked on a
//! `Mutex`+`Condvar` handshake between generations rather than respawned —
//! the same primitives the teacher's `Population::epochs_parallel` uses for
//! its one-shot work queue, generalized here to a reusable slice-dispatch
//! barrier spanning many generations.

use std::cell::UnsafeCell;
use std::sync::{Condvar, Mutex};

use rand::Rng;

use crate::config::{EngineConfig, MutationMode};
use crate::individual::Evolvable;
use crate::rng::{PrngPool, Xorshift128Plus};
use crate::store::IndividualStore;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Score,
    Spawn,
}

/// Per-worker argument record — the `EvThreadArgs` analogue. Each worker's
/// record lives in its own `Box`, so different workers' improvement
/// counters and slice bounds never share a cache line.
struct WorkerJob {
    phase: Phase,
    range: (usize, usize),
    /// Keep mode only: backing-slot index to write each offspring into,
    /// one per rank in `range`, claimed from the free list by the main
    /// thread before dispatch.
    new_slots: Vec<usize>,
    improvements: u32,
    /// Keep mode only: `(rank, new_backing_idx)` pairs to fold into the
    /// handle array at COMMIT.
    handle_updates: Vec<(usize, usize)>,
}

struct WorkerSlot {
    job: UnsafeCell<WorkerJob>,
}

// Safety: the generation handshake (see `Handshake`) guarantees a worker
// only reads its slot after the main thread's writes to it happen-before
// the worker's wake-up, and the main thread only reads a slot's results
// after that worker's completion happens-before the main thread's wake-up.
// No two threads ever access the same slot concurrently.
unsafe impl Sync for WorkerSlot {}

struct HandshakeState {
    generation: u64,
    done: usize,
    shutdown: bool,
}

struct Handshake {
    state: Mutex<HandshakeState>,
    go: Condvar,
    arrived: Condvar,
}

/// A fixed set of long-lived worker threads, reused across every
/// generation of one run.
pub(crate) struct WorkerPool {
    handshake: Handshake,
    slots: Vec<WorkerSlot>,
    num_threads: usize,
}

impl WorkerPool {
    fn new(num_threads: usize) -> Self {
        let slots = (0..num_threads)
            .map(|_| WorkerSlot {
                job: UnsafeCell::new(WorkerJob {
                    phase: Phase::Idle,
                    range: (0, 0),
                    new_slots: Vec::new(),
                    improvements: 0,
                    handle_updates: Vec::new(),
                }),
            })
            .collect();
        WorkerPool {
            handshake: Handshake {
                state: Mutex::new(HandshakeState { generation: 0, done: 0, shutdown: false }),
                go: Condvar::new(),
                arrived: Condvar::new(),
            },
            slots,
            num_threads,
        }
    }

    /// Spawns `num_threads` workers inside a scope spanning `body`, runs
    /// `body` with a handle to dispatch rounds, then signals shutdown and
    /// joins every worker before returning.
    ///
    /// The shutdown handshake must happen *inside* the scope closure, after
    /// `body` returns but before the closure itself returns: `crossbeam::
    /// thread::scope` joins every spawned thread as it unwinds, and
    /// `worker_loop` only ever exits by observing `state.shutdown`. Setting
    /// that flag after the scope has already returned would mean it's never
    /// visible to a worker still parked in `go.wait`, and the join would
    /// block forever.
    pub fn scoped<T, F, R>(
        num_threads: usize,
        store: &IndividualStore<T>,
        opts: &[T::Options],
        config: &EngineConfig,
        prng_pool: &mut PrngPool,
        body: F,
    ) -> R
    where
        T: Evolvable,
        F: FnOnce(&WorkerPool) -> R,
    {
        let pool = WorkerPool::new(num_threads);
        crossbeam::thread::scope(|scope| {
            for t in 0..num_threads {
                let rng = prng_pool.take(t);
                let slot = &pool.slots[t];
                let handshake = &pool.handshake;
                let opts_slot = &opts[t];
                scope.spawn(move |_| worker_loop(t, slot, handshake, store, opts_slot, config, rng));
            }
            let result = body(&pool);

            {
                let mut state = pool.handshake.state.lock().unwrap();
                state.shutdown = true;
                state.generation += 1;
            }
            pool.handshake.go.notify_all();

            result
        })
        .expect("worker thread panicked")
    }

    /// Runs one dispatch round: `setup` assigns each worker's slice (and,
    /// in keep mode, its claimed backing slots) before the round starts;
    /// blocks until every worker reports completion, then returns each
    /// worker's improvement count and handle updates.
    pub fn dispatch(&self, phase: Phase, mut setup: impl FnMut(usize, &mut (usize, usize), &mut Vec<usize>)) -> Vec<(u32, Vec<(usize, usize)>)> {
        {
            let mut state = self.handshake.state.lock().unwrap();
            for (t, slot) in self.slots.iter().enumerate() {
                // Safety: workers are parked (generation hasn't advanced
                // past what they last observed) while we hold this lock.
                let job = unsafe { &mut *slot.job.get() };
                job.phase = phase;
                setup(t, &mut job.range, &mut job.new_slots);
                job.improvements = 0;
                job.handle_updates.clear();
            }
            state.generation += 1;
            state.done = 0;
        }
        self.handshake.go.notify_all();

        let mut state = self.handshake.state.lock().unwrap();
        while state.done < self.num_threads {
            state = self.handshake.arrived.wait(state).unwrap();
        }

        let results = self
            .slots
            .iter()
            .map(|slot| {
                // Safety: still holding the handshake lock, after having
                // observed `done == num_threads`; every worker's writes
                // happen-before this read.
                let job = unsafe { &*slot.job.get() };
                (job.improvements, job.handle_updates.clone())
            })
            .collect();
        drop(state);
        results
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop<T: Evolvable>(
    thread_index: usize,
    slot: &WorkerSlot,
    handshake: &Handshake,
    store: &IndividualStore<T>,
    opts: &T::Options,
    config: &EngineConfig,
    mut rng: Xorshift128Plus,
) {
    let mut observed_generation = 0u64;
    loop {
        {
            let mut state = handshake.state.lock().unwrap();
            while state.generation == observed_generation && !state.shutdown {
                state = handshake.go.wait(state).unwrap();
            }
            if state.shutdown {
                return;
            }
            observed_generation = state.generation;
        }

        // Safety: the generation bump above happens-before this read, per
        // the Mutex+Condvar handshake.
        let job = unsafe { &mut *slot.job.get() };
        match job.phase {
            Phase::Score => run_score(store, opts, job),
            Phase::Spawn => run_spawn(store, opts, config, &mut rng, job),
            Phase::Idle => {}
        }
        let _ = thread_index;

        {
            let mut state = handshake.state.lock().unwrap();
            state.done += 1;
            handshake.arrived.notify_one();
        }
    }
}

fn run_score<T: Evolvable>(store: &IndividualStore<T>, opts: &T::Options, job: &mut WorkerJob) {
    let (start, end) = job.range;
    for rank in start..end {
        let backing_idx = store.handle_at(rank);
        store.slot_mut(backing_idx).fitness(opts);
    }
}

fn run_spawn<T: Evolvable>(
    store: &IndividualStore<T>,
    opts: &T::Options,
    config: &EngineConfig,
    rng: &mut Xorshift128Plus,
    job: &mut WorkerJob,
) {
    let (start, end) = job.range;
    let survivors = config.survivors;
    let keep_mode = store.is_keep_mode();

    for rank in start..end {
        let predecessor_backing = store.handle_at(rank);
        let predecessor_fitness = store.slot_ref(predecessor_backing).cached_fitness();

        let dst_backing = if keep_mode {
            job.new_slots[rank - start]
        } else {
            predecessor_backing
        };

        let p1_backing = store.handle_at(rng.gen_range(0..survivors));
        let p2_backing = store.handle_at(rng.gen_range(0..survivors));

        produce_offspring(store, opts, config, rng, p1_backing, p2_backing, dst_backing);

        let dst = store.slot_mut(dst_backing);
        dst.invalidate();
        let offspring_fitness = dst.fitness(opts);

        let improved = if config.sort_order.is_max() {
            offspring_fitness > predecessor_fitness
        } else {
            offspring_fitness < predecessor_fitness
        };
        if improved {
            job.improvements += 1;
        }

        if keep_mode {
            job.handle_updates.push((rank, dst_backing));
        }
    }
}

/// Implements the offspring-production table of SPEC_FULL.md §4.4.1.
fn produce_offspring<T: Evolvable>(
    store: &IndividualStore<T>,
    opts: &T::Options,
    config: &EngineConfig,
    rng: &mut Xorshift128Plus,
    p1_backing: usize,
    p2_backing: usize,
    dst_backing: usize,
)
{
    let mutation_mode = config.mutation_mode();
    let should_mutate_probabilistic = || rng.next_u32() < config.i_mut_probability;

    if config.use_recombination {
        // `dst` may alias one of the parents only when `dst_backing ==
        // p1_backing`/`p2_backing`, which cannot happen: `dst_backing` is
        // either a free-list slot (keep mode, disjoint from any live
        // handle) or the dying individual's own slot (discard mode, which
        // is never inside the survivor prefix parents are drawn from).
        let (p1, p2, dst) = borrow_three(store, p1_backing, p2_backing, dst_backing);
        dst.payload.recombine(&p1.payload, &p2.payload, opts);
        match mutation_mode {
            MutationMode::Always => dst.payload.mutate(opts),
            MutationMode::Probabilistic if should_mutate_probabilistic() => dst.payload.mutate(opts),
            _ => {}
        }
    } else {
        let (p1, dst) = borrow_two(store, p1_backing, dst_backing);
        dst.payload.clone_from(&p1.payload, opts);
        match mutation_mode {
            MutationMode::Always => dst.payload.mutate(opts),
            MutationMode::Probabilistic if should_mutate_probabilistic() => dst.payload.mutate(opts),
            _ => {}
        }
    }
}

fn borrow_two<'a, T: Evolvable>(
    store: &'a IndividualStore<T>,
    a: usize,
    dst: usize,
) -> (&'a crate::individual::Scored<T>, &'a mut crate::individual::Scored<T>) {
    debug_assert_ne!(a, dst);
    let p1 = store.slot_ref(a);
    let dst = store.slot_mut(dst);
    (p1, dst)
}

fn borrow_three<'a, T: Evolvable>(
    store: &'a IndividualStore<T>,
    a: usize,
    b: usize,
    dst: usize,
) -> (&'a crate::individual::Scored<T>, &'a crate::individual::Scored<T>, &'a mut crate::individual::Scored<T>) {
    debug_assert_ne!(a, dst);
    debug_assert_ne!(b, dst);
    let p1 = store.slot_ref(a);
    let p2 = store.slot_ref(b);
    let dst = store.slot_mut(dst);
    (p1, p2, dst)
}
