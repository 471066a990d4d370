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

/// The capability set a caller must provide to evolve a population of `Self`.
///
/// This is the idiomatic counterpart of the five-function callback contract
/// (`init_iv`, `clone_iv`, `mutate`, `recombinate`, `fitness`) of a C-style
/// evolutionary-algorithm library. There is no `free_iv`: ordinary `Drop` on
/// `Self` takes its place.
pub trait Evolvable: Send {
    /// Caller-owned, thread-scoped context passed to every operation. One
    /// slot exists per worker thread; the engine never synchronizes access
    /// to it, so it must tolerate being read/written independently from
    /// `num_threads` concurrent callers, one per slot.
    type Options: Send + Sync;

    /// Allocates a fresh individual. Called once per backing slot at
    /// construction, and again for each seed individual in greedy mode.
    fn init(opts: &Self::Options) -> Self;

    /// Overwrites `self` with a deep copy of `source`.
    fn clone_from(&mut self, source: &Self, opts: &Self::Options);

    /// In-place perturbation. A per-invocation improvement probability of
    /// roughly 1/5 is a useful design target, not a correctness requirement.
    fn mutate(&mut self, opts: &Self::Options);

    /// Overwrites `self` with a combination of `parent_a` and `parent_b`.
    fn recombine(&mut self, parent_a: &Self, parent_b: &Self, opts: &Self::Options);

    /// A pure function of the individual's current state. Ordering
    /// direction (higher vs lower is better) is a run-wide setting, not a
    /// property of the fitness value itself.
    fn fitness(&self, opts: &Self::Options) -> i64;
}

/// Wraps an individual with a lazily-computed, cached fitness so repeated
/// reads within a generation don't re-invoke the caller's (potentially
/// expensive) fitness function.
pub struct Scored<T> {
    pub payload: T,
    fitness: Option<i64>,
}

impl<T: Evolvable> Scored<T> {
    pub fn new(payload: T) -> Self {
        Scored { payload, fitness: None }
    }

    /// Returns the cached fitness, computing and caching it if absent.
    pub fn fitness(&mut self, opts: &T::Options) -> i64 {
        match self.fitness {
            Some(f) => f,
            None => {
                let f = self.payload.fitness(opts);
                self.fitness = Some(f);
                f
            }
        }
    }

    /// Returns the cached fitness without recomputing; panics if it was
    /// never scored. Used on the hot path once SCORE has already run.
    pub fn cached_fitness(&self) -> i64 {
        self.fitness.expect("individual scored before fitness was computed")
    }

    /// Invalidates the cached fitness, forcing the next `fitness()` call to
    /// recompute it. Must be called whenever `payload` is mutated in place.
    pub fn invalidate(&mut self) {
        self.fitness = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static CALLS: Cell<u32> = Cell::new(0);
    }

    struct Counting(i64);

    impl Evolvable for Counting {
        type Options = ();

        fn init(_opts: &()) -> Self {
            Counting(0)
        }

        fn clone_from(&mut self, source: &Self, _opts: &()) {
            self.0 = source.0;
        }

        fn mutate(&mut self, _opts: &()) {
            self.0 += 1;
        }

        fn recombine(&mut self, parent_a: &Self, parent_b: &Self, _opts: &()) {
            self.0 = (parent_a.0 + parent_b.0) / 2;
        }

        fn fitness(&self, _opts: &()) -> i64 {
            CALLS.with(|c| c.set(c.get() + 1));
            self.0
        }
    }

    #[test]
    fn fitness_is_cached() {
        CALLS.with(|c| c.set(0));
        let mut scored = Scored::new(Counting(7));
        assert_eq!(scored.fitness(&()), 7);
        assert_eq!(scored.fitness(&()), 7);
        CALLS.with(|c| assert_eq!(c.get(), 1));
    }

    #[test]
    fn invalidate_forces_recompute() {
        CALLS.with(|c| c.set(0));
        let mut scored = Scored::new(Counting(7));
        scored.fitness(&());
        scored.payload.mutate(&());
        scored.invalidate();
        assert_eq!(scored.fitness(&()), 8);
        CALLS.with(|c| assert_eq!(c.get(), 2));
    }
}
