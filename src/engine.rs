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

//! The generation engine: SCORE → SORT → TERMINATE? → SPAWN → COMMIT,
//! repeated until the generation limit is hit or `continue_ev` says stop.

use log::{debug, info, trace};

use crate::config::{EngineConfig, Verbosity};
use crate::individual::Evolvable;
use crate::rng::PrngPool;
use crate::sort::partial_sort_by_fitness;
use crate::store::{index_range, IndividualStore};
use crate::workers::{Phase, WorkerPool};

/// Progress counters a `continue_ev` predicate can observe. Everything is
/// read-only except `greedy_size`, which a predicate may overwrite to
/// dynamically widen or narrow the greedy driver's search.
pub struct EngineView {
    pub generations_progressed: u64,
    pub improvements: u32,
    pub population_size: usize,
    pub survivors: usize,
    pub deaths: usize,
    pub greedy_size: usize,
}

/// Counters describing the most recently completed run.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvolutionInfo {
    pub improvements: u32,
    pub generations_progressed: u64,
}

/// The outcome of a completed run: the best individual found and the
/// counters describing how the run ended.
pub struct EvolutionResult<T> {
    pub best: T,
    pub info: EvolutionInfo,
}

/// A constructed, not-yet-run evolutionary algorithm.
///
/// Construction eagerly allocates every individual (via
/// [`Evolvable::init`](crate::individual::Evolvable::init)); [`Engine::run`]
/// drives it to completion and tears everything down except the best
/// individual, in one call — the "single-call convenience entry point" of
/// SPEC_FULL.md §4.6. [`crate::evolve`] is a thin wrapper over exactly this
/// path for callers who don't need to hold onto the unrun `Engine`.
pub struct Engine<T: Evolvable> {
    config: EngineConfig,
    opts: Vec<T::Options>,
}

impl<T: Evolvable> Engine<T> {
    /// `opts` must have exactly `config.num_threads` entries — one options
    /// slot per worker thread, per SPEC_FULL.md §5.
    pub fn new(config: EngineConfig, opts: Vec<T::Options>) -> Self {
        assert_eq!(
            opts.len(),
            config.num_threads,
            "opts must have exactly num_threads entries, got {} for {} threads",
            opts.len(),
            config.num_threads
        );
        Engine { config, opts }
    }

    /// Runs to completion and returns the best individual found, along with
    /// the final progress counters. `seed` is the run-wide PRNG base seed;
    /// the same seed and the same `num_threads` reproduce the same run.
    pub fn run(self, seed: u64) -> EvolutionResult<T> {
        if self.config.use_greedy {
            crate::greedy::run(&self.config, &self.opts, seed)
        } else {
            run_standard(&self.config, &self.opts, seed)
        }
    }
}

fn run_standard<T: Evolvable>(config: &EngineConfig, opts: &[T::Options], seed: u64) -> EvolutionResult<T> {
    let total = if config.keep_last_generation {
        config.population_size * 2
    } else {
        config.population_size
    };
    let payloads: Vec<T> = (0..total).map(|k| T::init(&opts[k % config.num_threads])).collect();
    let store = IndividualStore::new(payloads, config.keep_last_generation);
    let mut prng_pool = PrngPool::new(config.num_threads, seed);

    let mut info = EvolutionInfo::default();
    let mut greedy_size = config.greedy_size;

    WorkerPool::scoped(config.num_threads, &store, opts, config, &mut prng_pool, |pool| {
        loop {
            // SCORE: every individual in the current generation.
            let population_size = store.population_size();
            pool.dispatch(Phase::Score, |t, range, _new_slots| {
                *range = index_range(population_size, t, config.num_threads);
            });

            // SORT: rank the handle array so [0, survivors) is correct.
            let survivors = config.survivors;
            partial_sort_by_fitness(store.handles_mut(), survivors, config.sort_order.is_max(), |backing_idx| {
                store.slot_ref(backing_idx).cached_fitness()
            });

            if config.verbose >= Verbosity::OneLine {
                let best_fitness = store.slot_ref(store.handle_at(0)).cached_fitness();
                info!(
                    "generation {} best fitness {} improvements {}",
                    info.generations_progressed, best_fitness, info.improvements
                );
            }

            // TERMINATE?
            if info.generations_progressed >= config.generation_limit {
                break;
            }
            if config.use_abort_requirement {
                if let Some(predicate) = &config.continue_ev {
                    let mut view = EngineView {
                        generations_progressed: info.generations_progressed,
                        improvements: info.improvements,
                        population_size: store.population_size(),
                        survivors: config.survivors,
                        deaths: config.deaths,
                        greedy_size,
                    };
                    let keep_going = predicate(&mut view);
                    greedy_size = view.greedy_size;
                    if !keep_going {
                        break;
                    }
                }
            }

            // SPAWN: fill the death region [survivors, population_size).
            let deaths = config.deaths;
            let new_slots_per_rank = if config.keep_last_generation {
                (0..deaths).map(|_| store.claim_free_slot()).collect::<Vec<_>>()
            } else {
                Vec::new()
            };

            let results = pool.dispatch(Phase::Spawn, |t, range, new_slots| {
                let (start, end) = index_range(deaths, t, config.num_threads);
                *range = (survivors + start, survivors + end);
                if config.keep_last_generation {
                    *new_slots = new_slots_per_rank[start..end].to_vec();
                }
            });

            // COMMIT
            let mut generation_improvements = 0u32;
            for (worker_improvements, handle_updates) in results {
                generation_improvements += worker_improvements;
                for (rank, new_backing_idx) in handle_updates {
                    let old_backing_idx = store.handle_at(rank);
                    store.recycle(old_backing_idx);
                    store.set_handle_at(rank, new_backing_idx);
                }
            }
            info.improvements = generation_improvements;
            info.generations_progressed += 1;

            if config.verbose >= Verbosity::High {
                debug!("committed generation {}: {} improvements", info.generations_progressed, generation_improvements);
            }
        }
    });

    let best_backing_idx = store.handle_at(0);
    if config.verbose >= Verbosity::Ultra {
        trace!("teardown: keeping backing slot {}", best_backing_idx);
    }
    let best = store.into_best(best_backing_idx);
    EvolutionResult { best, info }
}
