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

//! The greedy driver: an alternate top-level loop to the main generation
//! engine, used when `use_greedy` is set. Rather than one shared population
//! ranked by a global sort, each worker searches a private sub-population
//! seeded from the best individual found so far, and the results are merged
//! once per round. See SPEC_FULL.md §4.5.
//!
//! Each round spawns its own `crossbeam::thread::scope`, the same one-shot
//! pattern the teacher's `Population::epochs_parallel` uses, rather than the
//! long-lived handshake pool in `workers.rs`: sub-population size can change
//! between rounds (`continue_ev` may rewrite `greedy_size`), so there is
//! nothing worth keeping parked between rounds here.

use log::{debug, info};

use crate::config::{EngineConfig, MutationMode};
use crate::engine::{EngineView, EvolutionInfo, EvolutionResult};
use crate::individual::Evolvable;
use crate::rng::PrngPool;
use crate::store::index_range;

pub(crate) fn run<T: Evolvable>(config: &EngineConfig, opts: &[T::Options], seed: u64) -> EvolutionResult<T> {
    let mut prng_pool = PrngPool::new(config.num_threads, seed);

    // Seed search: each worker creates `greedy_individuals` fresh
    // individuals and reports its own best; the global best seeds the
    // exploit phase below.
    let (mut global_best, mut global_best_fitness) = crossbeam::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(config.num_threads);
        for t in 0..config.num_threads {
            let opts_t = &opts[t];
            let (start, end) = index_range(config.greedy_individuals, t, config.num_threads);
            handles.push(scope.spawn(move |_| {
                let mut local_best: Option<(T, i64)> = None;
                for _ in start..end {
                    let candidate = T::init(opts_t);
                    let fitness = candidate.fitness(opts_t);
                    local_best = Some(match local_best {
                        Some((best, best_fitness)) if !is_improvement(best_fitness, fitness, config.sort_order.is_max()) => (best, best_fitness),
                        _ => (candidate, fitness),
                    });
                }
                local_best
            }));
        }
        handles
            .into_iter()
            .filter_map(|h| h.join().expect("seed-search worker panicked"))
            .fold(None, |acc, (candidate, fitness)| match acc {
                Some((best, best_fitness)) if !is_improvement(best_fitness, fitness, config.sort_order.is_max()) => Some((best, best_fitness)),
                _ => Some((candidate, fitness)),
            })
            .expect("greedy_individuals must be at least 1")
    })
    .expect("seed-search scope panicked");

    if config.verbose >= crate::config::Verbosity::OneLine {
        info!("greedy seed search: best fitness {}", global_best_fitness);
    }

    let mut info = EvolutionInfo::default();
    let mut greedy_size = config.greedy_size;

    loop {
        if info.generations_progressed >= config.generation_limit {
            break;
        }
        if config.use_abort_requirement {
            if let Some(predicate) = &config.continue_ev {
                let mut view = EngineView {
                    generations_progressed: info.generations_progressed,
                    improvements: info.improvements,
                    population_size: config.population_size,
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

        let round_best = crossbeam::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(config.num_threads);
            for t in 0..config.num_threads {
                let rng = prng_pool.take(t);
                let opts_t = &opts[t];
                let seed_individual = &global_best;
                handles.push(scope.spawn(move |_| exploit_round(seed_individual, opts_t, config, rng, greedy_size)));
            }
            handles
                .into_iter()
                .map(|h| h.join().expect("exploit worker panicked"))
                .fold(None, |acc: Option<(T, i64)>, (candidate, fitness)| match acc {
                    Some((best, best_fitness)) if !is_improvement(best_fitness, fitness, config.sort_order.is_max()) => Some((best, best_fitness)),
                    _ => Some((candidate, fitness)),
                })
                .expect("greedy_size must be at least 1")
        })
        .expect("exploit scope panicked");

        let (round_best_payload, round_best_fitness) = round_best;
        if is_improvement(global_best_fitness, round_best_fitness, config.sort_order.is_max()) {
            global_best = round_best_payload;
            global_best_fitness = round_best_fitness;
            info.improvements += 1;
        }
        info.generations_progressed += 1;

        if config.verbose >= crate::config::Verbosity::High {
            debug!("greedy round {} best fitness {}", info.generations_progressed, global_best_fitness);
        }
    }

    EvolutionResult { best: global_best, info }
}

/// True when `candidate_fitness` is strictly better than `current_fitness`
/// under the configured sort order.
fn is_improvement(current_fitness: i64, candidate_fitness: i64, sort_max: bool) -> bool {
    if sort_max {
        candidate_fitness > current_fitness
    } else {
        candidate_fitness < current_fitness
    }
}

/// Runs one private sub-population of `greedy_size` individuals seeded from
/// `seed_individual`, and returns the best one found.
fn exploit_round<T: Evolvable>(
    seed_individual: &T,
    opts: &T::Options,
    config: &EngineConfig,
    mut rng: crate::rng::Xorshift128Plus,
    greedy_size: usize,
) -> (T, i64) {
    use rand::{Rng, RngCore};

    let mut pop: Vec<T> = (0..greedy_size)
        .map(|_| {
            let mut individual = T::init(opts);
            individual.clone_from(seed_individual, opts);
            individual
        })
        .collect();

    let mutation_mode = config.mutation_mode();
    for i in 1..pop.len() {
        if config.use_recombination && pop.len() > 1 {
            let partner = rng.gen_range(0..pop.len());
            let (left, right) = pop.split_at_mut(i);
            let dst = &mut right[0];
            let parent_b = if partner == i { &left[0] } else if partner < i { &left[partner] } else { &left[0] };
            let parent_a = &left[0];
            dst.recombine(parent_a, parent_b, opts);
        }
        let should_mutate = match mutation_mode {
            MutationMode::Never => false,
            MutationMode::Always => true,
            MutationMode::Probabilistic => rng.next_u32() < config.i_mut_probability,
        };
        if should_mutate {
            pop[i].mutate(opts);
        }
    }

    pop.into_iter()
        .map(|individual| {
            let fitness = individual.fitness(opts);
            (individual, fitness)
        })
        .fold(None, |acc: Option<(T, i64)>, (candidate, fitness)| match acc {
            Some((best, best_fitness)) if !is_improvement(best_fitness, fitness, config.sort_order.is_max()) => Some((best, best_fitness)),
            _ => Some((candidate, fitness)),
        })
        .expect("greedy_size must be at least 1")
}
