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

//! End-to-end scenarios against a six-valued `Vektor` individual, the same
//! shape used by the original library's own parallel test harness: fitness
//! is the sum of absolute cyclic differences between adjacent values, so a
//! perfectly flat vector scores zero.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use evolve::{evolve, ConfigError, Engine, EngineConfig, Evolvable, SortOrder};

#[derive(Clone, Debug)]
struct Vektor {
    values: [i64; 6],
}

/// Per-thread options slot. Carries its own seeded RNG rather than reaching
/// for `rand::thread_rng()`, so that `init`/`mutate` are exactly as
/// reproducible as the engine's own PRNG pool: two runs built from
/// `vektor_opts` with the same arguments draw identical streams. A `Mutex`
/// rather than a `RefCell` because `Evolvable::Options` must be `Sync` —
/// each worker only ever locks its own slot, so there's never contention.
struct Bounds {
    max: i64,
    rng: Mutex<StdRng>,
}

fn bounds(max: i64, seed: u64) -> Bounds {
    Bounds { max, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
}

impl Evolvable for Vektor {
    type Options = Bounds;

    fn init(opts: &Bounds) -> Self {
        let mut rng = opts.rng.lock().unwrap();
        let mut values = [0i64; 6];
        for v in values.iter_mut() {
            *v = rng.gen_range(0..=opts.max);
        }
        Vektor { values }
    }

    fn clone_from(&mut self, source: &Self, _opts: &Bounds) {
        self.values = source.values;
    }

    fn mutate(&mut self, opts: &Bounds) {
        let mut rng = opts.rng.lock().unwrap();
        let idx = rng.gen_range(0..6);
        let delta = if rng.gen_bool(0.5) { 1 } else { -1 };
        self.values[idx] = (self.values[idx] + delta).clamp(0, opts.max);
    }

    fn recombine(&mut self, parent_a: &Self, parent_b: &Self, _opts: &Bounds) {
        for i in 0..6 {
            self.values[i] = if i % 2 == 0 { parent_a.values[i] } else { parent_b.values[i] };
        }
    }

    fn fitness(&self, _opts: &Bounds) -> i64 {
        (0..6).map(|i| (self.values[i] - self.values[(i + 1) % 6]).abs()).sum()
    }
}

fn vektor_opts(num_threads: usize, max: i64) -> Vec<Bounds> {
    (0..num_threads as u64).map(|t| bounds(max, 0xC0FFEE ^ t)).collect()
}

#[test]
fn single_threaded_run_beats_an_unevolved_individual() {
    let opts = bounds(30, 0);
    let baseline_fitness: i64 = (0..20).map(|_| Vektor::init(&opts).fitness(&opts)).sum::<i64>() / 20;

    let config = EngineConfig::builder()
        .population_size(40)
        .num_threads(1)
        .generation_limit(300)
        .use_recombination(true)
        .use_mutation(true)
        .mutation_probability(0.3)
        .death_percentage(0.5)
        .sort_order(SortOrder::Min)
        .build()
        .unwrap();
    let result = evolve::<Vektor>(config, vektor_opts(1, 30), 1);
    assert_eq!(result.info.generations_progressed, 300);
    assert!(result.best.fitness(&opts) < baseline_fitness);
}

#[test]
fn multi_threaded_run_reaches_generation_limit() {
    let config = EngineConfig::builder()
        .population_size(64)
        .num_threads(4)
        .generation_limit(150)
        .use_recombination(true)
        .use_mutation(true)
        .mutation_probability(0.25)
        .death_percentage(0.5)
        .sort_order(SortOrder::Min)
        .build()
        .unwrap();
    let result = evolve::<Vektor>(config, vektor_opts(4, 40), 2);
    assert_eq!(result.info.generations_progressed, 150);
}

#[test]
fn discard_mode_best_fitness_is_monotonic_with_generation_count() {
    let opts = bounds(20, 0);

    let short_config = EngineConfig::builder()
        .population_size(32)
        .num_threads(2)
        .generation_limit(1)
        .use_mutation(true)
        .mutation_probability(1.0)
        .death_percentage(0.5)
        .keep_last_generation(false)
        .sort_order(SortOrder::Min)
        .build()
        .unwrap();
    let short_run = evolve::<Vektor>(short_config, vektor_opts(2, 20), 3);
    let short_best = short_run.best.fitness(&opts);

    let long_config = EngineConfig::builder()
        .population_size(32)
        .num_threads(2)
        .generation_limit(60)
        .use_mutation(true)
        .mutation_probability(1.0)
        .death_percentage(0.5)
        .keep_last_generation(false)
        .sort_order(SortOrder::Min)
        .build()
        .unwrap();
    let long_run = evolve::<Vektor>(long_config, vektor_opts(2, 20), 3);
    let long_best = long_run.best.fitness(&opts);

    // `vektor_opts` seeds each thread's RNG from its index alone, and the
    // engine's own PRNG pool is seeded from the `evolve` call's `seed`
    // argument, so the short and long runs draw identical streams (both for
    // `Vektor::init`/`mutate` and for parent selection) through the end of
    // generation 1 — same seed, same thread count, same initial population,
    // same first SCORE/SORT/SPAWN. In discard mode survivors are never
    // overwritten during SPAWN, so whichever backing slot holds the best
    // individual after generation 1 keeps holding it forever: every later
    // generation can only replace death-region slots with something at
    // least as good, never touch the slot ranked 0. The long run therefore
    // starts from exactly the short run's result and can only match or
    // improve on it over its remaining 59 generations.
    assert!(long_best <= short_best);
}

#[test]
fn keep_mode_run_completes_to_the_generation_limit() {
    let config = EngineConfig::builder()
        .population_size(48)
        .num_threads(3)
        .generation_limit(120)
        .use_recombination(true)
        .use_mutation(true)
        .mutation_probability(0.3)
        .death_percentage(0.4)
        .keep_last_generation(true)
        .sort_order(SortOrder::Min)
        .build()
        .unwrap();
    let result = evolve::<Vektor>(config, vektor_opts(3, 25), 5);
    assert_eq!(result.info.generations_progressed, 120);
}

#[test]
fn greedy_mode_converges_within_limit() {
    let config = EngineConfig::builder()
        .population_size(16)
        .num_threads(2)
        .generation_limit(6)
        .use_mutation(true)
        .mutation_probability(1.0)
        .death_percentage(0.5)
        .use_greedy(true)
        .greedy_size(8)
        .greedy_individuals(8)
        .sort_order(SortOrder::Min)
        .build()
        .unwrap();
    let result = evolve::<Vektor>(config, vektor_opts(2, 20), 6);
    assert_eq!(result.info.generations_progressed, 6);
}

#[test]
fn empty_population_is_rejected_at_construction() {
    let err = EngineConfig::builder().use_mutation(true).build().unwrap_err();
    assert_eq!(err, ConfigError::EmptyPopulation);
}

#[test]
fn abort_predicate_stops_run_at_chosen_generation() {
    let config = EngineConfig::builder()
        .population_size(24)
        .num_threads(1)
        .generation_limit(1000)
        .use_mutation(true)
        .mutation_probability(1.0)
        .death_percentage(0.5)
        .use_abort_requirement(true)
        .continue_ev(|view| view.generations_progressed < 10)
        .sort_order(SortOrder::Min)
        .build()
        .unwrap();
    let engine: Engine<Vektor> = Engine::new(config, vektor_opts(1, 20));
    let result = engine.run(7);
    assert_eq!(result.info.generations_progressed, 10);
}
