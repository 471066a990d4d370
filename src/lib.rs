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

//! `evolve` is a parallel evolutionary-algorithm engine: hand it a type that
//! knows how to initialize, mutate, recombine and score itself, and it will
//! run a population of them to a generation limit or a caller-supplied
//! stopping predicate, spreading the work across a fixed pool of worker
//! threads that live for the whole run.
//!
//! Implement [`Evolvable`] for your individual type, build an [`EngineConfig`]
//! with [`EngineConfig::builder`], and call [`evolve`] (or build an
//! [`Engine`] directly if you want to hold onto the constructed-but-not-run
//! state).
//!
//! # Examples
//!
//! ```
//! use evolve::{evolve, EngineConfig, Evolvable, SortOrder};
//!
//! #[derive(Clone)]
//! struct Vektor {
//!     values: [i64; 6],
//! }
//!
//! struct Bounds {
//!     max: i64,
//! }
//!
//! impl Evolvable for Vektor {
//!     type Options = Bounds;
//!
//!     fn init(opts: &Bounds) -> Self {
//!         let mut values = [0i64; 6];
//!         for (i, v) in values.iter_mut().enumerate() {
//!             *v = if i % 2 == 0 { opts.max } else { 0 };
//!         }
//!         Vektor { values }
//!     }
//!
//!     fn clone_from(&mut self, source: &Self, _opts: &Bounds) {
//!         self.values = source.values;
//!     }
//!
//!     fn mutate(&mut self, opts: &Bounds) {
//!         for v in self.values.iter_mut() {
//!             *v = (*v + 1).min(opts.max).max(0);
//!         }
//!     }
//!
//!     fn recombine(&mut self, parent_a: &Self, parent_b: &Self, _opts: &Bounds) {
//!         for i in 0..6 {
//!             self.values[i] = if i % 2 == 0 { parent_a.values[i] } else { parent_b.values[i] };
//!         }
//!     }
//!
//!     // Lower is better: the sum of cyclic distances between adjacent values.
//!     fn fitness(&self, _opts: &Bounds) -> i64 {
//!         (0..6)
//!             .map(|i| (self.values[i] - self.values[(i + 1) % 6]).abs())
//!             .sum()
//!     }
//! }
//!
//! let config = EngineConfig::builder()
//!     .population_size(64)
//!     .num_threads(2)
//!     .generation_limit(200)
//!     .use_recombination(true)
//!     .use_mutation(true)
//!     .mutation_probability(0.2)
//!     .death_percentage(0.5)
//!     .sort_order(SortOrder::Min)
//!     .build()
//!     .unwrap();
//!
//! let opts = vec![Bounds { max: 20 }, Bounds { max: 20 }];
//! let result = evolve::<Vektor>(config, opts, 42);
//! assert_eq!(result.info.generations_progressed, 200);
//! assert!(result.best.fitness(&Bounds { max: 20 }) < 120); // better than the unevolved starting vector
//! ```

mod config;
mod engine;
mod error;
mod greedy;
mod individual;
mod rng;
mod sort;
mod store;
mod workers;

pub use config::{EngineConfig, EngineConfigBuilder, SortOrder, Verbosity};
pub use engine::{Engine, EngineView, EvolutionInfo, EvolutionResult};
pub use error::ConfigError;
pub use individual::Evolvable;

/// Constructs an [`Engine`] from `config` and `opts` and runs it to
/// completion in one call. `opts` must have exactly `config.num_threads`
/// entries. `seed` is the run-wide PRNG base seed.
pub fn evolve<T: Evolvable>(config: EngineConfig, opts: Vec<T::Options>, seed: u64) -> EvolutionResult<T> {
    Engine::new(config, opts).run(seed)
}
