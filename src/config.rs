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

use crate::engine::EngineView;
use crate::error::ConfigError;

/// Fitness ordering direction. Replaces the `EV_SORT_MAX`/`EV_SORT_MIN` flag
/// pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Higher fitness is better.
    Max,
    /// Lower fitness is better.
    Min,
}

impl SortOrder {
    pub(crate) fn is_max(self) -> bool {
        matches!(self, SortOrder::Max)
    }
}

/// Progress-reporting detail, mapped onto `log` levels. `Quiet` emits
/// nothing; the rest are cumulative in verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    OneLine,
    High,
    Ultra,
}

/// How mutation is applied once an offspring is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MutationMode {
    Never,
    Always,
    Probabilistic,
}

/// Validated, immutable configuration for one evolutionary run.
///
/// Built via [`EngineConfigBuilder`]; construct one with
/// [`EngineConfig::builder`].
pub struct EngineConfig {
    pub(crate) population_size: usize,
    pub(crate) num_threads: usize,
    pub(crate) generation_limit: u64,
    pub(crate) mutation_probability: f64,
    pub(crate) death_percentage: f64,
    pub(crate) survivors: usize,
    pub(crate) deaths: usize,
    pub(crate) i_mut_probability: u32,

    pub(crate) use_recombination: bool,
    pub(crate) use_mutation: bool,
    pub(crate) always_mutate: bool,
    pub(crate) keep_last_generation: bool,
    pub(crate) use_abort_requirement: bool,
    pub(crate) use_greedy: bool,
    pub(crate) sort_order: SortOrder,
    pub(crate) verbose: Verbosity,

    pub(crate) greedy_size: usize,
    pub(crate) greedy_individuals: usize,

    pub(crate) continue_ev: Option<Box<dyn Fn(&mut EngineView) -> bool + Send + Sync>>,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub(crate) fn mutation_mode(&self) -> MutationMode {
        if !self.use_mutation {
            MutationMode::Never
        } else if self.always_mutate {
            MutationMode::Always
        } else {
            MutationMode::Probabilistic
        }
    }
}

/// Builder for [`EngineConfig`]. Mirrors the teacher's own
/// `Population::set_size`/`set_breed_factor` chained-setter style.
pub struct EngineConfigBuilder {
    population_size: usize,
    num_threads: usize,
    generation_limit: u64,
    mutation_probability: f64,
    death_percentage: f64,
    use_recombination: bool,
    use_mutation: bool,
    always_mutate: bool,
    keep_last_generation: bool,
    use_abort_requirement: bool,
    use_greedy: bool,
    sort_order: SortOrder,
    verbose: Verbosity,
    greedy_size: usize,
    greedy_individuals: usize,
    continue_ev: Option<Box<dyn Fn(&mut EngineView) -> bool + Send + Sync>>,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        EngineConfigBuilder {
            population_size: 0,
            num_threads: 1,
            generation_limit: u64::MAX,
            mutation_probability: 0.0,
            death_percentage: 0.5,
            use_recombination: false,
            use_mutation: false,
            always_mutate: false,
            keep_last_generation: false,
            use_abort_requirement: false,
            use_greedy: false,
            sort_order: SortOrder::Min,
            verbose: Verbosity::Quiet,
            greedy_size: 1,
            greedy_individuals: 1,
            continue_ev: None,
        }
    }
}

impl EngineConfigBuilder {
    pub fn population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    pub fn generation_limit(mut self, limit: u64) -> Self {
        self.generation_limit = limit;
        self
    }

    pub fn mutation_probability(mut self, p: f64) -> Self {
        self.mutation_probability = p;
        self
    }

    pub fn death_percentage(mut self, p: f64) -> Self {
        self.death_percentage = p;
        self
    }

    pub fn use_recombination(mut self, enabled: bool) -> Self {
        self.use_recombination = enabled;
        self
    }

    pub fn use_mutation(mut self, enabled: bool) -> Self {
        self.use_mutation = enabled;
        self
    }

    pub fn always_mutate(mut self, enabled: bool) -> Self {
        self.always_mutate = enabled;
        self
    }

    pub fn keep_last_generation(mut self, enabled: bool) -> Self {
        self.keep_last_generation = enabled;
        self
    }

    pub fn use_abort_requirement(mut self, enabled: bool) -> Self {
        self.use_abort_requirement = enabled;
        self
    }

    pub fn use_greedy(mut self, enabled: bool) -> Self {
        self.use_greedy = enabled;
        self
    }

    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    pub fn verbose(mut self, level: Verbosity) -> Self {
        self.verbose = level;
        self
    }

    pub fn greedy_size(mut self, size: usize) -> Self {
        self.greedy_size = size;
        self
    }

    pub fn greedy_individuals(mut self, n: usize) -> Self {
        self.greedy_individuals = n;
        self
    }

    /// Sets the abort predicate consulted once per generation when
    /// `use_abort_requirement` is set. Receives a mutable view of run
    /// state; only `greedy_size` may be written back through it.
    pub fn continue_ev<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&mut EngineView) -> bool + Send + Sync + 'static,
    {
        self.continue_ev = Some(Box::new(predicate));
        self
    }

    /// Validates the configuration and freezes it into an [`EngineConfig`].
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.num_threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        if !(0.0..1.0).contains(&self.death_percentage) {
            return Err(ConfigError::InvalidDeathPercentage(self.death_percentage));
        }
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(ConfigError::InvalidMutationProbability(self.mutation_probability));
        }
        if !self.use_recombination && !self.use_mutation {
            return Err(ConfigError::NoOffspringOperator);
        }
        if self.use_greedy && self.greedy_size == 0 {
            return Err(ConfigError::EmptyGreedySize);
        }
        if self.use_greedy && self.greedy_individuals == 0 {
            return Err(ConfigError::EmptyGreedyIndividuals);
        }

        let deaths = (self.population_size as f64 * self.death_percentage).round() as usize;
        let deaths = deaths.min(self.population_size - 1);
        let survivors = self.population_size - deaths;
        let i_mut_probability = (self.mutation_probability * u32::MAX as f64) as u32;

        Ok(EngineConfig {
            population_size: self.population_size,
            num_threads: self.num_threads,
            generation_limit: self.generation_limit,
            mutation_probability: self.mutation_probability,
            death_percentage: self.death_percentage,
            survivors,
            deaths,
            i_mut_probability,
            use_recombination: self.use_recombination,
            use_mutation: self.use_mutation,
            always_mutate: self.always_mutate,
            keep_last_generation: self.keep_last_generation,
            use_abort_requirement: self.use_abort_requirement,
            use_greedy: self.use_greedy,
            sort_order: self.sort_order,
            verbose: self.verbose,
            greedy_size: self.greedy_size,
            greedy_individuals: self.greedy_individuals,
            continue_ev: self.continue_ev,
        })
    }
}
