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

use thiserror::Error;

/// Everything that can go wrong validating an [`crate::config::EngineConfig`]
/// before an [`crate::engine::Engine`] is constructed. There is no runtime
/// error path beyond this: once an engine exists, it cannot fail to run.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("population_size must be greater than 0")]
    EmptyPopulation,

    #[error("num_threads must be at least 1")]
    NoThreads,

    #[error("death_percentage must be in [0, 1), got {0}")]
    InvalidDeathPercentage(f64),

    #[error("mutation_probability must be in [0, 1], got {0}")]
    InvalidMutationProbability(f64),

    #[error("at least one of use_recombination or use_mutation must be enabled")]
    NoOffspringOperator,

    #[error("greedy_size must be at least 1 when use_greedy is enabled")]
    EmptyGreedySize,

    #[error("greedy_individuals must be at least 1 when use_greedy is enabled")]
    EmptyGreedyIndividuals,
}
