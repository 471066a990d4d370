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

//! A small, fast per-thread PRNG and the pool that hands one out to each
//! worker. Workers never share a generator: each gets its own stream, seeded
//! distinctly, so there is no locking anywhere on the hot path.

use rand::RngCore;

/// xorshift128+, as used by e.g. V8 and a long line of scripting-language
/// runtimes. Not cryptographically secure; fast and good enough for
/// evolutionary search.
#[derive(Clone)]
pub struct Xorshift128Plus {
    s0: u64,
    s1: u64,
}

impl Xorshift128Plus {
    /// Seeds the generator from a 64-bit value, splitting it into two
    /// non-zero lanes with splitmix64 so that nearby seeds (e.g. thread
    /// indices 0, 1, 2, ...) don't produce correlated streams.
    pub fn from_seed(seed: u64) -> Self {
        let mut z = seed.wrapping_add(0x9E3779B97F4A7C15);
        let s0 = splitmix64(&mut z);
        let s1 = splitmix64(&mut z);
        Xorshift128Plus {
            s0: if s0 == 0 && s1 == 0 { 1 } else { s0 },
            s1,
        }
    }

    fn next_u64_raw(&mut self) -> u64 {
        let mut s1 = self.s0;
        let s0 = self.s1;
        let result = s1.wrapping_add(s0);
        self.s0 = s0;
        s1 ^= s1 << 23;
        s1 ^= s1 >> 17;
        s1 ^= s0 ^ (s0 >> 26);
        self.s1 = s1;
        result
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

impl RngCore for Xorshift128Plus {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64_raw() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_raw()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core_fill_bytes(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// `RngCore::fill_bytes` default impl without pulling in `rand_core` as a
/// direct dependency: chunk the stream into native words.
fn rand_core_fill_bytes(rng: &mut Xorshift128Plus, dest: &mut [u8]) {
    let mut chunks = dest.chunks_exact_mut(8);
    for chunk in &mut chunks {
        chunk.copy_from_slice(&rng.next_u64_raw().to_le_bytes());
    }
    let rem = chunks.into_remainder();
    if !rem.is_empty() {
        let bytes = rng.next_u64_raw().to_le_bytes();
        rem.copy_from_slice(&bytes[..rem.len()]);
    }
}

/// One PRNG per worker thread, seeded distinctly from a run-wide base seed so
/// that re-running with the same base seed and the same thread count
/// reproduces the same streams.
pub struct PrngPool {
    prngs: Vec<Xorshift128Plus>,
}

impl PrngPool {
    pub fn new(num_threads: usize, base_seed: u64) -> Self {
        let prngs = (0..num_threads)
            .map(|i| Xorshift128Plus::from_seed(base_seed ^ (i as u64).wrapping_mul(0x2545F4914F6CDD1D)))
            .collect();
        PrngPool { prngs }
    }

    pub fn take(&mut self, thread_index: usize) -> Xorshift128Plus {
        self.prngs[thread_index].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn distinct_seeds_produce_distinct_streams() {
        let mut a = Xorshift128Plus::from_seed(1);
        let mut b = Xorshift128Plus::from_seed(2);
        let sample_a: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let sample_b: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_ne!(sample_a, sample_b);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = Xorshift128Plus::from_seed(42);
        let mut b = Xorshift128Plus::from_seed(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn gen_range_composes_with_rand_traits() {
        let mut rng = Xorshift128Plus::from_seed(7);
        for _ in 0..1000 {
            let x: u32 = rng.gen_range(0..10);
            assert!(x < 10);
        }
    }

    #[test]
    fn pool_hands_out_distinct_per_thread_streams() {
        let mut pool = PrngPool::new(4, 123);
        let mut first = pool.take(0);
        let mut second = pool.take(1);
        assert_ne!(first.next_u64(), second.next_u64());
    }
}
