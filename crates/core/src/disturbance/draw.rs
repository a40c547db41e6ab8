//! Injectable uniform random draws for disturbance decisions
//!
//! Every stochastic decision in a stand run consumes exactly one draw from a
//! [`UniformSource`]. Production runs wrap a seeded `rand` generator in
//! [`RngSource`]; tests replay a fixed sequence with [`ScriptedSource`] so
//! each year's outcome is known in advance.

use rand::Rng;

/// Source of uniform draws on [0, 1)
///
/// A draw `u` triggers an event with probability `p` when `u < p`, so a
/// probability of zero never fires and a probability of one always does.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

/// Adapter from any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        RngSource { rng }
    }
}

impl<R: Rng> UniformSource for RngSource<R> {
    #[inline]
    fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted
///
/// Values are clamped to [0, 1]. A draw of exactly 1.0 never triggers an
/// event, which makes `ScriptedSource::quiet()` a convenient "nothing happens"
/// source.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Replay `draws` in order. An empty sequence behaves like [`quiet`](Self::quiet).
    pub fn new(draws: Vec<f64>) -> Self {
        let draws = if draws.is_empty() {
            vec![1.0]
        } else {
            draws.into_iter().map(|d| d.clamp(0.0, 1.0)).collect()
        };
        ScriptedSource { draws, cursor: 0 }
    }

    /// A source whose draws never trigger any event
    pub fn quiet() -> Self {
        Self::new(vec![1.0])
    }

    /// Number of draws consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl UniformSource for ScriptedSource {
    fn next_uniform(&mut self) -> f64 {
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}
