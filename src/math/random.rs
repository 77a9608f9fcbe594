//! Deterministic seed threading for every stochastic decision
//!
//! A [`Seed`] is an opaque 64-bit state. Each primitive draw expands the seed
//! into a ChaCha8 block, takes the first word as the successor seed and the
//! rest as the payload, so every primitive advances the sequence by exactly
//! one logical step whatever it returns.

use crate::io::configuration::GAUSSIAN_FOLD_SPAN;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Opaque random state; drawing from it yields a value and the next seed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(u64);

impl Seed {
    /// Wrap a raw 64-bit state
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw 64-bit state
    pub const fn value(self) -> u64 {
        self.0
    }

    fn expand(self) -> (ChaCha8Rng, Self) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.0);
        let next = Self(rng.next_u64());
        (rng, next)
    }

    /// Uniform deviate in `[0, 1)` and the advanced seed
    pub fn uniform01(self) -> (f64, Self) {
        let (mut rng, next) = self.expand();
        (rng.random::<f64>(), next)
    }

    /// Uniform deviate in `[-1, 1)` and the advanced seed
    pub fn uniform_signed(self) -> (f64, Self) {
        let (value, next) = self.uniform01();
        (value.mul_add(2.0, -1.0), next)
    }

    /// Standard normal deviate folded into `[-1, 1]` and the advanced seed
    ///
    /// The deviate is divided by [`GAUSSIAN_FOLD_SPAN`] standard deviations and
    /// reflected back at the bounds, so tails never run away and the draw
    /// still costs a single step.
    pub fn bounded_gaussian(self) -> (f64, Self) {
        let (mut rng, next) = self.expand();
        let z: f64 = rng.sample(StandardNormal);
        (fold_unit(z / GAUSSIAN_FOLD_SPAN), next)
    }

    /// Sample `distribution` and return the value with the advanced seed
    pub fn distribution(self, distribution: &Distribution) -> (f64, Self) {
        let (deviate, next) = match distribution.kind {
            DistributionKind::Uniform => self.uniform_signed(),
            DistributionKind::Gaussian => self.bounded_gaussian(),
        };
        (
            distribution.half_width.mul_add(deviate, distribution.mean),
            next,
        )
    }

    /// Split off a child seed for a recursive call
    ///
    /// Returns `(child, next)`: the child starts an independent sequence while
    /// the caller continues from `next`.
    pub fn fork(self) -> (Self, Self) {
        let (mut rng, next) = self.expand();
        (Self(rng.next_u64()), next)
    }

    /// Advance one step, discarding the payload
    pub fn skip(self) -> Self {
        self.expand().1
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

/// Reflect `x` into `[-1, 1]` like a triangle wave
pub fn fold_unit(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    let t = (x + 1.0).rem_euclid(4.0);
    let folded = if t > 2.0 { 4.0 - t } else { t };
    folded - 1.0
}

/// Shape of a [`Distribution`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    /// `mean ± half_width` uniformly
    #[default]
    Uniform,
    /// `mean + half_width × folded normal`
    Gaussian,
}

/// Configured random spread around a mean value
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Centre value
    pub mean: f64,
    /// Maximum deviation from the mean
    #[serde(default)]
    pub half_width: f64,
    /// Deviate shape
    #[serde(default)]
    pub kind: DistributionKind,
}

impl Distribution {
    /// Uniform spread of `half_width` around `mean`
    pub const fn uniform(mean: f64, half_width: f64) -> Self {
        Self {
            mean,
            half_width,
            kind: DistributionKind::Uniform,
        }
    }

    /// Folded Gaussian spread of `half_width` around `mean`
    pub const fn gaussian(mean: f64, half_width: f64) -> Self {
        Self {
            mean,
            half_width,
            kind: DistributionKind::Gaussian,
        }
    }

    /// Degenerate distribution that always yields `value`
    ///
    /// Sampling it still consumes a step.
    pub const fn constant(value: f64) -> Self {
        Self::uniform(value, 0.0)
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

/// Local cursor over a seed sequence, owned by exactly one evaluation call
///
/// The stream is never shared across a branch boundary: recursive calls get a
/// child [`Seed`] from [`RandomStream::fork`] and build their own stream.
#[derive(Clone, Debug)]
pub struct RandomStream {
    seed: Seed,
    draws: u64,
}

impl RandomStream {
    /// Start a stream at `seed`
    pub const fn new(seed: Seed) -> Self {
        Self { seed, draws: 0 }
    }

    /// Current position in the sequence
    pub const fn seed(&self) -> Seed {
        self.seed
    }

    /// Number of steps consumed so far
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform deviate in `[0, 1)`
    pub fn uniform01(&mut self) -> f64 {
        let (value, next) = self.seed.uniform01();
        self.advance(next);
        value
    }

    /// Uniform deviate in `[low, high)`
    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        let t = self.uniform01();
        (high - low).mul_add(t, low)
    }

    /// Bernoulli test against `probability`; always consumes one step
    pub fn chance(&mut self, probability: f64) -> bool {
        self.uniform01() < probability
    }

    /// Sample a configured distribution
    pub fn sample(&mut self, distribution: &Distribution) -> f64 {
        let (value, next) = self.seed.distribution(distribution);
        self.advance(next);
        value
    }

    /// Uniform index in `0..len`, `None` when `len == 0` (no step consumed)
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let value = self.uniform01();
        Some(((value * len as f64) as usize).min(len - 1))
    }

    /// Child seed for a recursive call; the stream continues independently
    pub fn fork(&mut self) -> Seed {
        let (child, next) = self.seed.fork();
        self.advance(next);
        child
    }

    /// Consume and discard one step
    pub fn skip(&mut self) {
        let next = self.seed.skip();
        self.advance(next);
    }

    fn advance(&mut self, next: Seed) {
        self.seed = next;
        self.draws += 1;
    }
}
