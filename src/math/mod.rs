//! Mathematical utilities for the engine

/// Response curves sampled at normalized positions
pub mod curve;
/// Seeded random substreams and distributions
pub mod random;

/// Golden ratio φ
pub const PHI: f64 = 1.618_033_988_749_895;

/// Golden angle `2π(1 − 1/φ)`, about 137.5°
pub const GOLDEN_ANGLE: f64 = std::f64::consts::TAU * (1.0 - 1.0 / PHI);
