//! Seeded module-graph engine for procedurally decorating tree and plant geometry
//!
//! A graph of modules pulls geometry from object sources, places decorator
//! copies onto host geometry with coil, golden-ball and field placement
//! algorithms, and routes between alternatives with weighted random choice.
//! Every random decision is derived from a single root seed, so a pass over
//! the same graph with the same seed always yields the same collection.

#![forbid(unsafe_code)]

/// Generation passes and the pull/push evaluation protocol
pub mod engine;
/// Meshes, procedural shapes and instance collections
pub mod geometry;
/// Module graph, reverse link index and weighted selection
pub mod graph;
/// Input/output operations and error handling
pub mod io;
/// Seeded random streams, response curves and constants
pub mod math;
/// Placement algorithms that decorate host geometry
pub mod placement;

pub use io::error::{DecoratorError, Result};
