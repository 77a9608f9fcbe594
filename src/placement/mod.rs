//! Placement algorithms that put decorators onto a host object
//!
//! Every algorithm shares one pattern: walk candidate sites on the host,
//! obtain a decorated decorator for each accepted site, move it into the
//! site pose and merge it into the result.

/// Coil: spiral and ring placement along an axis
pub mod coil;
/// The shared decorated-decorator helper and footprint estimate
pub mod decorated;
/// Field: scatter over a mesh surface
pub mod field;
/// Golden ball: golden-ratio placement over a spherical cap
pub mod golden_ball;
/// Host frame derived from the decorated object
pub mod host;

pub use coil::{CoilMode, CoilParams};
pub use field::{FieldParams, SiteStrategy};
pub use golden_ball::{BallMode, GoldenBallParams};
