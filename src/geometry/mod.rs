//! Geometry kernel consumed by the placement algorithms
//!
//! This module contains the geometry-related functionality including:
//! - Triangle meshes, bounds and primitive builders
//! - Shapes with analytic models and the distortion kernel
//! - Placed instances and the collections modules exchange

/// Placed instances and geometry collections
pub mod collection;
/// Triangle meshes and bounding boxes
pub mod mesh;
/// Shapes, shape models and distortion
pub mod shape;

pub use collection::{GeometryCollection, Instance};
pub use mesh::{Aabb, Mesh};
