//! Shapes, shape models and the bend/twist/taper distortion kernel

use crate::geometry::collection::Material;
use crate::geometry::mesh::Mesh;
use crate::io::configuration::GEOMETRY_EPSILON;
use glam::{DAffine3, DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Non-uniform deformation applied along the +Y axis of a shape
///
/// With `t = y / height`: the cross-section is scaled by `1 − taper·t`,
/// rotated about Y by `twist·t`, and the axis is bent toward +X so that its
/// tangent turns by `bend·t`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    /// Total bend angle over the height, radians
    #[serde(default)]
    pub bend: f64,
    /// Total twist angle over the height, radians
    #[serde(default)]
    pub twist: f64,
    /// Fractional radius loss at the top
    #[serde(default)]
    pub taper: f64,
}

impl Distortion {
    /// No deformation
    pub const IDENTITY: Self = Self {
        bend: 0.0,
        twist: 0.0,
        taper: 0.0,
    };

    /// Deformation with the given parameters
    pub const fn new(bend: f64, twist: f64, taper: f64) -> Self {
        Self { bend, twist, taper }
    }

    /// Whether applying this changes nothing
    pub fn is_identity(&self) -> bool {
        self.bend.abs() <= GEOMETRY_EPSILON
            && self.twist.abs() <= GEOMETRY_EPSILON
            && self.taper.abs() <= GEOMETRY_EPSILON
    }

    /// Accumulate another deformation on top of this one
    #[must_use]
    pub fn combined(&self, other: &Self) -> Self {
        Self {
            bend: self.bend + other.bend,
            twist: self.twist + other.twist,
            taper: (1.0 - (1.0 - self.taper) * (1.0 - other.taper)).min(1.0),
        }
    }

    /// Deform a local point of a shape `height` tall
    pub fn apply(&self, point: DVec3, height: f64) -> DVec3 {
        if self.is_identity() || height <= GEOMETRY_EPSILON {
            return point;
        }
        let t = point.y / height;
        let shrink = self.taper.mul_add(-t, 1.0).max(0.0);
        let section = DQuat::from_rotation_y(self.twist * t)
            * DVec3::new(point.x * shrink, 0.0, point.z * shrink);

        let angle = self.bend * t;
        if self.bend.abs() <= GEOMETRY_EPSILON {
            return DVec3::new(section.x, point.y, section.z);
        }
        // Bend about a centre at x = R on the Y axis plane
        let radius = height / self.bend;
        let offset = radius - section.x;
        DVec3::new(
            offset.mul_add(-angle.cos(), radius),
            offset * angle.sin(),
            section.z,
        )
    }

    /// Rotation the deformation induces on a local frame at `axis_fraction`
    pub fn frame_at(&self, axis_fraction: f64) -> DQuat {
        DQuat::from_rotation_z(-self.bend * axis_fraction)
            * DQuat::from_rotation_y(self.twist * axis_fraction)
    }
}

/// Placement pose: translation plus rotation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Position in the parent frame
    pub translation: DVec3,
    /// Orientation in the parent frame
    pub rotation: DQuat,
}

impl Pose {
    /// Pose at `translation` without rotation
    pub const fn at(translation: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    /// Affine form of the pose
    pub fn to_affine(&self) -> DAffine3 {
        DAffine3::from_rotation_translation(self.rotation, self.translation)
    }
}

/// Analytic description a shape exposes to modules that decorate it
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeModel {
    /// Truncated cone along +Y from `y = 0`
    Cylinder {
        /// Radius at the base
        radius_bottom: f64,
        /// Radius at the top
        radius_top: f64,
        /// Height
        height: f64,
    },
    /// Sphere centred on the origin
    Sphere {
        /// Radius
        radius: f64,
    },
}

impl ShapeModel {
    /// Extent along the axis before scaling
    pub fn height(&self) -> f64 {
        match *self {
            Self::Cylinder { height, .. } => height,
            Self::Sphere { radius } => 2.0 * radius,
        }
    }

    /// Largest radius about the axis before scaling
    pub fn radius(&self) -> f64 {
        match *self {
            Self::Cylinder {
                radius_bottom,
                radius_top,
                ..
            } => radius_bottom.max(radius_top),
            Self::Sphere { radius } => radius,
        }
    }

    /// Surface pose at `axis_fraction ∈ [0, 1]` and `azimuth`
    ///
    /// `radial_factor` scales the distance from the axis (1 = on the surface).
    /// The instance `scale` and `distortion` are applied so the pose follows
    /// the deformed shape; with `counter_action` the pose rotation undoes the
    /// frame change the deformation causes at that height, otherwise it is the
    /// identity. Spheres ignore distortion; their `axis_fraction` runs from the
    /// south pole (0) to the north pole (1).
    pub fn position(
        &self,
        axis_fraction: f64,
        azimuth: f64,
        radial_factor: f64,
        counter_action: bool,
        scale: DVec3,
        distortion: &Distortion,
    ) -> Pose {
        let t = axis_fraction.clamp(0.0, 1.0);
        match *self {
            Self::Cylinder {
                radius_bottom,
                radius_top,
                height,
            } => {
                let radius = (radius_top - radius_bottom).mul_add(t, radius_bottom) * radial_factor;
                let local = DVec3::new(
                    radius * azimuth.cos() * scale.x,
                    t * height * scale.y,
                    radius * azimuth.sin() * scale.z,
                );
                let translation = distortion.apply(local, height * scale.y);
                let rotation = if counter_action {
                    distortion.frame_at(t)
                } else {
                    DQuat::IDENTITY
                };
                Pose {
                    translation,
                    rotation,
                }
            }
            Self::Sphere { radius } => {
                // Measured from the south pole like every other axis fraction
                let polar = (1.0 - t) * PI;
                let direction = DVec3::new(
                    polar.sin() * azimuth.cos(),
                    polar.cos(),
                    polar.sin() * azimuth.sin(),
                );
                Pose::at(direction * scale * radius * radial_factor)
            }
        }
    }
}

/// Declarative shape recipe stored on object modules
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeSpec {
    /// Capped truncated cone, typically a trunk or branch
    Cylinder {
        /// Radius at the base
        radius_bottom: f64,
        /// Radius at the top
        radius_top: f64,
        /// Height
        height: f64,
        /// Segments around the axis
        #[serde(default = "default_segments")]
        segments: usize,
    },
    /// UV sphere, typically a crown or fruit
    Sphere {
        /// Radius
        radius: f64,
        /// Segments around the axis
        #[serde(default = "default_segments")]
        segments: usize,
        /// Rings from pole to pole
        #[serde(default = "default_rings")]
        rings: usize,
    },
    /// Flat quad
    Leaf {
        /// Width across
        width: f64,
        /// Length along +Y
        length: f64,
    },
    /// Axis-aligned box resting on the origin
    Cuboid {
        /// Extent per axis
        size: [f64; 3],
    },
    /// Explicit triangle mesh
    Mesh {
        /// Vertex positions
        vertices: Vec<[f64; 3]>,
        /// Vertex index triples
        faces: Vec<[usize; 3]>,
    },
}

const fn default_segments() -> usize {
    12
}

const fn default_rings() -> usize {
    8
}

impl ShapeSpec {
    /// Build the mesh and model for this recipe
    pub fn build(&self, name: &str, material: Option<Material>) -> Shape {
        let (mesh, model) = match self {
            Self::Cylinder {
                radius_bottom,
                radius_top,
                height,
                segments,
            } => (
                Mesh::cylinder(*radius_bottom, *radius_top, *height, *segments),
                Some(ShapeModel::Cylinder {
                    radius_bottom: *radius_bottom,
                    radius_top: *radius_top,
                    height: *height,
                }),
            ),
            Self::Sphere {
                radius,
                segments,
                rings,
            } => (
                Mesh::uv_sphere(*radius, *segments, *rings),
                Some(ShapeModel::Sphere { radius: *radius }),
            ),
            Self::Leaf { width, length } => (Mesh::leaf(*width, *length), None),
            Self::Cuboid { size } => (Mesh::cuboid(DVec3::from_array(*size)), None),
            Self::Mesh { vertices, faces } => (
                Mesh::new(
                    vertices.iter().copied().map(DVec3::from_array).collect(),
                    faces.clone(),
                ),
                None,
            ),
        };
        Shape {
            name: name.to_string(),
            mesh,
            model,
            material,
        }
    }
}

/// Built geometry shared by every instance placed from one object module
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    /// Name of the producing module
    pub name: String,
    /// Triangle mesh in local coordinates
    pub mesh: Mesh,
    /// Optional analytic model used by decorating modules
    pub model: Option<ShapeModel>,
    /// Material template copied onto each instance
    pub material: Option<Material>,
}

impl Shape {
    /// Height the deformation kernel measures `t` against, after `scale_y`
    pub fn deform_height(&self, scale_y: f64) -> f64 {
        let local = self
            .model
            .map(|m| m.height())
            .or_else(|| self.mesh.bounds().map(|b| b.max.y))
            .unwrap_or(0.0);
        local * scale_y
    }

    /// Local vertex position after scaling and deformation
    pub fn deformed_vertex(&self, vertex: DVec3, scale: DVec3, distortion: &Distortion) -> DVec3 {
        let scaled = vertex * scale;
        if matches!(self.model, Some(ShapeModel::Sphere { .. })) {
            return scaled;
        }
        distortion.apply(scaled, self.deform_height(scale.y))
    }
}
