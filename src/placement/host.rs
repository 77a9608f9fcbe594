//! Frame of the decorated object that placement algorithms work in

use crate::geometry::collection::GeometryCollection;
use crate::geometry::mesh::{Aabb, Mesh};
use crate::geometry::shape::{Distortion, Pose, ShapeModel};
use crate::io::configuration::GEOMETRY_EPSILON;
use glam::{DAffine3, DQuat, DVec3};
use std::f64::consts::PI;

/// What a placement algorithm knows about the object it decorates
///
/// Everything is taken from the primary instance of the host collection:
/// poses are computed in that instance's scaled and deformed frame and then
/// carried into the collection frame by [`HostFrame::transform`].
#[derive(Clone, Debug)]
pub struct HostFrame {
    /// Instance-to-collection transform
    pub transform: DAffine3,
    /// Instance scale
    pub scale: DVec3,
    /// Instance deformation
    pub distortion: Distortion,
    /// Analytic model of the shape, when it has one
    pub model: Option<ShapeModel>,
    /// Bounds in the instance frame after scaling and deformation
    pub bounds: Aabb,
    /// Decoration level of the host
    pub level: u32,
    mesh: Mesh,
}

impl HostFrame {
    /// Frame of the primary instance; `None` for an empty collection or a
    /// shape without vertices
    pub fn from_collection(host: &GeometryCollection) -> Option<Self> {
        let primary = host.primary()?;
        let bounds = primary.local_bounds()?;
        Some(Self {
            transform: primary.transform,
            scale: primary.scale,
            distortion: primary.distortion,
            model: primary.shape.model,
            bounds,
            level: primary.level,
            mesh: primary.local_mesh(),
        })
    }

    /// Scaled and deformed mesh in the instance frame
    pub const fn local_mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Extent along the axis the coil walks
    pub fn height(&self) -> f64 {
        self.model
            .map_or_else(|| self.bounds.size().y, |m| m.height() * self.scale.y)
    }

    /// Largest distance of the surface from the axis
    pub fn radius(&self) -> f64 {
        self.model.map_or_else(
            || {
                let size = self.bounds.size();
                size.x.max(size.z) * 0.5
            },
            |m| m.radius() * self.scale.x.max(self.scale.z),
        )
    }

    /// Normalized height of a point in the instance frame
    pub fn axial_fraction(&self, point: DVec3) -> f64 {
        let size = self.bounds.size().y;
        if size <= GEOMETRY_EPSILON {
            return 0.0;
        }
        ((point.y - self.bounds.min.y) / size).clamp(0.0, 1.0)
    }

    /// Surface pose at `axis_fraction` and `azimuth`
    ///
    /// Shapes with a model answer through it; others are treated as an
    /// upright cylinder fitted to their bounds.
    pub fn surface_pose(
        &self,
        axis_fraction: f64,
        azimuth: f64,
        radial_factor: f64,
        counter_action: bool,
    ) -> Pose {
        if let Some(model) = self.model {
            return model.position(
                axis_fraction,
                azimuth,
                radial_factor,
                counter_action,
                self.scale,
                &self.distortion,
            );
        }
        let center = self.bounds.center();
        let size = self.bounds.size();
        let t = axis_fraction.clamp(0.0, 1.0);
        Pose::at(DVec3::new(
            (size.x * 0.5 * radial_factor).mul_add(azimuth.cos(), center.x),
            size.y.mul_add(t, self.bounds.min.y),
            (size.z * 0.5 * radial_factor).mul_add(azimuth.sin(), center.z),
        ))
    }

    /// Pose on a ball of `radius` at polar angle `theta` and `azimuth`,
    /// moved `inward` (a fraction of the radius) toward the centre
    ///
    /// The rotation turns +Y onto the outward normal. A shape model, when
    /// present, decides the exact position and may add its counter rotation.
    pub fn ball_pose(
        &self,
        theta: f64,
        azimuth: f64,
        radius: f64,
        inward: f64,
        counter_action: bool,
    ) -> Pose {
        let normal = spherical_direction(theta, azimuth);
        let align = DQuat::from_rotation_arc(DVec3::Y, normal);
        let radial_factor = 1.0 - inward;
        match self.model {
            Some(model) => {
                let pose = model.position(
                    1.0 - theta / PI,
                    azimuth,
                    radial_factor,
                    counter_action,
                    self.scale,
                    &self.distortion,
                );
                Pose {
                    translation: pose.translation,
                    rotation: pose.rotation * align,
                }
            }
            None => Pose {
                translation: self.bounds.center() + normal * radius * radial_factor,
                rotation: align,
            },
        }
    }
}

/// Unit vector at polar angle `theta` from +Y and `azimuth` from +X toward +Z
pub fn spherical_direction(theta: f64, azimuth: f64) -> DVec3 {
    DVec3::new(
        theta.sin() * azimuth.cos(),
        theta.cos(),
        theta.sin() * azimuth.sin(),
    )
}
