//! Placed geometry instances and the collections modules exchange

use crate::geometry::mesh::{Aabb, Mesh};
use crate::geometry::shape::{Distortion, Shape};
use crate::io::configuration::MIN_SHRINK;
use glam::{DAffine3, DVec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Material parameter receiving the normalized axial position of a placement
pub const AXIAL_POSITION_PARAMETER: &str = "axial_position";
/// Material parameter receiving the normalized azimuth of a placement
pub const AZIMUTH_PARAMETER: &str = "azimuth";

/// Opaque material reference with named numeric parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Host material name
    pub name: String,
    /// Numeric shader parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
}

impl Material {
    /// Overwrite `key` only when the material already declares it
    pub fn set_if_present(&mut self, key: &str, value: f64) -> bool {
        match self.parameters.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// One placed copy of a shape
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    /// Shared geometry
    pub shape: Rc<Shape>,
    /// Local-to-collection transform
    pub transform: DAffine3,
    /// Non-uniform size applied before deformation
    pub scale: DVec3,
    /// Deformation applied after scaling
    pub distortion: Distortion,
    /// Decoration depth, 0 for the producing object
    pub level: u32,
    /// Radial size factor relative to the parent
    pub size_r: f64,
    /// Axial size factor relative to the parent
    pub size_y: f64,
    /// Per-instance material copy
    pub material: Option<Material>,
}

impl Instance {
    /// Untransformed level-0 instance of `shape`
    pub fn new(shape: Rc<Shape>) -> Self {
        let material = shape.material.clone();
        Self {
            shape,
            transform: DAffine3::IDENTITY,
            scale: DVec3::ONE,
            distortion: Distortion::IDENTITY,
            level: 0,
            size_r: 1.0,
            size_y: 1.0,
            material,
        }
    }

    /// Bounds in the instance's own frame after scaling and deformation
    pub fn local_bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.local_vertices())
    }

    /// Extent of [`Instance::local_bounds`]
    pub fn get_bounds(&self) -> DVec3 {
        self.local_bounds().map_or(DVec3::ZERO, |b| b.size())
    }

    /// Bounds in the collection frame
    pub fn world_bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.world_vertices())
    }

    /// Scale so the undeformed bounds measure `x × y × z`; zero extents stay
    pub fn set_size(&mut self, x: f64, y: f64, z: f64) {
        let Some(bounds) = self.shape.mesh.bounds() else {
            return;
        };
        let extent = bounds.size();
        let fit = |target: f64, current: f64, keep: f64| {
            if current > 0.0 {
                (target / current).max(MIN_SHRINK)
            } else {
                keep
            }
        };
        self.scale = DVec3::new(
            fit(x, extent.x, self.scale.x),
            fit(y, extent.y, self.scale.y),
            fit(z, extent.z, self.scale.z),
        );
    }

    /// Multiply the size radially and axially and add a deformation
    pub fn resize_and_distort(&mut self, size_r: f64, size_y: f64, distortion: &Distortion) {
        let size_r = size_r.max(MIN_SHRINK);
        let size_y = size_y.max(MIN_SHRINK);
        self.scale *= DVec3::new(size_r, size_y, size_r);
        self.size_r *= size_r;
        self.size_y *= size_y;
        self.distortion = self.distortion.combined(distortion);
    }

    /// Scaled and deformed vertices in the instance frame
    pub fn local_vertices(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.shape
            .mesh
            .vertices()
            .iter()
            .map(|&v| self.shape.deformed_vertex(v, self.scale, &self.distortion))
    }

    /// Vertices in the collection frame
    pub fn world_vertices(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.local_vertices()
            .map(|v| self.transform.transform_point3(v))
    }

    /// Scaled and deformed mesh in the instance frame
    pub fn local_mesh(&self) -> Mesh {
        self.shape
            .mesh
            .map_vertices(|v| self.shape.deformed_vertex(v, self.scale, &self.distortion))
    }

    /// Fully baked mesh in the collection frame
    pub fn world_mesh(&self) -> Mesh {
        self.local_mesh().transformed(&self.transform)
    }
}

/// Ordered list of placed instances
///
/// Collections are produced fresh by every evaluation call and combined with
/// [`GeometryCollection::merge`]; a returned collection is never shared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryCollection {
    instances: Vec<Instance>,
}

impl GeometryCollection {
    /// Empty collection
    pub const fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    /// Collection holding one instance
    pub fn single(instance: Instance) -> Self {
        Self {
            instances: vec![instance],
        }
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether there are no instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances in order
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Iterate instances in order
    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.instances.iter()
    }

    /// Append an instance
    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    /// Append every instance of `other`
    pub fn merge(&mut self, other: Self) {
        self.instances.extend(other.instances);
    }

    /// `Some(self)` unless empty
    pub fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }

    /// Lowest decoration level present
    pub fn min_level(&self) -> Option<u32> {
        self.instances.iter().map(|i| i.level).min()
    }

    /// Highest decoration level present
    pub fn max_level(&self) -> Option<u32> {
        self.instances.iter().map(|i| i.level).max()
    }

    /// The instance that represents this collection when it is decorated
    ///
    /// First instance at the lowest level.
    pub fn primary(&self) -> Option<&Instance> {
        let level = self.min_level()?;
        self.instances.iter().find(|i| i.level == level)
    }

    /// Bounds of every instance in the collection frame
    pub fn bounds(&self) -> Option<Aabb> {
        self.instances
            .iter()
            .filter_map(Instance::world_bounds)
            .reduce(|a, b| a.union(&b))
    }

    /// Copy with `transform` applied on top of every instance transform
    #[must_use]
    pub fn transformed(&self, transform: &DAffine3) -> Self {
        Self {
            instances: self
                .instances
                .iter()
                .map(|i| Instance {
                    transform: *transform * i.transform,
                    ..i.clone()
                })
                .collect(),
        }
    }

    /// Copy moved into a host frame with levels shifted by `level_offset`
    #[must_use]
    pub fn placed(&self, transform: &DAffine3, level_offset: u32) -> Self {
        let mut placed = self.transformed(transform);
        for instance in &mut placed.instances {
            instance.level += level_offset;
        }
        placed
    }

    /// Resize and deform the primary instances; deeper instances follow the
    /// resize through their transforms
    pub fn resize_and_distort(&mut self, size_r: f64, size_y: f64, distortion: &Distortion) {
        let Some(level) = self.min_level() else {
            return;
        };
        let size_r = size_r.max(MIN_SHRINK);
        let size_y = size_y.max(MIN_SHRINK);
        let stretch = DAffine3::from_scale(DVec3::new(size_r, size_y, size_r));
        for instance in &mut self.instances {
            if instance.level == level {
                instance.resize_and_distort(size_r, size_y, distortion);
                instance.transform.translation *= DVec3::new(size_r, size_y, size_r);
            } else {
                instance.transform = stretch * instance.transform;
                instance.size_r *= size_r;
                instance.size_y *= size_y;
            }
        }
    }

    /// Write the placement parameters into every primary material that
    /// declares them
    pub fn set_material_parameters(&mut self, axial_position: f64, azimuth: f64) {
        let Some(level) = self.min_level() else {
            return;
        };
        for instance in &mut self.instances {
            if instance.level != level {
                continue;
            }
            if let Some(material) = instance.material.as_mut() {
                material.set_if_present(AXIAL_POSITION_PARAMETER, axial_position);
                material.set_if_present(AZIMUTH_PARAMETER, azimuth);
            }
        }
    }
}

impl<'a> IntoIterator for &'a GeometryCollection {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}
