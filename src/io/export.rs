//! Instance records and baked Wavefront OBJ export

use crate::geometry::collection::{GeometryCollection, Instance, Material};
use crate::geometry::shape::Distortion;
use crate::io::error::{DecoratorError, Result, file_system};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable description of one placed instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Name of the shape's object module
    pub shape: String,
    /// Decoration level
    pub level: u32,
    /// Instance-to-collection affine transform, column-major 3×4
    pub transform: [f64; 12],
    /// Size applied before deformation
    pub scale: [f64; 3],
    /// Radial size relative to the parent
    pub size_r: f64,
    /// Axial size relative to the parent
    pub size_y: f64,
    /// Deformation
    pub distortion: Distortion,
    /// Material with its placement parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
}

impl From<&Instance> for InstanceRecord {
    fn from(instance: &Instance) -> Self {
        Self {
            shape: instance.shape.name.clone(),
            level: instance.level,
            transform: instance.transform.to_cols_array(),
            scale: instance.scale.to_array(),
            size_r: instance.size_r,
            size_y: instance.size_y,
            distortion: instance.distortion,
            material: instance.material.clone(),
        }
    }
}

/// Serializable result of one generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Root seed of the run
    pub seed: u64,
    /// Name of the requested module
    pub module: String,
    /// Every placed instance in collection order
    pub instances: Vec<InstanceRecord>,
}

impl GenerationRecord {
    /// Record of `collection` generated by `module` with `seed`
    pub fn new(seed: u64, module: impl Into<String>, collection: &GeometryCollection) -> Self {
        Self {
            seed,
            module: module.into(),
            instances: collection.iter().map(InstanceRecord::from).collect(),
        }
    }
}

/// Write a generation record as pretty JSON
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written
pub fn write_json(record: &GenerationRecord, output_path: &Path) -> Result<()> {
    let text =
        serde_json::to_string_pretty(record).map_err(|source| DecoratorError::Serialization {
            what: "generation record",
            source,
        })?;
    write_text(output_path, &text)
}

/// Bake every instance into one OBJ document
///
/// Each instance becomes an `o` group named after its shape, level and
/// position in the collection, with vertices and normals in the collection
/// frame.
pub fn to_obj(collection: &GeometryCollection) -> String {
    let mut out = String::from("# treedecor\n");
    let mut offset = 1_usize;
    for (index, instance) in collection.iter().enumerate() {
        let mesh = instance.world_mesh();
        out.push_str(&format!(
            "o {}_{}_{index}\n",
            instance.shape.name.replace(char::is_whitespace, "_"),
            instance.level
        ));
        for v in mesh.vertices() {
            out.push_str(&format!("v {:.6} {:.6} {:.6}\n", v.x, v.y, v.z));
        }
        for n in mesh.normals() {
            out.push_str(&format!("vn {:.6} {:.6} {:.6}\n", n.x, n.y, n.z));
        }
        for face in mesh.faces() {
            let [a, b, c] = face.map(|vertex| vertex + offset);
            out.push_str(&format!("f {a}//{a} {b}//{b} {c}//{c}\n"));
        }
        offset += mesh.vertices().len();
    }
    out
}

/// Write the baked OBJ document
///
/// # Errors
///
/// Returns an error if the file cannot be written
pub fn write_obj(collection: &GeometryCollection, output_path: &Path) -> Result<()> {
    write_text(output_path, &to_obj(collection))
}

fn write_text(output_path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| file_system(parent, "create directory", e))?;
    }
    std::fs::write(output_path, text).map_err(|e| file_system(output_path, "write", e))
}
