//! Triangle meshes, bounding boxes and primitive builders

use crate::io::configuration::GEOMETRY_EPSILON;
use glam::{DAffine3, DVec3};
use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Aabb {
    /// Box spanning `min` to `max`
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for no points
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    /// Extent along each axis
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Centre point
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Smallest box containing both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Eight corner points
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after an affine transform
    #[must_use]
    pub fn transformed(&self, transform: &DAffine3) -> Self {
        let corners = self.corners().map(|c| transform.transform_point3(c));
        Self::from_points(corners).unwrap_or(*self)
    }
}

/// Undirected edge key with the smaller vertex index first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(pub usize, pub usize);

impl Edge {
    /// Normalized edge between two vertices
    pub const fn new(a: usize, b: usize) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Indexed triangle mesh with per-vertex normals
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<DVec3>,
    normals: Vec<DVec3>,
    faces: Vec<[usize; 3]>,
}

impl Mesh {
    /// Mesh with smooth normals averaged from the faces
    ///
    /// Faces referencing missing vertices are dropped.
    pub fn new(vertices: Vec<DVec3>, faces: Vec<[usize; 3]>) -> Self {
        let count = vertices.len();
        let faces: Vec<[usize; 3]> = faces
            .into_iter()
            .filter(|f| f.iter().all(|&v| v < count))
            .collect();
        let mut mesh = Self {
            vertices,
            normals: Vec::new(),
            faces,
        };
        mesh.recompute_normals();
        mesh
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Unit vertex normals, index-aligned with the vertices
    pub fn normals(&self) -> &[DVec3] {
        &self.normals
    }

    /// Triangles as vertex index triples
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Whether the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Distinct edges in first-seen face order
    pub fn edges(&self) -> Vec<Edge> {
        let mut seen = HashMap::new();
        let mut edges = Vec::new();
        for face in &self.faces {
            for edge in face_edges(face) {
                if seen.insert(edge, ()).is_none() {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Map from each edge to the faces sharing it, in face order
    pub fn edge_faces(&self) -> HashMap<Edge, Vec<usize>> {
        let mut map: HashMap<Edge, Vec<usize>> = HashMap::new();
        for (index, face) in self.faces.iter().enumerate() {
            for edge in face_edges(face) {
                map.entry(edge).or_default().push(index);
            }
        }
        map
    }

    /// Corner positions of a face
    pub fn face_corners(&self, face: usize) -> Option<[DVec3; 3]> {
        let [a, b, c] = *self.faces.get(face)?;
        Some([
            *self.vertices.get(a)?,
            *self.vertices.get(b)?,
            *self.vertices.get(c)?,
        ])
    }

    /// Unit normal of a face following its winding, zero when degenerate
    pub fn face_normal(&self, face: usize) -> Option<DVec3> {
        let [a, b, c] = self.face_corners(face)?;
        Some((b - a).cross(c - a).normalize_or_zero())
    }

    /// Centroid of a face
    pub fn face_center(&self, face: usize) -> Option<DVec3> {
        let [a, b, c] = self.face_corners(face)?;
        Some((a + b + c) / 3.0)
    }

    /// Area of a face
    pub fn face_area(&self, face: usize) -> Option<f64> {
        let [a, b, c] = self.face_corners(face)?;
        Some((b - a).cross(c - a).length() * 0.5)
    }

    /// Bounds of all vertices
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().copied())
    }

    /// Copy with every vertex mapped through `f`; normals are recomputed
    #[must_use]
    pub fn map_vertices(&self, f: impl Fn(DVec3) -> DVec3) -> Self {
        let mut mesh = Self {
            vertices: self.vertices.iter().map(|&v| f(v)).collect(),
            normals: Vec::new(),
            faces: self.faces.clone(),
        };
        mesh.recompute_normals();
        mesh
    }

    /// Copy with an affine transform applied
    #[must_use]
    pub fn transformed(&self, transform: &DAffine3) -> Self {
        self.map_vertices(|v| transform.transform_point3(v))
    }

    fn recompute_normals(&mut self) {
        let mut normals = vec![DVec3::ZERO; self.vertices.len()];
        for face in &self.faces {
            let [a, b, c] = *face;
            let (Some(&pa), Some(&pb), Some(&pc)) =
                (self.vertices.get(a), self.vertices.get(b), self.vertices.get(c))
            else {
                continue;
            };
            // Area weighted
            let n = (pb - pa).cross(pc - pa);
            for v in face {
                if let Some(slot) = normals.get_mut(*v) {
                    *slot += n;
                }
            }
        }
        self.normals = normals.into_iter().map(DVec3::normalize_or_zero).collect();
    }

    /// Closed capped cylinder along +Y from `y = 0` to `y = height`
    pub fn cylinder(radius_bottom: f64, radius_top: f64, height: f64, segments: usize) -> Self {
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(2 * segments + 2);
        for (radius, y) in [(radius_bottom, 0.0), (radius_top, height)] {
            for i in 0..segments {
                let angle = TAU * i as f64 / segments as f64;
                vertices.push(DVec3::new(radius * angle.cos(), y, radius * angle.sin()));
            }
        }
        let bottom_center = vertices.len();
        vertices.push(DVec3::ZERO);
        let top_center = vertices.len();
        vertices.push(DVec3::new(0.0, height, 0.0));

        let mut faces = Vec::with_capacity(4 * segments);
        for i in 0..segments {
            let j = (i + 1) % segments;
            let (b0, b1, t0, t1) = (i, j, segments + i, segments + j);
            faces.push([b0, t0, b1]);
            faces.push([b1, t0, t1]);
            faces.push([bottom_center, b0, b1]);
            faces.push([top_center, t1, t0]);
        }
        Self::new(vertices, faces)
    }

    /// Closed UV sphere centred on the origin
    pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::with_capacity(segments * (rings - 1) + 2);
        vertices.push(DVec3::new(0.0, radius, 0.0));
        for ring in 1..rings {
            let polar = PI * ring as f64 / rings as f64;
            for i in 0..segments {
                let azimuth = TAU * i as f64 / segments as f64;
                vertices.push(
                    DVec3::new(
                        polar.sin() * azimuth.cos(),
                        polar.cos(),
                        polar.sin() * azimuth.sin(),
                    ) * radius,
                );
            }
        }
        let south = vertices.len();
        vertices.push(DVec3::new(0.0, -radius, 0.0));

        let ring_start = |ring: usize| 1 + (ring - 1) * segments;
        let mut faces = Vec::new();
        for i in 0..segments {
            let j = (i + 1) % segments;
            faces.push([0, ring_start(1) + j, ring_start(1) + i]);
        }
        for ring in 1..rings - 1 {
            let (upper, lower) = (ring_start(ring), ring_start(ring + 1));
            for i in 0..segments {
                let j = (i + 1) % segments;
                faces.push([upper + i, upper + j, lower + i]);
                faces.push([upper + j, lower + j, lower + i]);
            }
        }
        let last = ring_start(rings - 1);
        for i in 0..segments {
            let j = (i + 1) % segments;
            faces.push([south, last + i, last + j]);
        }
        Self::new(vertices, faces)
    }

    /// Flat leaf quad in the XY plane standing on the origin
    pub fn leaf(width: f64, length: f64) -> Self {
        let half = width * 0.5;
        let vertices = vec![
            DVec3::new(-half, 0.0, 0.0),
            DVec3::new(half, 0.0, 0.0),
            DVec3::new(half, length, 0.0),
            DVec3::new(-half, length, 0.0),
        ];
        Self::new(vertices, vec![[0, 1, 2], [0, 2, 3]])
    }

    /// Closed axis-aligned box resting on the origin
    pub fn cuboid(size: DVec3) -> Self {
        let (hx, hz) = (size.x * 0.5, size.z * 0.5);
        let vertices = vec![
            DVec3::new(-hx, 0.0, -hz),
            DVec3::new(hx, 0.0, -hz),
            DVec3::new(hx, 0.0, hz),
            DVec3::new(-hx, 0.0, hz),
            DVec3::new(-hx, size.y, -hz),
            DVec3::new(hx, size.y, -hz),
            DVec3::new(hx, size.y, hz),
            DVec3::new(-hx, size.y, hz),
        ];
        let faces = vec![
            [0, 1, 2],
            [0, 2, 3],
            [4, 6, 5],
            [4, 7, 6],
            [0, 4, 5],
            [0, 5, 1],
            [1, 5, 6],
            [1, 6, 2],
            [2, 6, 7],
            [2, 7, 3],
            [3, 7, 4],
            [3, 4, 0],
        ];
        Self::new(vertices, faces)
    }
}

fn face_edges(face: &[usize; 3]) -> [Edge; 3] {
    let [a, b, c] = *face;
    [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)]
}

/// Whether `p` lies inside triangle `abc` (boundary included)
///
/// The point is projected onto the triangle plane before the barycentric test.
pub fn point_in_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> bool {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d02 = v0.dot(v2);
    let d11 = v1.dot(v1);
    let d12 = v1.dot(v2);
    let denom = d00.mul_add(d11, -(d01 * d01));
    if denom.abs() <= GEOMETRY_EPSILON {
        return false;
    }
    let u = d11.mul_add(d02, -(d01 * d12)) / denom;
    let v = d00.mul_add(d12, -(d01 * d02)) / denom;
    let tolerance = 1e-12;
    u >= -tolerance && v >= -tolerance && u + v <= 1.0 + tolerance
}
