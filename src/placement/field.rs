//! Scatter placement over the surface of the decorated mesh

use crate::engine::evaluator::Evaluator;
use crate::geometry::collection::GeometryCollection;
use crate::geometry::mesh::{Edge, Mesh, point_in_triangle};
use crate::geometry::shape::Pose;
use crate::graph::module::{ModuleId, Variables};
use crate::io::configuration::{
    DEFAULT_ESTIMATE_SAMPLES, GEOMETRY_EPSILON, MAX_GRID_POINTS_PER_FACE,
};
use crate::math::random::{RandomStream, Seed};
use crate::placement::decorated::{
    DecoratorRequest, DistortionParams, SizeParams, back_reference, decorated_decorator,
    estimate_footprint,
};
use crate::placement::host::HostFrame;
use bitvec::prelude::*;
use glam::{DQuat, DVec3};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Where on the mesh decorators go
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStrategy {
    /// Every vertex once
    Vertices,
    /// Every face centroid once
    #[default]
    FaceCenters,
    /// Midpoint of the longest edge of face pairs
    QuadCenters,
    /// Grid over each face spaced by the decorator footprint
    Uniform,
}

/// Parameters of a field module
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Site strategy
    pub strategy: SiteStrategy,
    /// Fraction of sites that receive a decorator
    pub occupancy: f64,
    /// Radius of the planar jitter disk
    pub jitter_radius: f64,
    /// Random turn about the up axis
    pub spin: bool,
    /// Turn the decorator up axis onto the surface normal
    pub align_to_normal: bool,
    /// Offset into the surface along the normal
    pub inward: f64,
    /// Decorator samples used to estimate the footprint
    pub estimate: usize,
    /// Size perturbation
    pub size: SizeParams,
    /// Deformation of each decorator
    pub distortion: DistortionParams,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            strategy: SiteStrategy::FaceCenters,
            occupancy: 1.0,
            jitter_radius: 0.0,
            spin: false,
            align_to_normal: true,
            inward: 0.0,
            estimate: DEFAULT_ESTIMATE_SAMPLES,
            size: SizeParams::default(),
            distortion: DistortionParams::default(),
        }
    }
}

impl FieldParams {
    /// Whether any parameter reads the back-reference value
    pub fn reads_back_reference(&self) -> bool {
        self.size.reads_back_reference() || self.distortion.reads_back_reference()
    }
}

/// Candidate point on the surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSite {
    /// Position in the mesh frame
    pub position: DVec3,
    /// Unit outward normal
    pub normal: DVec3,
}

/// One or two faces visited together by the quad strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadPair {
    /// Face whose longest edge was used
    pub first: usize,
    /// Neighbour across that edge, `None` when it was already taken
    pub second: Option<usize>,
    /// The shared edge
    pub edge: Edge,
}

/// A site at every vertex
pub fn vertex_sites(mesh: &Mesh) -> Vec<SurfaceSite> {
    mesh.vertices()
        .iter()
        .zip(mesh.normals())
        .map(|(&position, &normal)| SurfaceSite { position, normal })
        .collect()
}

/// A site at every face centroid
pub fn face_center_sites(mesh: &Mesh) -> Vec<SurfaceSite> {
    (0..mesh.faces().len())
        .filter_map(|face| {
            Some(SurfaceSite {
                position: mesh.face_center(face)?,
                normal: mesh.face_normal(face)?,
            })
        })
        .collect()
}

/// Pair each face with its neighbour across its longest edge
///
/// Faces are taken in order and flagged once visited. A face whose
/// neighbour is already flagged, or that has none, forms a pair on its own,
/// so every face of the mesh appears in exactly one pair.
pub fn quad_pairs(mesh: &Mesh) -> Vec<QuadPair> {
    let adjacency = mesh.edge_faces();
    let mut visited = bitvec![0; mesh.faces().len()];
    let mut pairs = Vec::new();

    for (index, face) in mesh.faces().iter().enumerate() {
        if visited.get(index).is_some_and(|bit| *bit) {
            continue;
        }
        let Some(edge) = longest_edge(mesh, face) else {
            continue;
        };
        visited.set(index, true);

        let second = adjacency
            .get(&edge)
            .into_iter()
            .flatten()
            .copied()
            .find(|&other| other != index && visited.get(other).is_some_and(|bit| !*bit));
        if let Some(other) = second {
            visited.set(other, true);
        }
        pairs.push(QuadPair {
            first: index,
            second,
            edge,
        });
    }
    pairs
}

fn longest_edge(mesh: &Mesh, face: &[usize; 3]) -> Option<Edge> {
    let [a, b, c] = *face;
    let vertices = mesh.vertices();
    let length = |i: usize, j: usize| -> Option<f64> {
        Some(vertices.get(i)?.distance_squared(*vertices.get(j)?))
    };
    [(a, b), (b, c), (c, a)]
        .into_iter()
        .filter_map(|(i, j)| Some((Edge::new(i, j), length(i, j)?)))
        .max_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(edge, _)| edge)
}

/// A site per quad pair: the shared edge midpoint with the averaged vertex
/// normal, or the face centroid for a lone face
pub fn quad_center_sites(mesh: &Mesh) -> Vec<SurfaceSite> {
    quad_pairs(mesh)
        .into_iter()
        .filter_map(|pair| match pair.second {
            Some(second) => {
                let faces = mesh.faces();
                let mut corners: Vec<usize> = faces
                    .get(pair.first)?
                    .iter()
                    .chain(faces.get(second)?.iter())
                    .copied()
                    .collect();
                corners.sort_unstable();
                corners.dedup();
                let normal = corners
                    .iter()
                    .filter_map(|&v| mesh.normals().get(v))
                    .sum::<DVec3>()
                    .normalize_or_zero();
                let (Some(a), Some(b)) = (
                    mesh.vertices().get(pair.edge.0),
                    mesh.vertices().get(pair.edge.1),
                ) else {
                    return None;
                };
                Some(SurfaceSite {
                    position: (*a + *b) * 0.5,
                    normal,
                })
            }
            None => Some(SurfaceSite {
                position: mesh.face_center(pair.first)?,
                normal: mesh.face_normal(pair.first)?,
            }),
        })
        .collect()
}

/// Grid sites at `step` spacing over every face
///
/// The grid runs along the two shortest edges of the face from the vertex
/// they share, at `(i + ½)·step` and `(j + ½)·step`; points outside the
/// triangle are dropped.
pub fn uniform_sites(mesh: &Mesh, step: f64) -> Vec<SurfaceSite> {
    let mut sites = Vec::new();
    if step <= GEOMETRY_EPSILON {
        return sites;
    }
    for face in 0..mesh.faces().len() {
        let (Some(corners), Some(normal)) = (mesh.face_corners(face), mesh.face_normal(face))
        else {
            continue;
        };
        let (origin, u, v) = short_edge_frame(corners);
        let (len_u, len_v) = (u.length(), v.length());
        if len_u <= GEOMETRY_EPSILON || len_v <= GEOMETRY_EPSILON {
            continue;
        }
        let (dir_u, dir_v) = (u / len_u, v / len_v);
        let (face_step, count_u, count_v) = face_grid(len_u, len_v, step);
        if face_step > step {
            warn!(
                "face {face}: grid spacing widened from {step:.4} to {face_step:.4} \
                 to stay within {MAX_GRID_POINTS_PER_FACE} points"
            );
        }
        let [a, b, c] = corners;
        for i in 0..count_u {
            for j in 0..count_v {
                let point = origin
                    + dir_u * ((i as f64 + 0.5) * face_step)
                    + dir_v * ((j as f64 + 0.5) * face_step);
                if point_in_triangle(point, a, b, c) {
                    sites.push(SurfaceSite {
                        position: point,
                        normal,
                    });
                }
            }
        }
    }
    sites
}

/// Spacing and point counts of a face grid, the spacing widened until the
/// grid fits [`MAX_GRID_POINTS_PER_FACE`]
fn face_grid(len_u: f64, len_v: f64, step: f64) -> (f64, usize, usize) {
    let counts = |s: f64| ((len_u / s).ceil() as usize, (len_v / s).ceil() as usize);
    let (mut count_u, mut count_v) = counts(step);
    if count_u.saturating_mul(count_v) <= MAX_GRID_POINTS_PER_FACE {
        return (step, count_u, count_v);
    }
    let mut face_step = step.max((len_u * len_v / MAX_GRID_POINTS_PER_FACE as f64).sqrt());
    (count_u, count_v) = counts(face_step);
    while count_u.saturating_mul(count_v) > MAX_GRID_POINTS_PER_FACE {
        face_step *= 1.01;
        (count_u, count_v) = counts(face_step);
    }
    (face_step, count_u, count_v)
}

/// Shared vertex and the two shortest edge vectors leaving it
fn short_edge_frame(corners: [DVec3; 3]) -> (DVec3, DVec3, DVec3) {
    let [a, b, c] = corners;
    // The longest edge is opposite the shared vertex
    let opposite_a = b.distance_squared(c);
    let opposite_b = c.distance_squared(a);
    let opposite_c = a.distance_squared(b);
    if opposite_a >= opposite_b && opposite_a >= opposite_c {
        (a, b - a, c - a)
    } else if opposite_b >= opposite_c {
        (b, c - b, a - b)
    } else {
        (c, a - c, b - c)
    }
}

/// Sites of `mesh` for a strategy; `step` is only used by the uniform grid
pub fn surface_sites(mesh: &Mesh, strategy: SiteStrategy, step: f64) -> Vec<SurfaceSite> {
    match strategy {
        SiteStrategy::Vertices => vertex_sites(mesh),
        SiteStrategy::FaceCenters => face_center_sites(mesh),
        SiteStrategy::QuadCenters => quad_center_sites(mesh),
        SiteStrategy::Uniform => uniform_sites(mesh, step),
    }
}

/// Scatter decorators over the surface of `host`
///
/// Draw order: footprint estimate forks (uniform strategy only), then per
/// site: back-reference fork (when read), occupancy test (when below 1),
/// jitter pair (when the radius is positive), spin (when enabled), size
/// pair, decorator fork.
pub fn place(
    ev: &mut Evaluator<'_>,
    module: ModuleId,
    params: &FieldParams,
    host: &GeometryCollection,
    seed: Seed,
) -> Option<GeometryCollection> {
    let frame = HostFrame::from_collection(host)?;
    let mesh = frame.local_mesh();
    if mesh.is_empty() && params.strategy != SiteStrategy::Vertices {
        return None;
    }
    let mut stream = RandomStream::new(seed);

    let step = if params.strategy == SiteStrategy::Uniform {
        let Some(estimate) = estimate_footprint(ev, module, params.estimate, &mut stream) else {
            ev.record_draws(module, stream.draws());
            return None;
        };
        (estimate.object_area / params.occupancy.max(GEOMETRY_EPSILON)).sqrt()
    } else {
        0.0
    };

    let sites = surface_sites(mesh, params.strategy, step);
    debug!(
        "field {module}: {} sites with {:?}",
        sites.len(),
        params.strategy
    );

    let mut placed = GeometryCollection::new();
    let mut count = 0_usize;
    for site in sites {
        let axial = frame.axial_fraction(site.position);
        let variables = Variables {
            axial_position: axial,
            azimuth: 0.0,
            level: f64::from(frame.level),
        };
        let back = if params.reads_back_reference() {
            back_reference(ev, module, &variables, &mut stream)
        } else {
            None
        };

        if params.occupancy < 1.0 && !stream.chance(params.occupancy) {
            continue;
        }

        let normal = if site.normal.length_squared() > GEOMETRY_EPSILON {
            site.normal
        } else {
            DVec3::Y
        };
        let mut position = site.position - normal * params.inward;
        if params.jitter_radius > 0.0 {
            let distance = params.jitter_radius * stream.uniform01().sqrt();
            let angle = stream.uniform_range(0.0, TAU);
            let (tangent, bitangent) = normal.any_orthonormal_pair();
            position += (tangent * angle.cos() + bitangent * angle.sin()) * distance;
        }
        let spin = if params.spin {
            stream.uniform_range(0.0, TAU)
        } else {
            0.0
        };
        let (size_r, size_y) = params.size.sample(&mut stream, axial, back);
        let child = stream.fork();

        let request = DecoratorRequest {
            size_r,
            size_y,
            distortion: params.distortion.evaluate(axial, back),
            axial_position: axial,
            azimuth: 0.0,
        };
        let Some(decorator) = decorated_decorator(ev, module, &request, child) else {
            continue;
        };

        let align = if params.align_to_normal {
            DQuat::from_rotation_arc(DVec3::Y, normal)
        } else {
            DQuat::IDENTITY
        };
        let pose = Pose {
            translation: position,
            rotation: align * DQuat::from_rotation_y(spin),
        };
        trace!("field {module}: site at {position:?}");
        placed.merge(decorator.placed(&(frame.transform * pose.to_affine()), frame.level + 1));
        ev.record_placement(module);
        count += 1;
    }

    ev.record_draws(module, stream.draws());
    debug!("field {module}: placed {count} decorators");
    placed.non_empty()
}
