//! Tests for surface site strategies and scatter placement

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use std::collections::BTreeSet;
    use treedecor::engine::pass::GenerationPass;
    use treedecor::geometry::mesh::{Mesh, point_in_triangle};
    use treedecor::geometry::shape::ShapeSpec;
    use treedecor::graph::module::{DECORATOR_PORT, HOST_PORT, OUTPUT_PORT, ObjectParams};
    use treedecor::graph::{Module, ModuleGraph, ModuleId, ModuleKind};
    use treedecor::io::configuration::MAX_GRID_POINTS_PER_FACE;
    use treedecor::placement::field::{
        FieldParams, SiteStrategy, face_center_sites, quad_center_sites, quad_pairs,
        surface_sites, uniform_sites, vertex_sites,
    };

    fn object(name: &str, shape: ShapeSpec) -> Module {
        Module::new(
            name,
            ModuleKind::Object(ObjectParams {
                shape,
                material: None,
            }),
        )
    }

    /// Unit cube decorated by a field of small leaves
    fn cube_with_field(params: FieldParams) -> (ModuleGraph, ModuleId, ModuleId) {
        let mut graph = ModuleGraph::new();
        let cube = graph.add_module(object(
            "cube",
            ShapeSpec::Cuboid {
                size: [1.0, 1.0, 1.0],
            },
        ));
        let leaf = graph.add_module(object(
            "leaf",
            ShapeSpec::Leaf {
                width: 0.1,
                length: 0.1,
            },
        ));
        let field = graph.add_module(Module::new("field", ModuleKind::Field(params)));
        graph
            .link(cube, OUTPUT_PORT, field, HOST_PORT)
            .expect("host link");
        graph
            .link(leaf, OUTPUT_PORT, field, DECORATOR_PORT)
            .expect("decorator link");
        (graph, cube, field)
    }

    fn faces_in_pairs(mesh: &Mesh) -> Vec<usize> {
        quad_pairs(mesh)
            .iter()
            .flat_map(|pair| std::iter::once(pair.first).chain(pair.second))
            .collect()
    }

    // Tests that the triangles of a box pair up into its six quads
    // Verified by pairing across the shortest edge
    #[test]
    fn test_quad_pairs_on_cube() {
        let mesh = Mesh::cuboid(DVec3::ONE);
        let pairs = quad_pairs(&mesh);
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|pair| pair.second.is_some()));

        let faces = faces_in_pairs(&mesh);
        let unique: BTreeSet<usize> = faces.iter().copied().collect();
        assert_eq!(faces.len(), 12);
        assert_eq!(unique.len(), 12);
    }

    // Tests that every face of a sphere lands in exactly one pair
    // Verified by not flagging the partner face
    #[test]
    fn test_quad_pairs_cover_sphere() {
        let mesh = Mesh::uv_sphere(1.0, 8, 4);
        assert_eq!(mesh.vertices().len(), 26);
        assert_eq!(mesh.faces().len(), 48);

        let faces = faces_in_pairs(&mesh);
        let unique: BTreeSet<usize> = faces.iter().copied().collect();
        assert_eq!(faces.len(), 48);
        assert_eq!(unique, (0..48).collect());
        assert_eq!(quad_center_sites(&mesh).len(), quad_pairs(&mesh).len());
    }

    // Tests that quad sites sit on the shared diagonal of each box side
    // Verified by using the centroid of the first face
    #[test]
    fn test_quad_center_sites() {
        let mesh = Mesh::cuboid(DVec3::ONE);
        let sites = quad_center_sites(&mesh);
        assert_eq!(sites.len(), 6);
        let bottom = sites.first().expect("bottom side");
        assert!(bottom.position.distance(DVec3::ZERO) < 1e-12);
    }

    // Tests the vertex and face centre strategies
    // Verified by swapping the two strategies
    #[test]
    fn test_vertex_and_face_sites() {
        let mesh = Mesh::cuboid(DVec3::ONE);
        assert_eq!(vertex_sites(&mesh).len(), 8);
        assert_eq!(face_center_sites(&mesh).len(), 12);
        let top = face_center_sites(&mesh);
        let top = top.get(2).expect("top face");
        assert!(top.normal.distance(DVec3::Y) < 1e-12);
        assert!((top.position.y - 1.0).abs() < 1e-12);

        assert_eq!(surface_sites(&mesh, SiteStrategy::Vertices, 0.0).len(), 8);
        assert_eq!(surface_sites(&mesh, SiteStrategy::FaceCenters, 0.0).len(), 12);
        assert_eq!(surface_sites(&mesh, SiteStrategy::QuadCenters, 0.0).len(), 6);
    }

    // Tests that grid sites stay inside their triangles
    // Verified by keeping points past the hypotenuse
    #[test]
    fn test_uniform_sites_inside_faces() {
        let mesh = Mesh::leaf(1.0, 1.0);
        let sites = uniform_sites(&mesh, 0.3);
        // Six grid points fall inside each half of the quad
        assert_eq!(sites.len(), 12);
        for site in &sites {
            let inside = (0..mesh.faces().len()).any(|face| {
                mesh.face_corners(face)
                    .is_some_and(|[a, b, c]| point_in_triangle(site.position, a, b, c))
            });
            assert!(inside);
            assert!((site.normal.z.abs() - 1.0).abs() < 1e-12);
        }
        assert!(uniform_sites(&mesh, 0.0).is_empty());
    }

    // Tests that large faces keep a widened grid
    // Verified by dropping faces whose grid exceeds the point cap
    #[test]
    fn test_uniform_sites_on_large_face() {
        let mesh = Mesh::cuboid(DVec3::new(20.0, 1.0, 20.0));
        let sites = uniform_sites(&mesh, 0.1);
        let facing = |axis: DVec3| sites.iter().filter(|s| s.normal.distance(axis) < 1e-9).count();

        // Two top triangles, each capped at the grid limit
        let top = facing(DVec3::Y);
        assert!(top > 1_000);
        assert!(top <= 2 * MAX_GRID_POINTS_PER_FACE);
        assert!(
            sites
                .iter()
                .filter(|s| s.normal.distance(DVec3::Y) < 1e-9)
                .all(|s| (s.position.y - 1.0).abs() < 1e-12)
        );
        assert!(facing(DVec3::NEG_Y) > 1_000);
        // Thin sides fit under the cap at the requested spacing
        assert!(facing(DVec3::X) > 500);
    }

    // Tests placement counts for the fixed strategies
    // Verified by visiting every face for the quad strategy
    #[test]
    fn test_place_strategies() {
        for (strategy, expected) in [
            (SiteStrategy::Vertices, 8_u64),
            (SiteStrategy::FaceCenters, 12),
            (SiteStrategy::QuadCenters, 6),
        ] {
            let (mut graph, cube, field) = cube_with_field(FieldParams {
                strategy,
                ..FieldParams::default()
            });
            let output = GenerationPass::new(cube, OUTPUT_PORT)
                .run(&mut graph, 5)
                .expect("valid pass");
            assert_eq!(output.stats.placements(field), expected);
            assert_eq!(output.collection.len() as u64, expected + 1);
        }
    }

    // Tests that zero occupancy rejects every site after drawing for it
    // Verified by returning before the site loop
    #[test]
    fn test_zero_occupancy() {
        let (mut graph, cube, field) = cube_with_field(FieldParams {
            occupancy: 0.0,
            ..FieldParams::default()
        });
        let output = GenerationPass::new(cube, OUTPUT_PORT)
            .run(&mut graph, 5)
            .expect("valid pass");
        assert_eq!(output.collection.len(), 1);
        assert_eq!(output.stats.draws(field), 12);
    }

    // Tests that uniform scattering on a box places leaves on its surface
    // Verified by placing on the centroids
    #[test]
    fn test_place_uniform() {
        let (mut graph, cube, field) = cube_with_field(FieldParams {
            strategy: SiteStrategy::Uniform,
            ..FieldParams::default()
        });
        let output = GenerationPass::new(cube, OUTPUT_PORT)
            .run(&mut graph, 5)
            .expect("valid pass");
        assert!(output.stats.placements(field) > 12);
        for leaf in output.collection.iter().skip(1) {
            let p = leaf.transform.translation;
            let on_side = [p.x.abs() - 0.5, p.z.abs() - 0.5, p.y, p.y - 1.0]
                .iter()
                .any(|d| d.abs() < 1e-9);
            assert!(on_side);
        }
    }
}
