//! Tests for instances, collections, resizing and material parameters

#[cfg(test)]
mod tests {
    use glam::{DAffine3, DVec3};
    use std::collections::BTreeMap;
    use std::rc::Rc;
    use treedecor::geometry::collection::{
        AXIAL_POSITION_PARAMETER, AZIMUTH_PARAMETER, GeometryCollection, Instance, Material,
    };
    use treedecor::geometry::shape::{Distortion, Shape, ShapeSpec};

    fn cube(material: Option<Material>) -> Rc<Shape> {
        Rc::new(
            ShapeSpec::Cuboid {
                size: [1.0, 2.0, 1.0],
            }
            .build("cube", material),
        )
    }

    fn close(a: DVec3, b: DVec3) -> bool {
        a.distance(b) < 1e-9
    }

    // Tests that a fresh instance is untransformed at level 0
    // Verified by starting instances at level 1
    #[test]
    fn test_new_instance() {
        let instance = Instance::new(cube(None));
        assert_eq!(instance.level, 0);
        assert_eq!(instance.transform, DAffine3::IDENTITY);
        assert!(close(instance.get_bounds(), DVec3::new(1.0, 2.0, 1.0)));
    }

    // Tests that set_size fits the undeformed bounds
    // Verified by dividing current by target
    #[test]
    fn test_set_size() {
        let mut instance = Instance::new(cube(None));
        instance.set_size(2.0, 1.0, 0.5);
        assert!(close(instance.get_bounds(), DVec3::new(2.0, 1.0, 0.5)));
    }

    // Tests that resizing multiplies the running size factors and floors them
    // Verified by removing the shrink floor
    #[test]
    fn test_instance_resize_and_distort() {
        let mut instance = Instance::new(cube(None));
        instance.resize_and_distort(2.0, 0.5, &Distortion::new(0.0, 0.0, 0.25));
        instance.resize_and_distort(0.5, -3.0, &Distortion::IDENTITY);
        assert!((instance.size_r - 1.0).abs() < 1e-12);
        assert!(instance.size_y > 0.0 && instance.size_y < 0.001);
        assert!((instance.distortion.taper - 0.25).abs() < 1e-12);
    }

    // Tests that placing shifts levels and composes transforms
    // Verified by composing in the opposite order
    #[test]
    fn test_placed() {
        let mut collection = GeometryCollection::single(Instance::new(cube(None)));
        let mut child = Instance::new(cube(None));
        child.level = 1;
        child.transform = DAffine3::from_translation(DVec3::Y);
        collection.push(child);

        let moved = collection.placed(&DAffine3::from_scale(DVec3::splat(2.0)), 3);
        assert_eq!(moved.min_level(), Some(3));
        assert_eq!(moved.max_level(), Some(4));
        let Some(second) = moved.instances().get(1) else {
            panic!("two instances");
        };
        assert!(close(second.transform.translation, DVec3::new(0.0, 2.0, 0.0)));
        assert_eq!(collection.min_level(), Some(0));
    }

    // Tests that the primary instance is the first at the lowest level
    // Verified by picking the first instance regardless of level
    #[test]
    fn test_primary() {
        let mut deep = Instance::new(cube(None));
        deep.level = 2;
        let mut collection = GeometryCollection::single(deep);
        let mut shallow = Instance::new(cube(None));
        shallow.level = 1;
        shallow.size_r = 7.0;
        collection.push(shallow);

        let Some(primary) = collection.primary() else {
            panic!("non-empty collection has a primary");
        };
        assert_eq!(primary.level, 1);
        assert!((primary.size_r - 7.0).abs() < f64::EPSILON);
        assert!(GeometryCollection::new().primary().is_none());
    }

    // Tests that resizing a collection scales primaries and moves decorations
    // Verified by resizing every instance's own scale
    #[test]
    fn test_collection_resize() {
        let mut collection = GeometryCollection::single(Instance::new(cube(None)));
        let mut leaf = Instance::new(cube(None));
        leaf.level = 1;
        leaf.transform = DAffine3::from_translation(DVec3::new(1.0, 2.0, 0.0));
        collection.push(leaf);

        collection.resize_and_distort(2.0, 3.0, &Distortion::IDENTITY);
        let instances = collection.instances();
        let (Some(host), Some(leaf)) = (instances.first(), instances.get(1)) else {
            panic!("two instances");
        };
        assert!(close(host.scale, DVec3::new(2.0, 3.0, 2.0)));
        assert!(close(leaf.scale, DVec3::ONE));
        assert!(close(leaf.transform.translation, DVec3::new(2.0, 6.0, 0.0)));
        assert!((leaf.size_y - 3.0).abs() < 1e-12);

        let Some(bounds) = collection.bounds() else {
            panic!("bounds exist");
        };
        assert!((bounds.max.y - 12.0).abs() < 1e-9);
    }

    // Tests that only declared material parameters are written
    // Verified by inserting missing parameters
    #[test]
    fn test_material_parameters() {
        let material = Material {
            name: "bark".to_string(),
            parameters: BTreeMap::from([(AXIAL_POSITION_PARAMETER.to_string(), 0.0)]),
        };
        let mut collection = GeometryCollection::single(Instance::new(cube(Some(material))));
        collection.set_material_parameters(0.6, 0.25);

        let Some(written) = collection.primary().and_then(|i| i.material.as_ref()) else {
            panic!("material is kept");
        };
        assert_eq!(written.parameters.get(AXIAL_POSITION_PARAMETER), Some(&0.6));
        assert!(!written.parameters.contains_key(AZIMUTH_PARAMETER));
    }

    // Tests that empty collections become None
    // Verified by returning the empty collection
    #[test]
    fn test_non_empty() {
        assert!(GeometryCollection::new().non_empty().is_none());
        let one = GeometryCollection::single(Instance::new(cube(None)));
        assert_eq!(one.non_empty().map(|c| c.len()), Some(1));
    }

    // Tests that the world mesh follows scale and transform
    // Verified by baking the transform before the scale
    #[test]
    fn test_world_mesh() {
        let mut instance = Instance::new(cube(None));
        instance.scale = DVec3::new(1.0, 0.5, 1.0);
        instance.transform = DAffine3::from_translation(DVec3::new(0.0, 10.0, 0.0));
        let Some(bounds) = instance.world_mesh().bounds() else {
            panic!("mesh has bounds");
        };
        assert!((bounds.min.y - 10.0).abs() < 1e-12);
        assert!((bounds.max.y - 11.0).abs() < 1e-12);
        assert_eq!(instance.world_bounds().map(|b| b.max.y), Some(bounds.max.y));
    }
}
