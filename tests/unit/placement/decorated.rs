//! Tests for size sampling, the decorated decorator and footprint estimates

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use std::collections::BTreeMap;
    use treedecor::engine::evaluator::Evaluator;
    use treedecor::geometry::collection::{AXIAL_POSITION_PARAMETER, Material};
    use treedecor::geometry::shape::{Distortion, ShapeSpec};
    use treedecor::graph::module::{
        BACK_REFERENCE_PORT, DECORATOR_PORT, OUTPUT_PORT, ObjectParams, Variables,
    };
    use treedecor::graph::{BackLinkIndex, Module, ModuleGraph, ModuleId, ModuleKind};
    use treedecor::io::configuration::MIN_SHRINK;
    use treedecor::math::curve::{CurveSource, ResponseCurve, ScaledParam};
    use treedecor::math::random::{Distribution, RandomStream, Seed};
    use treedecor::placement::CoilParams;
    use treedecor::placement::decorated::{
        DecoratorRequest, DistortionParams, SizeParams, back_reference, decorated_decorator,
        estimate_footprint,
    };

    /// Leaf wired into the decorator input of a coil; returns the coil
    fn leaf_on_coil(material: Option<Material>) -> (ModuleGraph, ModuleId) {
        let mut graph = ModuleGraph::new();
        let leaf = graph.add_module(Module::new(
            "leaf",
            ModuleKind::Object(ObjectParams {
                shape: ShapeSpec::Leaf {
                    width: 0.5,
                    length: 2.0,
                },
                material,
            }),
        ));
        let coil = graph.add_module(Module::new(
            "coil",
            ModuleKind::Coil(CoilParams::default()),
        ));
        graph
            .link(leaf, OUTPUT_PORT, coil, DECORATOR_PORT)
            .expect("decorator link");
        (graph, coil)
    }

    fn back_reference_param() -> ScaledParam {
        ScaledParam {
            value: 1.0,
            curve: ResponseCurve::linear(&[(0.0, 0.0), (1.0, 1.0)]),
            source: CurveSource::BackReference,
        }
    }

    // Tests that size sampling always takes two draws and floors the result
    // Verified by skipping the draw of a constant distribution
    #[test]
    fn test_size_sample() {
        let mut stream = RandomStream::new(Seed::new(1));
        assert_eq!(SizeParams::default().sample(&mut stream, 0.5, None), (1.0, 1.0));
        assert_eq!(stream.draws(), 2);

        let shrunk = SizeParams {
            size_r: Distribution::constant(-1.0),
            size_y: Distribution::constant(3.0),
            scale: ScaledParam::fixed(2.0),
        };
        let (size_r, size_y) = shrunk.sample(&mut stream, 0.5, None);
        assert!((size_r - MIN_SHRINK).abs() < 1e-15);
        assert!((size_y - 6.0).abs() < 1e-12);
        assert_eq!(stream.draws(), 4);
    }

    // Tests which parameters read the back-reference value
    // Verified by always reporting false
    #[test]
    fn test_reads_back_reference() {
        assert!(!SizeParams::default().reads_back_reference());
        assert!(!DistortionParams::default().reads_back_reference());
        let twisted = DistortionParams {
            twist: back_reference_param(),
            ..DistortionParams::default()
        };
        assert!(twisted.reads_back_reference());
        let wired = twisted.evaluate(0.2, Some(0.7));
        assert!((wired.twist - 0.7).abs() < 1e-12);
        assert!(wired.bend.abs() < 1e-12 && wired.taper.abs() < 1e-12);
        let unwired = twisted.evaluate(0.2, None);
        assert!((unwired.twist - 0.2).abs() < 1e-12);
    }

    // Tests the neutral request
    // Verified by starting at zero size
    #[test]
    fn test_neutral_request() {
        let request = DecoratorRequest::neutral();
        assert_eq!((request.size_r, request.size_y), (1.0, 1.0));
        assert_eq!(request.distortion, Distortion::IDENTITY);
    }

    // Tests that the decorator is resized and its material parameters set
    // Verified by resizing after placement
    #[test]
    fn test_decorated_decorator() {
        let material = Material {
            name: "leaf".to_string(),
            parameters: BTreeMap::from([(AXIAL_POSITION_PARAMETER.to_string(), 0.0)]),
        };
        let (graph, coil) = leaf_on_coil(Some(material));
        let index = BackLinkIndex::build(&graph, Seed::new(0));
        let mut ev = Evaluator::new(&graph, &index).expect("current index");

        let request = DecoratorRequest {
            size_r: 2.0,
            size_y: 3.0,
            axial_position: 0.4,
            ..DecoratorRequest::neutral()
        };
        let decorator =
            decorated_decorator(&mut ev, coil, &request, Seed::new(9)).expect("leaf is wired");
        assert_eq!(decorator.len(), 1);
        let leaf = decorator.primary().expect("one instance");
        assert_eq!(leaf.level, 0);
        assert!(leaf.scale.distance(DVec3::new(2.0, 3.0, 2.0)) < 1e-12);
        assert!(leaf.get_bounds().distance(DVec3::new(1.0, 6.0, 0.0)) < 1e-12);
        let written = leaf
            .material
            .as_ref()
            .and_then(|m| m.parameters.get(AXIAL_POSITION_PARAMETER).copied());
        assert_eq!(written, Some(0.4));
        assert_eq!(ev.stats().draws(coil), 1);
    }

    // Tests that nothing is produced without a decorator link
    // Verified by returning an empty collection
    #[test]
    fn test_decorated_decorator_unwired() {
        let mut graph = ModuleGraph::new();
        let coil = graph.add_module(Module::new(
            "coil",
            ModuleKind::Coil(CoilParams::default()),
        ));
        let index = BackLinkIndex::build(&graph, Seed::new(0));
        let mut ev = Evaluator::new(&graph, &index).expect("current index");
        let decorator =
            decorated_decorator(&mut ev, coil, &DecoratorRequest::neutral(), Seed::new(9));
        assert!(decorator.is_none());
        let mut stream = RandomStream::new(Seed::new(2));
        assert!(estimate_footprint(&mut ev, coil, 4, &mut stream).is_none());
    }

    // Tests the footprint and height estimate of a flat leaf
    // Verified by measuring along the leaf length
    #[test]
    fn test_estimate_footprint() {
        let (graph, coil) = leaf_on_coil(None);
        let index = BackLinkIndex::build(&graph, Seed::new(0));
        let mut ev = Evaluator::new(&graph, &index).expect("current index");
        let mut stream = RandomStream::new(Seed::new(2));

        let estimate = estimate_footprint(&mut ev, coil, 4, &mut stream).expect("leaf is wired");
        assert_eq!(estimate.samples, 4);
        assert!((estimate.object_area - 0.25).abs() < 1e-12);
        assert!((estimate.radial_extent - 2.0).abs() < 1e-12);
        assert_eq!(stream.draws(), 4);
    }

    // Tests that the back-reference pull takes one fork either way
    // Verified by skipping the fork when nothing is wired
    #[test]
    fn test_back_reference() {
        let (mut graph, coil) = leaf_on_coil(None);
        let variables = Variables::default();
        {
            let index = BackLinkIndex::build(&graph, Seed::new(0));
            let mut ev = Evaluator::new(&graph, &index).expect("current index");
            let mut stream = RandomStream::new(Seed::new(4));
            assert_eq!(back_reference(&mut ev, coil, &variables, &mut stream), None);
            assert_eq!(stream.draws(), 1);
        }

        let value = graph.add_module(Module::new("k", ModuleKind::Constant { value: 0.7 }));
        graph
            .link(value, OUTPUT_PORT, coil, BACK_REFERENCE_PORT)
            .expect("value link");
        let index = BackLinkIndex::build(&graph, Seed::new(0));
        let mut ev = Evaluator::new(&graph, &index).expect("current index");
        let mut stream = RandomStream::new(Seed::new(4));
        assert_eq!(
            back_reference(&mut ev, coil, &variables, &mut stream),
            Some(0.7)
        );
        assert_eq!(stream.draws(), 1);
    }
}
