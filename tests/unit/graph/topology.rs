//! Tests for graph editing, index translation and weight repair

#[cfg(test)]
mod tests {
    use treedecor::DecoratorError;
    use treedecor::geometry::shape::ShapeSpec;
    use treedecor::graph::module::{
        DECORATOR_PORT, HOST_PORT, LinkTarget, OUTPUT_PORT, ObjectParams, RandomObjectParams,
    };
    use treedecor::graph::{
        BackLinkIndex, LinkSource, Module, ModuleGraph, ModuleId, ModuleKind, WeightTable,
    };
    use treedecor::math::random::Seed;
    use treedecor::placement::CoilParams;

    fn object(name: &str) -> Module {
        Module::new(
            name,
            ModuleKind::Object(ObjectParams {
                shape: ShapeSpec::Leaf {
                    width: 1.0,
                    length: 1.0,
                },
                material: None,
            }),
        )
    }

    fn coil(name: &str) -> Module {
        Module::new(name, ModuleKind::Coil(CoilParams::default()))
    }

    fn targets(graph: &ModuleGraph, id: usize) -> Vec<(usize, usize)> {
        graph
            .module(ModuleId(id))
            .and_then(|m| m.links(OUTPUT_PORT))
            .map(|links| {
                links
                    .iter()
                    .map(|t| (t.module.index(), t.input_port))
                    .collect()
            })
            .unwrap_or_default()
    }

    // Tests link validation errors
    // Verified by skipping the port kind comparison
    #[test]
    fn test_link_validation() {
        let mut graph = ModuleGraph::new();
        let leaf = graph.add_module(object("leaf"));
        let placer = graph.add_module(coil("coil"));
        let value = graph.add_module(Module::new("one", ModuleKind::Constant { value: 1.0 }));

        assert!(graph.link(leaf, OUTPUT_PORT, placer, DECORATOR_PORT).is_ok());
        assert!(matches!(
            graph.link(leaf, OUTPUT_PORT, placer, DECORATOR_PORT),
            Err(DecoratorError::DuplicateLink { .. })
        ));
        assert!(matches!(
            graph.link(value, OUTPUT_PORT, placer, HOST_PORT),
            Err(DecoratorError::PortKindMismatch { .. })
        ));
        assert!(matches!(
            graph.link(leaf, OUTPUT_PORT, placer, 7),
            Err(DecoratorError::InvalidPort { input: true, .. })
        ));
        assert!(matches!(
            graph.link(leaf, 1, placer, HOST_PORT),
            Err(DecoratorError::InvalidPort { input: false, .. })
        ));
        assert!(matches!(
            graph.link(ModuleId(9), OUTPUT_PORT, placer, HOST_PORT),
            Err(DecoratorError::InvalidModuleIndex { index: 9, .. })
        ));
        assert!(graph.link(value, OUTPUT_PORT, placer, 2).is_ok());
        assert!(graph.validate().is_ok());
    }

    // Tests that every mutation bumps the revision
    // Verified by bumping only on module insertion
    #[test]
    fn test_revision_bumps() {
        let mut graph = ModuleGraph::new();
        let leaf = graph.add_module(object("leaf"));
        let placer = graph.add_module(coil("coil"));
        let before = graph.revision();

        graph
            .link(leaf, OUTPUT_PORT, placer, DECORATOR_PORT)
            .expect("valid link");
        let linked = graph.revision();
        assert!(linked > before);

        assert_eq!(graph.unlink(leaf, OUTPUT_PORT, placer, HOST_PORT).ok(), Some(false));
        assert_eq!(graph.revision(), linked);
        assert_eq!(
            graph.unlink(leaf, OUTPUT_PORT, placer, DECORATOR_PORT).ok(),
            Some(true)
        );
        assert!(graph.revision() > linked);

        let unlinked = graph.revision();
        graph.set_stop_here(placer, true).expect("module exists");
        assert!(graph.revision() > unlinked);
    }

    // Tests that removal drops links to the module and renumbers the rest
    // Verified by renumbering without dropping
    #[test]
    fn test_remove_module_translates_links() {
        let mut graph = ModuleGraph::new();
        let trunk = graph.add_module(object("trunk"));
        let doomed = graph.add_module(coil("doomed"));
        let kept = graph.add_module(coil("kept"));
        graph.link(trunk, OUTPUT_PORT, doomed, HOST_PORT).expect("valid");
        graph.link(trunk, OUTPUT_PORT, kept, HOST_PORT).expect("valid");

        let removed = graph.remove_module(doomed).expect("module exists");
        assert_eq!(removed.name, "doomed");
        assert_eq!(graph.len(), 2);
        assert_eq!(targets(&graph, 0), vec![(1, HOST_PORT)]);
        assert!(graph.validate().is_ok());
        assert!(graph.remove_module(ModuleId(5)).is_err());
    }

    // Tests that moving a module renumbers every reference
    // Verified by moving the module without translating links
    #[test]
    fn test_move_module_translates_links() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(object("a"));
        let b = graph.add_module(coil("b"));
        let c = graph.add_module(coil("c"));
        graph.link(a, OUTPUT_PORT, b, HOST_PORT).expect("valid");
        graph.link(b, OUTPUT_PORT, c, HOST_PORT).expect("valid");

        graph.move_module(a, c).expect("positions exist");
        let names: Vec<&str> = graph.modules().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
        assert_eq!(targets(&graph, 2), vec![(0, HOST_PORT)]);
        assert_eq!(targets(&graph, 0), vec![(1, HOST_PORT)]);
        assert!(graph.validate().is_ok());
    }

    // Tests that removal also rewrites selector weight tables
    // Verified by translating only the link tables
    #[test]
    fn test_remove_module_translates_weights() {
        let mut graph = ModuleGraph::new();
        let first = graph.add_module(object("first"));
        let second = graph.add_module(object("second"));
        let selector = graph.add_module(Module::new(
            "pick",
            ModuleKind::RandomObject(RandomObjectParams {
                upstream: WeightTable::from_pairs([
                    (
                        LinkSource {
                            module: first,
                            output_port: 0,
                        },
                        2.0,
                    ),
                    (
                        LinkSource {
                            module: second,
                            output_port: 0,
                        },
                        5.0,
                    ),
                ]),
                downstream: WeightTable::default(),
            }),
        ));

        graph.remove_module(first).expect("module exists");
        let Some(ModuleKind::RandomObject(params)) =
            graph.module(ModuleId(selector.index() - 1)).map(|m| &m.kind)
        else {
            panic!("selector moved down by one");
        };
        let remaining: Vec<(ModuleId, f64)> = params
            .upstream
            .entries()
            .iter()
            .map(|e| (e.candidate.module, e.weight))
            .collect();
        assert_eq!(remaining, vec![(ModuleId(0), 5.0)]);
    }

    // Tests that weight repair follows the index and the forward links
    // Verified by repairing from the stored weights only
    #[test]
    fn test_repair_weight_tables() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(object("a"));
        let b = graph.add_module(object("b"));
        let selector = graph.add_module(Module::new(
            "pick",
            ModuleKind::RandomObject(RandomObjectParams::default()),
        ));
        let placer = graph.add_module(coil("coil"));
        graph.link(a, OUTPUT_PORT, selector, 0).expect("valid");
        graph.link(b, OUTPUT_PORT, selector, 0).expect("valid");
        graph.link(selector, OUTPUT_PORT, placer, HOST_PORT).expect("valid");

        let index = BackLinkIndex::build(&graph, Seed::new(0));
        let revision = graph.revision();
        graph.repair_weight_tables(&index).expect("index is current");
        assert_eq!(graph.revision(), revision);

        let Some(ModuleKind::RandomObject(params)) = graph.module(selector).map(|m| &m.kind)
        else {
            panic!("selector exists");
        };
        assert_eq!(params.upstream.len(), 2);
        assert_eq!(params.upstream.weights(), vec![1.0, 1.0]);
        assert_eq!(
            params.downstream.candidates(),
            vec![LinkTarget {
                module: placer,
                input_port: HOST_PORT
            }]
        );

        graph.add_module(object("late"));
        assert!(graph.repair_weight_tables(&index).is_err());
    }

    // Tests that validation catches links stored out of range
    // Verified by validating only port kinds
    #[test]
    fn test_collected_graph_validation() {
        let mut source = ModuleGraph::new();
        let leaf = source.add_module(object("leaf"));
        let placer = source.add_module(coil("coil"));
        source
            .link(leaf, OUTPUT_PORT, placer, HOST_PORT)
            .expect("valid link");
        let stored = source.module(leaf).cloned().expect("leaf exists");

        let graph: ModuleGraph = std::iter::once(stored).collect();
        assert_eq!(graph.revision(), 0);
        assert!(matches!(
            graph.validate(),
            Err(DecoratorError::InvalidModuleIndex { index: 1, .. })
        ));
    }
}
