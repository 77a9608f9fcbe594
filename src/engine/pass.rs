//! One generation run from a root seed

use crate::engine::evaluator::{Evaluator, PassStats};
use crate::geometry::collection::GeometryCollection;
use crate::graph::backlink::BackLinkIndex;
use crate::graph::module::{ModuleId, PortKind};
use crate::graph::topology::ModuleGraph;
use crate::io::error::{DecoratorError, Result};
use crate::math::random::Seed;
use log::debug;
use std::time::Instant;

/// Result of a generation pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationOutput {
    /// Everything the requested output produced, empty when nothing was
    pub collection: GeometryCollection,
    /// Per-module instrumentation
    pub stats: PassStats,
}

/// Request for the geometry of one module output
///
/// A run splits the root seed once: the first half seeds the tie-breaks of
/// the back-link index, the second the evaluation. The index is rebuilt and
/// the selector weights repaired at the start of every run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationPass {
    module: ModuleId,
    output_port: usize,
}

impl GenerationPass {
    /// Pass producing `output_port` of `module`
    pub const fn new(module: ModuleId, output_port: usize) -> Self {
        Self {
            module,
            output_port,
        }
    }

    /// Requested module
    pub const fn module(&self) -> ModuleId {
        self.module
    }

    /// Requested output port
    pub const fn output_port(&self) -> usize {
        self.output_port
    }

    /// Evaluate the requested output with `seed`
    ///
    /// # Errors
    ///
    /// Returns an error if the module does not exist or the port is not a
    /// geometry output
    pub fn run(&self, graph: &mut ModuleGraph, seed: u64) -> Result<GenerationOutput> {
        let module = graph.get(self.module)?;
        if module.output_kind(self.output_port) != Some(PortKind::Object) {
            return Err(DecoratorError::InvalidPort {
                module: self.module,
                port: self.output_port,
                input: false,
                port_count: module.num_output(),
            });
        }

        let start = Instant::now();
        let (tie_break, evaluation) = Seed::new(seed).fork();
        let index = BackLinkIndex::build(graph, tie_break);
        graph.repair_weight_tables(&index)?;

        let graph: &ModuleGraph = graph;
        let mut evaluator = Evaluator::new(graph, &index)?;
        let collection = evaluator
            .pull_object(self.module, self.output_port, evaluation)
            .unwrap_or_default();
        let stats = evaluator.into_stats();

        debug!(
            "pass {} seed {seed}: {} instances, {} draws in {:.2?}",
            self.module,
            collection.len(),
            stats.total_draws(),
            start.elapsed()
        );
        Ok(GenerationOutput { collection, stats })
    }
}
