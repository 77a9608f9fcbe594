//! Pull, push and value evaluation over a module graph
//!
//! Geometry flows two ways. A pull asks a module for the geometry of one of
//! its outputs and recurses upstream through the back-link index. A push
//! (`decorate`) offers geometry to a module input; the module returns what
//! it adds. After producing geometry a module fans it out to every module
//! wired from its output and merges their additions.
//!
//! Every call owns a [`RandomStream`] started from the seed it was given and
//! hands forks, never the stream, to the calls it makes.

use crate::geometry::collection::{GeometryCollection, Instance};
use crate::geometry::shape::Shape;
use crate::graph::backlink::BackLinkIndex;
use crate::graph::module::{
    BACK_REFERENCE_PORT, DistortParams, HOST_PORT, ModuleId, ModuleKind, OUTPUT_PORT, PortKind,
    RandomObjectParams, Variables,
};
use crate::graph::topology::ModuleGraph;
use crate::io::error::Result;
use crate::math::random::{RandomStream, Seed};
use crate::placement::decorated::{DecoratorRequest, decorated_decorator};
use crate::placement::{coil, field, golden_ball};
use log::trace;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Per-module instrumentation of one pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    draws: BTreeMap<ModuleId, u64>,
    placements: BTreeMap<ModuleId, u64>,
}

impl PassStats {
    /// Random steps consumed by a module's own streams
    pub fn draws(&self, module: ModuleId) -> u64 {
        self.draws.get(&module).copied().unwrap_or(0)
    }

    /// Random steps consumed by every module
    pub fn total_draws(&self) -> u64 {
        self.draws.values().sum()
    }

    /// Decorators a placement module put down
    pub fn placements(&self, module: ModuleId) -> u64 {
        self.placements.get(&module).copied().unwrap_or(0)
    }

    /// Decorators put down by every module
    pub fn total_placements(&self) -> u64 {
        self.placements.values().sum()
    }

    /// Modules that consumed at least one step, with their counts
    pub fn iter_draws(&self) -> impl Iterator<Item = (ModuleId, u64)> + '_ {
        self.draws
            .iter()
            .filter(|&(_, &draws)| draws > 0)
            .map(|(&module, &draws)| (module, draws))
    }
}

/// Evaluation context of one generation pass
///
/// Holds the read-only graph and index and the shapes built from the object
/// modules. Evaluation never fails: an absent contribution is `None`.
#[derive(Debug)]
pub struct Evaluator<'g> {
    graph: &'g ModuleGraph,
    index: &'g BackLinkIndex,
    shapes: Vec<Option<Rc<Shape>>>,
    stats: PassStats,
}

impl<'g> Evaluator<'g> {
    /// Context over `graph`, building every object module's shape
    ///
    /// # Errors
    ///
    /// Returns an error if `index` was built for another graph revision
    pub fn new(graph: &'g ModuleGraph, index: &'g BackLinkIndex) -> Result<Self> {
        index.ensure_current(graph)?;
        let shapes = graph
            .modules()
            .iter()
            .map(|module| match &module.kind {
                ModuleKind::Object(params) => Some(Rc::new(
                    params.shape.build(&module.name, params.material.clone()),
                )),
                _ => None,
            })
            .collect();
        Ok(Self {
            graph,
            index,
            shapes,
            stats: PassStats::default(),
        })
    }

    /// The graph being evaluated
    pub const fn graph(&self) -> &'g ModuleGraph {
        self.graph
    }

    /// The back-link index of the pass
    pub const fn index(&self) -> &'g BackLinkIndex {
        self.index
    }

    /// Instrumentation so far
    pub const fn stats(&self) -> &PassStats {
        &self.stats
    }

    /// Finish and keep the instrumentation
    pub fn into_stats(self) -> PassStats {
        self.stats
    }

    pub(crate) fn record_draws(&mut self, module: ModuleId, draws: u64) {
        *self.stats.draws.entry(module).or_default() += draws;
    }

    pub(crate) fn record_placement(&mut self, module: ModuleId) {
        *self.stats.placements.entry(module).or_default() += 1;
    }

    /// Geometry produced on `output_port` of `module`
    pub fn pull_object(
        &mut self,
        module: ModuleId,
        output_port: usize,
        seed: Seed,
    ) -> Option<GeometryCollection> {
        let graph = self.graph;
        let node = graph.module(module)?;
        if node.output_kind(output_port) != Some(PortKind::Object) {
            return None;
        }
        trace!("pull {module} '{}' ({})", node.name, node.kind.label());
        match &node.kind {
            ModuleKind::Object(_) => self.pull_shape(module, seed),
            ModuleKind::Coil(_) | ModuleKind::GoldenBall(_) | ModuleKind::Field(_) => {
                decorated_decorator(self, module, &DecoratorRequest::neutral(), seed)
            }
            ModuleKind::RandomObject(params) => self.pull_random_object(module, params, seed),
            ModuleKind::Distort(params) => self.pull_distorted(module, params, seed),
            ModuleKind::Constant { .. }
            | ModuleKind::Variable { .. }
            | ModuleKind::Curve { .. }
            | ModuleKind::Random { .. } => None,
        }
    }

    /// Offer `collection` to `input_port` of `module` and return what it adds
    pub fn decorate(
        &mut self,
        module: ModuleId,
        collection: &GeometryCollection,
        input_port: usize,
        seed: Seed,
    ) -> Option<GeometryCollection> {
        if collection.is_empty() {
            return None;
        }
        let graph = self.graph;
        let node = graph.module(module)?;
        trace!(
            "decorate {module} '{}' on input {input_port}",
            node.name
        );
        match &node.kind {
            ModuleKind::Coil(params) if input_port == HOST_PORT => {
                coil::place(self, module, params, collection, seed)
            }
            ModuleKind::GoldenBall(params) if input_port == HOST_PORT => {
                golden_ball::place(self, module, params, collection, seed)
            }
            ModuleKind::Field(params) if input_port == HOST_PORT => {
                field::place(self, module, params, collection, seed)
            }
            ModuleKind::RandomObject(params) => {
                let mut stream = RandomStream::new(seed);
                let routed = self.route(module, params, collection, &mut stream);
                self.record_draws(module, stream.draws());
                routed
            }
            _ => None,
        }
    }

    /// Value produced on `output_port` of `module`
    pub fn pull_value(
        &mut self,
        module: ModuleId,
        output_port: usize,
        variables: &Variables,
        seed: Seed,
    ) -> Option<f64> {
        let graph = self.graph;
        let node = graph.module(module)?;
        if node.output_kind(output_port) != Some(PortKind::Value) {
            return None;
        }
        match &node.kind {
            ModuleKind::Constant { value } => Some(*value),
            ModuleKind::Variable { variable } => Some(variables.get(*variable)),
            ModuleKind::Curve { curve } => {
                let mut stream = RandomStream::new(seed);
                let child = stream.fork();
                let x = self
                    .index
                    .resolve_one(module, 0)
                    .and_then(|source| {
                        self.pull_value(source.module, source.output_port, variables, child)
                    })
                    .unwrap_or(variables.axial_position);
                self.record_draws(module, stream.draws());
                Some(curve.calc_value(x))
            }
            ModuleKind::Random { distribution } => {
                let mut stream = RandomStream::new(seed);
                let value = stream.sample(distribution);
                self.record_draws(module, stream.draws());
                Some(value)
            }
            _ => None,
        }
    }

    /// Value wired to the back-reference input of a placement module
    pub fn pull_back_reference(
        &mut self,
        module: ModuleId,
        variables: &Variables,
        seed: Seed,
    ) -> Option<f64> {
        let source = self.index.resolve_one(module, BACK_REFERENCE_PORT)?;
        self.pull_value(source.module, source.output_port, variables, seed)
    }

    /// Offer `produced` to every module wired from the output of `module`
    ///
    /// One fork is taken per link whether or not the link is followed, so
    /// the caller's stream ends in the same place when `stop_here` is set or
    /// a link ends on a pull-only input.
    pub fn fan_out(
        &mut self,
        module: ModuleId,
        produced: &GeometryCollection,
        stream: &mut RandomStream,
    ) -> GeometryCollection {
        let graph = self.graph;
        let mut merged = GeometryCollection::new();
        let Some(node) = graph.module(module) else {
            return merged;
        };
        let Some(links) = node.links(OUTPUT_PORT) else {
            return merged;
        };

        for link in links.iter() {
            let child = stream.fork();
            if node.stop_here {
                trace!("{module} stops here, skipping {}", link.module);
                continue;
            }
            let pushable = graph
                .module(link.module)
                .and_then(|target| target.input(link.input_port))
                .is_some_and(|port| port.role.accepts_push());
            if !pushable {
                continue;
            }
            if let Some(decoration) = self.decorate(link.module, produced, link.input_port, child)
            {
                merged.merge(decoration);
            }
        }
        merged
    }

    fn pull_shape(&mut self, module: ModuleId, seed: Seed) -> Option<GeometryCollection> {
        let shape = self.shapes.get(module.index()).cloned().flatten()?;
        let mut stream = RandomStream::new(seed);
        let mut produced = GeometryCollection::single(Instance::new(shape));
        let decorations = self.fan_out(module, &produced, &mut stream);
        produced.merge(decorations);
        self.record_draws(module, stream.draws());
        Some(produced)
    }

    fn pull_random_object(
        &mut self,
        module: ModuleId,
        params: &RandomObjectParams,
        seed: Seed,
    ) -> Option<GeometryCollection> {
        let mut stream = RandomStream::new(seed);
        let source = if params.upstream.is_empty() {
            None
        } else {
            params.upstream.select(stream.uniform01())
        };
        let child = stream.fork();
        let mut produced =
            source.and_then(|s| self.pull_object(s.module, s.output_port, child));
        if let Some(collection) = produced.as_mut()
            && let Some(routed) = self.route(module, params, collection, &mut stream)
        {
            collection.merge(routed);
        }
        self.record_draws(module, stream.draws());
        produced
    }

    /// Hand `collection` to one downstream consumer chosen by weight
    ///
    /// Consumes one selection draw and one fork whenever there is a
    /// candidate, whether or not the choice can take the geometry.
    fn route(
        &mut self,
        module: ModuleId,
        params: &RandomObjectParams,
        collection: &GeometryCollection,
        stream: &mut RandomStream,
    ) -> Option<GeometryCollection> {
        if params.downstream.is_empty() {
            return None;
        }
        let target = params.downstream.select(stream.uniform01())?;
        let child = stream.fork();

        let graph = self.graph;
        if graph.module(module)?.stop_here {
            return None;
        }
        let pushable = graph
            .module(target.module)
            .and_then(|node| node.input(target.input_port))
            .is_some_and(|port| port.role.accepts_push());
        if !pushable {
            return None;
        }
        self.decorate(target.module, collection, target.input_port, child)
    }

    fn pull_distorted(
        &mut self,
        module: ModuleId,
        params: &DistortParams,
        seed: Seed,
    ) -> Option<GeometryCollection> {
        let mut stream = RandomStream::new(seed);
        let child = stream.fork();
        let mut produced = self
            .index
            .resolve_one(module, 0)
            .and_then(|source| self.pull_object(source.module, source.output_port, child));
        if let Some(collection) = produced.as_mut() {
            collection.resize_and_distort(params.size_r, params.size_y, &params.distortion);
            let decorations = self.fan_out(module, collection, &mut stream);
            collection.merge(decorations);
        }
        self.record_draws(module, stream.draws());
        produced
    }
}
