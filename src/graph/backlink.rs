//! Reverse adjacency resolving which module feeds a given input

use crate::graph::module::ModuleId;
use crate::graph::topology::ModuleGraph;
use crate::io::error::{DecoratorError, Result};
use crate::math::random::{RandomStream, Seed};
use log::trace;
use serde::{Deserialize, Serialize};

/// Upstream end of a link
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkSource {
    /// Producing module
    pub module: ModuleId,
    /// Output port on the producer
    pub output_port: usize,
}

/// `(target, input port) → candidate sources`, built in one pass
///
/// The index is never updated incrementally. It records the graph revision it
/// was built at and refuses to serve a graph that has changed since.
#[derive(Clone, Debug)]
pub struct BackLinkIndex {
    revision: u64,
    sources: Vec<Vec<Vec<LinkSource>>>,
    chosen: Vec<Vec<usize>>,
}

impl BackLinkIndex {
    /// Invert every forward link table of `graph`
    ///
    /// Inputs fed by several sources get their winner drawn here, in
    /// `(target, port)` order from a stream seeded with `tie_break`, so that
    /// resolution never touches the per-call seeds.
    pub fn build(graph: &ModuleGraph, tie_break: Seed) -> Self {
        let mut sources: Vec<Vec<Vec<LinkSource>>> = graph
            .modules()
            .iter()
            .map(|m| vec![Vec::new(); m.num_input()])
            .collect();

        for (index, module) in graph.modules().iter().enumerate() {
            for (output_port, links) in module.all_links().iter().enumerate() {
                for link in links.iter() {
                    let slot = sources
                        .get_mut(link.module.index())
                        .and_then(|ports| ports.get_mut(link.input_port));
                    if let Some(slot) = slot {
                        slot.push(LinkSource {
                            module: ModuleId(index),
                            output_port,
                        });
                    }
                }
            }
        }

        let mut stream = RandomStream::new(tie_break);
        let chosen = sources
            .iter()
            .enumerate()
            .map(|(target, ports)| {
                ports
                    .iter()
                    .enumerate()
                    .map(|(port, candidates)| {
                        if candidates.len() < 2 {
                            return 0;
                        }
                        let pick = stream.index(candidates.len()).unwrap_or(0);
                        trace!(
                            "input {port} of #{target} has {} sources, picked {pick}",
                            candidates.len()
                        );
                        pick
                    })
                    .collect()
            })
            .collect();

        Self {
            revision: graph.revision(),
            sources,
            chosen,
        }
    }

    /// Graph revision this index reflects
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether this index still reflects `graph`
    pub const fn is_current(&self, graph: &ModuleGraph) -> bool {
        self.revision == graph.revision()
    }

    /// Fail with [`DecoratorError::StaleIndex`] unless the index reflects `graph`
    ///
    /// # Errors
    ///
    /// Returns an error if the graph changed after the index was built
    pub fn ensure_current(&self, graph: &ModuleGraph) -> Result<()> {
        if self.is_current(graph) {
            Ok(())
        } else {
            Err(DecoratorError::StaleIndex {
                built_at: self.revision,
                current: graph.revision(),
            })
        }
    }

    /// Every source feeding `input_port` of `target`, in graph order
    pub fn candidates(&self, target: ModuleId, input_port: usize) -> &[LinkSource] {
        self.sources
            .get(target.index())
            .and_then(|ports| ports.get(input_port))
            .map_or(&[], Vec::as_slice)
    }

    /// The single source treated as feeding `input_port` of `target`
    ///
    /// No candidate gives `None`, one candidate is returned as is, and among
    /// several the choice drawn at build time is returned.
    pub fn resolve_one(&self, target: ModuleId, input_port: usize) -> Option<LinkSource> {
        let candidates = self.candidates(target, input_port);
        let pick = self
            .chosen
            .get(target.index())
            .and_then(|ports| ports.get(input_port))
            .copied()
            .unwrap_or(0);
        candidates.get(pick).or_else(|| candidates.first()).copied()
    }
}
