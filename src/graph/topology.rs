//! Module arena with validated link editing and total index translation

use crate::graph::backlink::{BackLinkIndex, LinkSource};
use crate::graph::module::{LinkTarget, Module, ModuleId, ModuleKind, OUTPUT_PORT, PortKind};
use crate::io::error::{DecoratorError, Result, invalid_graph};
use log::debug;

/// Ordered, mutable list of modules
///
/// Modules address each other by position. Every change of topology bumps
/// [`ModuleGraph::revision`] and removal or reordering runs one total
/// translation over every link table and every selector weight table.
#[derive(Clone, Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    revision: u64,
}

impl ModuleGraph {
    /// Empty graph
    pub const fn new() -> Self {
        Self {
            modules: Vec::new(),
            revision: 0,
        }
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the graph has no modules
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Counter bumped by every mutation
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Modules in order
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Module at `id`
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    /// Module at `id`, or an index error
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is outside the graph
    pub fn get(&self, id: ModuleId) -> Result<&Module> {
        self.module(id).ok_or(DecoratorError::InvalidModuleIndex {
            index: id.index(),
            module_count: self.modules.len(),
        })
    }

    /// Mutable access to a module; counts as a mutation
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is outside the graph
    pub fn get_mut(&mut self, id: ModuleId) -> Result<&mut Module> {
        let module_count = self.modules.len();
        self.revision += 1;
        self.modules
            .get_mut(id.index())
            .ok_or(DecoratorError::InvalidModuleIndex {
                index: id.index(),
                module_count,
            })
    }

    /// Set or clear the stop-here flag of a module
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is outside the graph
    pub fn set_stop_here(&mut self, id: ModuleId, stop_here: bool) -> Result<()> {
        self.get_mut(id)?.stop_here = stop_here;
        Ok(())
    }

    /// Append a module and return its id
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        self.modules.push(module);
        self.revision += 1;
        ModuleId(self.modules.len() - 1)
    }

    /// Remove a module, dropping every link that touches it
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is outside the graph
    pub fn remove_module(&mut self, id: ModuleId) -> Result<Module> {
        self.get(id)?;
        let removed = self.modules.remove(id.index());
        self.apply_translation(|old| match old.index().cmp(&id.index()) {
            std::cmp::Ordering::Less => Some(old),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(ModuleId(old.index() - 1)),
        });
        debug!("removed module {id} '{}'", removed.name);
        Ok(removed)
    }

    /// Move a module to position `to`, shifting the ones in between
    ///
    /// # Errors
    ///
    /// Returns an error if either position is outside the graph
    pub fn move_module(&mut self, from: ModuleId, to: ModuleId) -> Result<()> {
        self.get(from)?;
        self.get(to)?;
        if from == to {
            return Ok(());
        }
        let module = self.modules.remove(from.index());
        self.modules.insert(to.index(), module);

        let (from, to) = (from.index(), to.index());
        self.apply_translation(|old| {
            let i = old.index();
            let new = if i == from {
                to
            } else if from < to && (from + 1..=to).contains(&i) {
                i - 1
            } else if to < from && (to..from).contains(&i) {
                i + 1
            } else {
                i
            };
            Some(ModuleId(new))
        });
        Ok(())
    }

    /// Link `output_port` of `source` to `input_port` of `target`
    ///
    /// # Errors
    ///
    /// Returns an error if a module or port does not exist, the port kinds
    /// differ, or the link is already present
    pub fn link(
        &mut self,
        source: ModuleId,
        output_port: usize,
        target: ModuleId,
        input_port: usize,
    ) -> Result<()> {
        let output = self.check_output(source, output_port)?;
        let target_module = self.get(target)?;
        let input = target_module
            .input(input_port)
            .ok_or(DecoratorError::InvalidPort {
                module: target,
                port: input_port,
                input: true,
                port_count: target_module.num_input(),
            })?;
        if output != input.kind || output == PortKind::Null {
            return Err(DecoratorError::PortKindMismatch {
                output,
                input: input.kind,
            });
        }

        let link = LinkTarget {
            module: target,
            input_port,
        };
        let links = self
            .modules
            .get_mut(source.index())
            .and_then(|m| m.links_mut(output_port))
            .ok_or_else(|| invalid_graph(&format!("module {source} lost its output table")))?;
        if links.contains(link) {
            return Err(DecoratorError::DuplicateLink {
                source_module: source,
                target_module: target,
                input_port,
            });
        }
        links.push(link);
        self.revision += 1;
        Ok(())
    }

    /// Remove the link from `output_port` of `source` to `input_port` of
    /// `target`; `false` when there was no such link
    ///
    /// # Errors
    ///
    /// Returns an error if the source module or its output port does not exist
    pub fn unlink(
        &mut self,
        source: ModuleId,
        output_port: usize,
        target: ModuleId,
        input_port: usize,
    ) -> Result<bool> {
        self.check_output(source, output_port)?;
        let removed = self
            .modules
            .get_mut(source.index())
            .and_then(|m| m.links_mut(output_port))
            .is_some_and(|links| {
                links.remove(LinkTarget {
                    module: target,
                    input_port,
                })
            });
        if removed {
            self.revision += 1;
        }
        Ok(removed)
    }

    /// Check every stored link against the module list
    ///
    /// # Errors
    ///
    /// Returns an error naming the first link that points outside the graph
    /// or to a port of a different kind
    pub fn validate(&self) -> Result<()> {
        for (index, module) in self.modules.iter().enumerate() {
            for (port, links) in module.all_links().iter().enumerate() {
                let kind = module.output_kind(port).unwrap_or(PortKind::Null);
                for link in links.iter() {
                    let target = self.get(link.module)?;
                    let input = target.input(link.input_port).ok_or(DecoratorError::InvalidPort {
                        module: link.module,
                        port: link.input_port,
                        input: true,
                        port_count: target.num_input(),
                    })?;
                    if input.kind != kind {
                        return Err(invalid_graph(&format!(
                            "link #{index}:{port} -> {}:{} joins {kind:?} to {:?}",
                            link.module, link.input_port, input.kind
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Bring every selector weight table in line with the current links
    ///
    /// Runs at the start of a generation pass. Weights are parameters, not
    /// topology, so the revision is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` was built for another revision
    pub fn repair_weight_tables(&mut self, index: &BackLinkIndex) -> Result<()> {
        index.ensure_current(self)?;
        for (i, module) in self.modules.iter_mut().enumerate() {
            let downstream: Vec<LinkTarget> = module
                .links(OUTPUT_PORT)
                .map(|links| links.iter().collect())
                .unwrap_or_default();
            if let ModuleKind::RandomObject(params) = &mut module.kind {
                let upstream = index.candidates(ModuleId(i), 0);
                params.upstream.repair(upstream);
                params.downstream.repair(&downstream);
            }
        }
        Ok(())
    }

    fn check_output(&self, source: ModuleId, output_port: usize) -> Result<PortKind> {
        let module = self.get(source)?;
        module
            .output_kind(output_port)
            .ok_or(DecoratorError::InvalidPort {
                module: source,
                port: output_port,
                input: false,
                port_count: module.num_output(),
            })
    }

    /// Rewrite every stored module reference through `translate`
    ///
    /// References mapped to `None` are dropped from link and weight tables.
    fn apply_translation(&mut self, translate: impl Fn(ModuleId) -> Option<ModuleId>) {
        for module in &mut self.modules {
            for links in module.all_links_mut() {
                links.translate(&translate);
            }
            if let ModuleKind::RandomObject(params) = &mut module.kind {
                params.upstream.translate(|source: LinkSource| {
                    translate(source.module).map(|module| LinkSource { module, ..source })
                });
                params.downstream.translate(|target: LinkTarget| {
                    translate(target.module).map(|module| LinkTarget { module, ..target })
                });
            }
        }
        self.revision += 1;
    }
}

impl FromIterator<Module> for ModuleGraph {
    fn from_iter<I: IntoIterator<Item = Module>>(iter: I) -> Self {
        Self {
            modules: iter.into_iter().collect(),
            revision: 0,
        }
    }
}
