//! JSON persistence of module graphs
//!
//! Each module is stored with its kind and parameters and, per output port,
//! the parallel `targets` / `target_input_port` lists of its forward links.
//! The reverse index is never stored; it is rebuilt at every pass.

use crate::graph::module::{Module, ModuleId, ModuleKind, OutputLinks};
use crate::graph::topology::ModuleGraph;
use crate::io::configuration::GRAPH_FILE_VERSION;
use crate::io::error::{DecoratorError, Result, file_system, invalid_graph};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Forward links of one output port
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Target module indices
    #[serde(default)]
    pub targets: Vec<usize>,
    /// Target input ports, index-aligned with `targets`
    #[serde(default)]
    pub target_input_port: Vec<usize>,
}

/// Stored module
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Display name
    pub name: String,
    /// Kind tag and parameters
    #[serde(flatten)]
    pub kind: ModuleKind,
    /// Quick-preview flag
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stop_here: bool,
    /// Forward links per output port
    #[serde(default)]
    pub outputs: Vec<OutputRecord>,
}

/// Top-level graph document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphFile {
    /// Format version
    pub version: u32,
    /// Module generated when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<ModuleId>,
    /// Modules in graph order
    pub modules: Vec<ModuleRecord>,
}

/// Graph restored from a file with its default module
#[derive(Clone, Debug)]
pub struct LoadedGraph {
    /// The graph
    pub graph: ModuleGraph,
    /// Module to generate when none is requested
    pub root: Option<ModuleId>,
}

impl GraphFile {
    /// Document describing `graph`
    pub fn from_graph(graph: &ModuleGraph, root: Option<ModuleId>) -> Self {
        let modules = graph
            .modules()
            .iter()
            .map(|module| ModuleRecord {
                name: module.name.clone(),
                kind: module.kind.clone(),
                stop_here: module.stop_here,
                outputs: module
                    .all_links()
                    .iter()
                    .map(|links| OutputRecord {
                        targets: links.targets().iter().map(|m| m.index()).collect(),
                        target_input_port: links.target_input_ports().to_vec(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            version: GRAPH_FILE_VERSION,
            root,
            modules,
        }
    }

    /// Rebuild the graph, checking the version and every link
    ///
    /// # Errors
    ///
    /// Returns an error if the version is not supported, a link table has
    /// lists of different lengths or too many ports, a link is invalid, or
    /// the root is outside the graph
    pub fn into_graph(self) -> Result<LoadedGraph> {
        if self.version != GRAPH_FILE_VERSION {
            return Err(DecoratorError::UnsupportedVersion {
                found: self.version,
                expected: GRAPH_FILE_VERSION,
            });
        }

        let mut modules = Vec::with_capacity(self.modules.len());
        for (index, record) in self.modules.into_iter().enumerate() {
            let mut module = Module::new(record.name, record.kind);
            module.stop_here = record.stop_here;
            if record.outputs.len() > module.num_output() {
                return Err(invalid_graph(&format!(
                    "module #{index} stores {} output tables but has {} outputs",
                    record.outputs.len(),
                    module.num_output()
                )));
            }
            let mut outputs = Vec::with_capacity(record.outputs.len());
            for (port, output) in record.outputs.into_iter().enumerate() {
                let targets = output.targets.into_iter().map(ModuleId).collect();
                let links = OutputLinks::from_parallel(targets, output.target_input_port)
                    .ok_or_else(|| {
                        invalid_graph(&format!(
                            "module #{index} output {port}: targets and ports differ in length"
                        ))
                    })?;
                outputs.push(links);
            }
            module.replace_links(outputs);
            modules.push(module);
        }

        let graph: ModuleGraph = modules.into_iter().collect();
        graph.validate()?;
        if let Some(root) = self.root {
            graph.get(root)?;
        }
        Ok(LoadedGraph {
            graph,
            root: self.root,
        })
    }
}

/// Read a graph document
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the graph it
/// describes is invalid
pub fn load_graph(path: &Path) -> Result<LoadedGraph> {
    let text = std::fs::read_to_string(path).map_err(|e| file_system(path, "read", e))?;
    let file: GraphFile =
        serde_json::from_str(&text).map_err(|source| DecoratorError::GraphLoad {
            path: path.to_path_buf(),
            source,
        })?;
    let loaded = file.into_graph()?;
    debug!(
        "loaded {} modules from '{}'",
        loaded.graph.len(),
        path.display()
    );
    Ok(loaded)
}

/// Write a graph document
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written
pub fn save_graph(graph: &ModuleGraph, root: Option<ModuleId>, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&GraphFile::from_graph(graph, root)).map_err(
        |source| DecoratorError::Serialization {
            what: "graph",
            source,
        },
    )?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| file_system(parent, "create directory", e))?;
    }
    std::fs::write(path, text).map_err(|e| file_system(path, "write", e))
}
