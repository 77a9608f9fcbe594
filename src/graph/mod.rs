//! Module graph: typed ports, forward links and their reverse index
//!
//! This module contains the graph-related functionality including:
//! - The closed set of module kinds and their port layouts
//! - The module arena with validated link editing
//! - The back-link index resolving who feeds an input
//! - Weight tables for the branch selector

/// Reverse adjacency over the forward link tables
pub mod backlink;
/// Modules, ports and module kinds
pub mod module;
/// Weighted probabilistic choice
pub mod selector;
/// Module arena and graph editing
pub mod topology;

pub use backlink::{BackLinkIndex, LinkSource};
pub use module::{LinkTarget, Module, ModuleId, ModuleKind};
pub use selector::WeightTable;
pub use topology::ModuleGraph;
