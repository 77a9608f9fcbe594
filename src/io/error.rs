//! Error types for graph editing, persistence and export

use crate::graph::module::{ModuleId, PortKind};
use std::fmt;
use std::path::PathBuf;

/// Main error type for all engine operations
///
/// Evaluation itself never fails: an absent contribution is `None`. These
/// errors come from graph editing, file handling and contract violations.
#[derive(Debug)]
pub enum DecoratorError {
    /// Failed to read or parse a graph file
    GraphLoad {
        /// Path to the graph file
        path: PathBuf,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// Failed to serialize a graph or a generated collection
    Serialization {
        /// What was being written
        what: &'static str,
        /// Underlying serialization error
        source: serde_json::Error,
    },

    /// Graph file carries a version this build does not read
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Version this build reads and writes
        expected: u32,
    },

    /// Graph structure is inconsistent
    InvalidGraph {
        /// Description of the inconsistency
        reason: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Module index outside the graph
    InvalidModuleIndex {
        /// The invalid index
        index: usize,
        /// Number of modules in the graph
        module_count: usize,
    },

    /// Port index outside a module's port list
    InvalidPort {
        /// Module owning the port
        module: ModuleId,
        /// The invalid port index
        port: usize,
        /// Whether the port is an input
        input: bool,
        /// Number of ports of that direction
        port_count: usize,
    },

    /// Link between ports carrying different data
    PortKindMismatch {
        /// Kind of the output port
        output: PortKind,
        /// Kind of the input port
        input: PortKind,
    },

    /// Link already present
    DuplicateLink {
        /// Producing module
        source_module: ModuleId,
        /// Consuming module
        target_module: ModuleId,
        /// Input port on the consumer
        input_port: usize,
    },

    /// Back-link index used against a graph that changed since it was built
    StaleIndex {
        /// Graph revision the index was built at
        built_at: u64,
        /// Current graph revision
        current: u64,
    },

    /// Failed to save a preview image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for DecoratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GraphLoad { path, source } => {
                write!(f, "Failed to load graph '{}': {source}", path.display())
            }
            Self::Serialization { what, source } => {
                write!(f, "Failed to serialize {what}: {source}")
            }
            Self::UnsupportedVersion { found, expected } => {
                write!(
                    f,
                    "Unsupported graph file version {found} (expected {expected})"
                )
            }
            Self::InvalidGraph { reason } => write!(f, "Invalid graph: {reason}"),
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::InvalidModuleIndex {
                index,
                module_count,
            } => {
                write!(
                    f,
                    "Module index {index} is out of bounds (graph has {module_count} modules)"
                )
            }
            Self::InvalidPort {
                module,
                port,
                input,
                port_count,
            } => {
                let direction = if *input { "input" } else { "output" };
                write!(
                    f,
                    "Module {module} has no {direction} port {port} ({port_count} available)"
                )
            }
            Self::PortKindMismatch { output, input } => {
                write!(f, "Cannot link {output:?} output to {input:?} input")
            }
            Self::DuplicateLink {
                source_module,
                target_module,
                input_port,
            } => {
                write!(
                    f,
                    "Module {source_module} is already linked to input {input_port} of {target_module}"
                )
            }
            Self::StaleIndex { built_at, current } => {
                write!(
                    f,
                    "Back-link index built at revision {built_at} used at revision {current}"
                )
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for DecoratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::GraphLoad { source, .. } | Self::Serialization { source, .. } => Some(source),
            Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for engine results
pub type Result<T> = std::result::Result<T, DecoratorError>;

impl From<std::io::Error> for DecoratorError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> DecoratorError {
    DecoratorError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an invalid graph error
pub fn invalid_graph(reason: &impl ToString) -> DecoratorError {
    DecoratorError::InvalidGraph {
        reason: reason.to_string(),
    }
}

/// Create a file system error for `path`
pub fn file_system(
    path: impl Into<PathBuf>,
    operation: &'static str,
    source: std::io::Error,
) -> DecoratorError {
    DecoratorError::FileSystem {
        path: path.into(),
        operation,
        source,
    }
}
