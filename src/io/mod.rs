//! Input/output operations and error handling

/// Command-line interface and batch variant generation
pub mod cli;
/// Engine constants and defaults
pub mod configuration;
/// Error type shared by the crate
pub mod error;
/// Instance records and OBJ export
pub mod export;
/// JSON graph documents
pub mod graph_file;
/// PNG previews
pub mod image;
/// Progress bars for batch runs
pub mod progress;
