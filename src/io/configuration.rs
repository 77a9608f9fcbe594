//! Engine constants and runtime configuration defaults

// Numeric floors applied instead of rejecting a configuration
/// Smallest size factor a decorator may be shrunk to
pub const MIN_SHRINK: f64 = 0.0001;
/// Smallest footprint a sampled decorator is assumed to cover
pub const MIN_FOOTPRINT: f64 = 0.001;
/// Floor applied before taking the reciprocal of a response curve
pub const MIN_CURVE_VALUE: f64 = 1e-6;
/// Smallest axial advance of a coil walk, as a fraction of the host height
pub const MIN_AXIAL_STEP: f64 = 1e-3;
/// Tolerance for degenerate lengths and areas
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Decorations sampled to estimate the footprint of a decorator
pub const DEFAULT_ESTIMATE_SAMPLES: usize = 8;
/// Safety cap on the instance count of a single spherical placement
pub const MAX_BALL_INSTANCES: usize = 100_000;
/// Safety cap on grid points visited per face by uniform scattering
pub const MAX_GRID_POINTS_PER_FACE: usize = 10_000;

/// Even number of Simpson intervals used to integrate response curves
pub const CURVE_INTEGRAL_STEPS: usize = 64;
/// Standard deviations mapped onto the half width of a Gaussian draw
pub const GAUSSIAN_FOLD_SPAN: f64 = 3.0;

// Default values for configurable parameters
/// Fixed seed for reproducible generation
pub const DEFAULT_SEED: u64 = 42;
/// Number of variants generated per invocation
pub const DEFAULT_VARIANTS: usize = 1;

// Persistence and output settings
/// Version tag written to and expected from graph files
pub const GRAPH_FILE_VERSION: u32 = 1;
/// Suffix added to output file stems
pub const OUTPUT_SUFFIX: &str = "_decor";
/// Edge length of the square preview image in pixels
pub const PREVIEW_SIZE: u32 = 512;
/// Blank border around the preview drawing in pixels
pub const PREVIEW_MARGIN: u32 = 16;

// Progress bar display settings
/// Width of the variant progress bar in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
