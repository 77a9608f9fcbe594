//! Command-line interface for generating seeded variants of a module graph

use crate::engine::pass::GenerationPass;
use crate::graph::module::ModuleId;
use crate::graph::topology::ModuleGraph;
use crate::io::configuration::{DEFAULT_SEED, DEFAULT_VARIANTS, OUTPUT_SUFFIX};
use crate::io::error::{Result, invalid_parameter};
use crate::io::export::{GenerationRecord, write_json, write_obj};
use crate::io::graph_file::load_graph;
use crate::io::image::export_preview;
use crate::io::progress::ProgressManager;
use clap::Parser;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "treedecor")]
#[command(
    author,
    version,
    about = "Generate seeded plant geometry from a decorator module graph"
)]
/// Command-line arguments for the variant generator
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Graph document (JSON) to evaluate
    #[arg(value_name = "GRAPH")]
    pub graph: PathBuf,

    /// Root seed of the first variant
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Number of variants, seeded `seed`, `seed + 1`, ...
    #[arg(short = 'n', long, default_value_t = DEFAULT_VARIANTS)]
    pub variants: usize,

    /// Module to generate (defaults to the graph's root)
    #[arg(short, long)]
    pub module: Option<usize>,

    /// Output port of the generated module
    #[arg(short, long, default_value_t = 0)]
    pub port: usize,

    /// Directory for outputs (defaults to the graph's directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write a baked Wavefront OBJ
    #[arg(long)]
    pub obj: bool,

    /// Also write a PNG preview
    #[arg(long)]
    pub preview: bool,

    /// Mark modules as stop-here before generating
    #[arg(long, value_delimiter = ',')]
    pub stop_here: Vec<usize>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Regenerate variants even if output exists
    #[arg(long)]
    pub no_skip: bool,
}

impl Cli {
    /// Check if existing output files should be skipped
    pub const fn skip_existing(&self) -> bool {
        !self.no_skip
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Seed of the `variant`-th variant
    pub const fn variant_seed(&self, variant: usize) -> u64 {
        self.seed.wrapping_add(variant as u64)
    }
}

/// Runs a graph once per requested variant and writes the outputs
pub struct VariantProcessor {
    cli: Cli,
    progress_manager: Option<ProgressManager>,
}

impl VariantProcessor {
    /// Create a processor for the given arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli
            .should_show_progress()
            .then(|| ProgressManager::new(cli.variants));
        Self {
            cli,
            progress_manager,
        }
    }

    /// Generate every variant
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be loaded, no module is given and
    /// the graph has no root, a stop-here index is out of range, or a
    /// generation or output write fails
    pub fn process(&mut self) -> Result<()> {
        let loaded = load_graph(&self.cli.graph)?;
        let mut graph = loaded.graph;
        for &index in &self.cli.stop_here {
            graph.set_stop_here(ModuleId(index), true)?;
        }

        let module = self
            .cli
            .module
            .map(ModuleId)
            .or(loaded.root)
            .ok_or_else(|| {
                invalid_parameter("module", &"none", &"graph has no root; pass --module")
            })?;
        let name = graph.get(module)?.name.clone();
        let pass = GenerationPass::new(module, self.cli.port);
        info!(
            "generating {} variant(s) of '{name}' from '{}'",
            self.cli.variants,
            self.cli.graph.display()
        );

        for variant in 0..self.cli.variants {
            let seed = self.cli.variant_seed(variant);
            self.process_variant(&mut graph, &pass, &name, seed)?;
        }

        if let Some(ref pm) = self.progress_manager {
            pm.finish();
        }
        Ok(())
    }

    fn process_variant(
        &mut self,
        graph: &mut ModuleGraph,
        pass: &GenerationPass,
        name: &str,
        seed: u64,
    ) -> Result<()> {
        let json_path = self.output_path(seed, "json");
        if self.cli.skip_existing() && json_path.exists() {
            info!("skipping seed {seed}: {} exists", json_path.display());
            if let Some(ref mut pm) = self.progress_manager {
                pm.skip_variant(seed);
            }
            return Ok(());
        }

        let start_time = Instant::now();
        if let Some(ref pm) = self.progress_manager {
            pm.start_variant(seed);
        }

        let output = pass.run(graph, seed)?;
        let collection = &output.collection;
        if collection.is_empty() {
            warn!("seed {seed}: module '{name}' produced no geometry");
        }

        write_json(&GenerationRecord::new(seed, name, collection), &json_path)?;
        if self.cli.obj {
            write_obj(collection, &self.output_path(seed, "obj"))?;
        }
        if self.cli.preview && !collection.is_empty() {
            export_preview(collection, &self.output_path(seed, "png"))?;
        }

        info!(
            "seed {seed}: {} instances, {} draws",
            collection.len(),
            output.stats.total_draws()
        );
        if let Some(ref mut pm) = self.progress_manager {
            pm.complete_variant(seed, collection.len(), start_time.elapsed());
        }
        Ok(())
    }

    fn output_path(&self, seed: u64, extension: &str) -> PathBuf {
        output_path_for(&self.cli.graph, self.cli.output.as_deref(), seed, extension)
    }
}

/// `<dir>/<graph stem>_decor_<seed>.<extension>`
///
/// `dir` is `output_dir` when given, otherwise the graph's own directory.
pub fn output_path_for(
    graph_path: &Path,
    output_dir: Option<&Path>,
    seed: u64,
    extension: &str,
) -> PathBuf {
    let stem = graph_path.file_stem().unwrap_or_default();
    let file_name = format!(
        "{}{OUTPUT_SUFFIX}_{seed}.{extension}",
        stem.to_string_lossy()
    );
    match output_dir.or_else(|| graph_path.parent()) {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
