//! CLI entry point for seeded decorator graph generation

use clap::Parser;
use treedecor::io::cli::{Cli, VariantProcessor};

fn main() -> treedecor::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut processor = VariantProcessor::new(cli);
    processor.process()
}
