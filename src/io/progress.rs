//! Variant progress tracking for batch generation

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress display for a run of variants
///
/// One bar advances per finished variant; the message shows the seed being
/// generated and the instance count of the last one.
pub struct ProgressManager {
    bar: ProgressBar,
    completed: usize,
    skipped: usize,
}

impl ProgressManager {
    /// Bar over `variants` variants
    pub fn new(variants: usize) -> Self {
        let bar = ProgressBar::new(variants as u64);
        bar.set_style(Self::style());
        Self {
            bar,
            completed: 0,
            skipped: 0,
        }
    }

    fn style() -> ProgressStyle {
        let template = format!(
            "[{{elapsed_precise}}] [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        );
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ ")
    }

    /// Show the seed about to be generated
    pub fn start_variant(&self, seed: u64) {
        self.bar.set_message(format!("seed {seed}"));
    }

    /// Count a finished variant
    pub fn complete_variant(&mut self, seed: u64, instances: usize, elapsed: Duration) {
        self.completed += 1;
        self.bar
            .set_message(format!("seed {seed}: {instances} instances in {elapsed:.2?}"));
        self.bar.inc(1);
    }

    /// Count a variant whose output already existed
    pub fn skip_variant(&mut self, seed: u64) {
        self.skipped += 1;
        self.bar.set_message(format!("seed {seed}: exists, skipped"));
        self.bar.inc(1);
    }

    /// Variants generated so far
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Variants skipped so far
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Close the bar with a summary
    pub fn finish(&self) {
        self.bar.finish_with_message(format!(
            "{} generated, {} skipped",
            self.completed, self.skipped
        ));
    }
}
