//! Phase-based progress reporting for long tile passes

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::LazyLock;

/// Receives progress events from a pipeline
pub trait Progress {
    /// Begin a named phase of `total` units
    fn start_phase(&mut self, name: &str, total: usize);

    /// Mark one unit done
    fn advance(&mut self, unit: &str);

    /// Close the current phase
    fn finish_phase(&mut self);
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start_phase(&mut self, _name: &str, _total: usize) {}

    fn advance(&mut self, _unit: &str) {}

    fn finish_phase(&mut self) {}
}

static PHASE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "[{{elapsed_precise}}] {{prefix:>10}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Terminal progress bars, one per phase
pub struct ProgressManager {
    multi_progress: MultiProgress,
    bar: Option<ProgressBar>,
    phases_completed: usize,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a progress manager with no active phase
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            bar: None,
            phases_completed: 0,
        }
    }

    /// Number of phases closed so far
    pub const fn phases_completed(&self) -> usize {
        self.phases_completed
    }

    /// Clean up all progress displays
    pub fn finish(&mut self) {
        self.finish_phase();
        let _ = self.multi_progress.clear();
    }
}

impl Progress for ProgressManager {
    fn start_phase(&mut self, name: &str, total: usize) {
        self.finish_phase();
        let bar = ProgressBar::new(total as u64);
        bar.set_style(PHASE_STYLE.clone());
        bar.set_prefix(name.to_string());
        self.bar = Some(self.multi_progress.add(bar));
    }

    fn advance(&mut self, unit: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(unit.to_string());
            bar.inc(1);
        }
    }

    fn finish_phase(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message("done");
            self.phases_completed += 1;
        }
    }
}
