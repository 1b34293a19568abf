//! Progress reporting for apply runs

use converge::{Outcome, OutcomeStatus, Progress};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the resources of one apply run
pub struct ApplyProgress {
    bar: ProgressBar,
}

impl ApplyProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} {msg}")
                .expect("static progress template")
                .progress_chars("█▓░"),
        );
        Self { bar }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}

impl Progress for ApplyProgress {
    fn on_resource_start(&mut self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_resource_complete(&mut self, outcome: &Outcome) {
        let symbol = match outcome.status {
            OutcomeStatus::Unchanged => "○",
            OutcomeStatus::Changed => "✓",
            OutcomeStatus::Skipped => "⊘",
            OutcomeStatus::Failed => "✗",
        };
        self.bar.set_message(format!("{} {}", symbol, outcome.name));
        self.bar.inc(1);
    }
}
