//! Terminal progress bar for the storage transfer.

use std::time::Duration;

use harpin_upload_core::progress::ProgressObserver;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{prefix:.bold} [{elapsed_precise}] [{wide_bar}] {bytes}/{total_bytes} ({eta})";

/// An `indicatif` bar fed by the core's read-through byte counter.
pub struct TransferBar {
    bar: ProgressBar,
}

impl TransferBar {
    pub fn new(file_name: &str) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = ProgressBar::new(0).with_style(style);
        bar.set_prefix(file_name.to_string());
        Self { bar }
    }
}

impl ProgressObserver for TransferBar {
    fn begin(&self, total: u64) {
        self.bar.reset();
        self.bar.set_length(total);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
