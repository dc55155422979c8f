use indicatif::{ProgressBar, ProgressStyle};
use intezer_analyze_core::ProgressReporter;
use std::sync::Mutex;

const BAR_TEMPLATE: &str = "{msg} [{bar:30.cyan/dim}] {pos}/{len}";

/// One indicatif bar per directory level or list, and one for the wait pass.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn new_bar(label: &str, len: usize) -> ProgressBar {
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─");
        pb.set_style(style);
        pb.set_message(label.to_string());
        pb
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish();
            }
            *guard = Some(pb);
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_batch_start(&self, label: &str, len: usize) {
        self.set_bar(Self::new_bar(label, len));
    }

    fn on_item_done(&self) {
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_batch_complete(&self) {
        self.finish_bar();
    }

    fn on_wait_start(&self, len: usize) {
        if len > 0 {
            self.set_bar(Self::new_bar("Waiting for results", len));
        }
    }

    fn on_wait_progress(&self, resolved: usize) {
        self.with_bar(|pb| pb.set_position(resolved as u64));
    }

    fn on_wait_complete(&self) {
        self.finish_bar();
    }
}
