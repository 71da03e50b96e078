//! Working indicators for the two generation stages.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Copy,
    Images,
}

impl Stage {
    pub fn message(self) -> &'static str {
        match self {
            Stage::Copy => "Writing marketing copy…",
            Stage::Images => "Rendering images (may take ~40s on CPU)…",
        }
    }
}

pub trait Progress: Send + Sync {
    fn started(&self, stage: Stage);
    fn finished(&self, stage: Stage, success: bool);
}

/// Reports stages through the log only.
pub struct LogProgress;

impl Progress for LogProgress {
    fn started(&self, stage: Stage) {
        info!("{}", stage.message());
    }

    fn finished(&self, stage: Stage, success: bool) {
        info!("{:?} stage finished (success: {})", stage, success);
    }
}

/// Terminal spinner for the command-line entry point.
pub struct SpinnerProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for SpinnerProgress {
    fn started(&self, stage: Stage) {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
            bar.set_style(style);
        }
        bar.set_message(stage.message());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn finished(&self, stage: Stage, success: bool) {
        let Ok(mut slot) = self.bar.lock() else { return };
        if let Some(bar) = slot.take() {
            let outcome = if success { "done" } else { "failed" };
            bar.finish_with_message(format!("{} {}", stage.message(), outcome));
        }
    }
}
