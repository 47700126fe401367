//! Progress reporting for pipeline runs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

/// Severity of a forwarded log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Progress events emitted by the pipelines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A module entered the build pipeline
    ModuleStart {
        name: String,
        current: Option<usize>,
        total: Option<usize>,
    },
    /// A module left the build pipeline
    ModuleComplete {
        name: String,
        success: bool,
        error: Option<String>,
    },
    /// The run moved to a new stage
    Stage { name: String },
    /// Free-form log line
    Log { level: LogLevel, message: String },
}

/// Trait for progress UI implementations
pub trait ProgressUI: Send + Sync {
    /// Update the UI with a progress event
    fn update(&self, event: &ProgressEvent);

    /// Clear the progress display
    fn clear(&self);

    /// Finish the progress display
    fn finish(&self);
}

/// Indicatif-based progress UI implementation
pub struct IndicatifProgressUI {
    multi_progress: MultiProgress,
    main_bar: ProgressBar,
    module_bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
    completed: Arc<Mutex<usize>>,
    start_time: Instant,
}

impl IndicatifProgressUI {
    /// Create a new indicatif progress UI
    pub fn new() -> Self {
        let multi_progress = MultiProgress::new();

        let main_bar = multi_progress.add(ProgressBar::new(0));
        main_bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{prefix:.bold.dim} {spinner:.green} [{elapsed_precise}] \
                     [{wide_bar:.cyan/blue}] {pos}/{len}",
                )
                .expect("Valid template")
                .progress_chars("#>-"),
        );
        main_bar.set_prefix("Building modules");

        Self {
            multi_progress,
            main_bar,
            module_bars: Arc::new(Mutex::new(HashMap::new())),
            completed: Arc::new(Mutex::new(0)),
            start_time: Instant::now(),
        }
    }

    fn create_module_bar(&self, module: &str) -> ProgressBar {
        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner:.green} {wide_msg}")
                .expect("Valid template"),
        );
        pb.set_prefix(format!("  {module}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    fn handle_module_start(&self, name: &str, current: Option<usize>, total: Option<usize>) {
        if let Some(total) = total {
            self.main_bar.set_length(total as u64);
        }

        let pb = self.create_module_bar(name);
        pb.set_message("Building...");
        if let Ok(mut bars) = self.module_bars.lock() {
            bars.insert(name.to_string(), pb);
        }

        if let (Some(current), Some(total)) = (current, total) {
            self.main_bar
                .set_message(format!("Building {name} [{current}/{total}]"));
        }
    }

    fn handle_module_complete(&self, name: &str, success: bool, error: Option<&str>) {
        if let Ok(bars) = self.module_bars.lock() {
            if let Some(pb) = bars.get(name) {
                if success {
                    pb.finish_with_message("✓ Complete");
                } else {
                    pb.finish_with_message(format!("✗ {}", error.unwrap_or("Failed")));
                }
            }
        }

        if let Ok(mut completed) = self.completed.lock() {
            *completed += 1;
            self.main_bar.set_position(*completed as u64);
        }
    }

    fn handle_log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => {
                error!("{}", message);
                self.multi_progress.println(format!("ERROR: {message}")).ok();
            }
            LogLevel::Warn => {
                warn!("{}", message);
                self.multi_progress.println(format!("WARN: {message}")).ok();
            }
            LogLevel::Info => info!("{}", message),
            LogLevel::Debug => debug!("{}", message),
        }
    }
}

impl Default for IndicatifProgressUI {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressUI for IndicatifProgressUI {
    fn update(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ModuleStart { name, current, total } => {
                self.handle_module_start(name, *current, *total);
            }
            ProgressEvent::ModuleComplete { name, success, error } => {
                self.handle_module_complete(name, *success, error.as_deref());
            }
            ProgressEvent::Stage { name } => {
                self.main_bar.set_prefix(format!("Stage: {name}"));
            }
            ProgressEvent::Log { level, message } => {
                self.handle_log(*level, message);
            }
        }
    }

    fn clear(&self) {
        self.multi_progress.clear().ok();
    }

    fn finish(&self) {
        if let Ok(bars) = self.module_bars.lock() {
            for pb in bars.values() {
                if !pb.is_finished() {
                    pb.finish();
                }
            }
        }

        let elapsed = self.start_time.elapsed();
        self.main_bar
            .finish_with_message(format!("Run completed in {elapsed:?}"));
    }
}

/// No-op progress UI for non-interactive runs; events go to the log
pub struct NoOpProgressUI;

impl ProgressUI for NoOpProgressUI {
    fn update(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ModuleStart { name, current, total } => {
                if let (Some(current), Some(total)) = (current, total) {
                    info!("Building module {} [{}/{}]", name, current, total);
                } else {
                    info!("Building module {}", name);
                }
            }
            ProgressEvent::ModuleComplete { name, success, error } => {
                if *success {
                    info!("Module {} processed", name);
                } else {
                    error!(
                        "Module {} failed: {}",
                        name,
                        error.as_deref().unwrap_or("Unknown error")
                    );
                }
            }
            ProgressEvent::Stage { name } => info!("Stage: {}", name),
            ProgressEvent::Log { level, message } => match level {
                LogLevel::Error => error!("{}", message),
                LogLevel::Warn => warn!("{}", message),
                LogLevel::Info => info!("{}", message),
                LogLevel::Debug => debug!("{}", message),
            },
        }
    }

    fn clear(&self) {}

    fn finish(&self) {
        info!("Run completed");
    }
}

/// Progress UI factory
pub struct ProgressUIFactory;

impl ProgressUIFactory {
    /// Create a progress UI based on environment
    pub fn create(interactive: bool) -> Arc<dyn ProgressUI> {
        if interactive && atty::is(atty::Stream::Stdout) {
            Arc::new(IndicatifProgressUI::new())
        } else {
            Arc::new(NoOpProgressUI)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicatif_ui_accepts_full_event_sequence() {
        let ui = IndicatifProgressUI::new();

        ui.update(&ProgressEvent::Stage { name: "sync".to_string() });
        ui.update(&ProgressEvent::ModuleStart {
            name: "app".to_string(),
            current: Some(1),
            total: Some(2),
        });
        ui.update(&ProgressEvent::ModuleComplete {
            name: "app".to_string(),
            success: true,
            error: None,
        });
        ui.update(&ProgressEvent::Log {
            level: LogLevel::Info,
            message: "halfway".to_string(),
        });
        ui.finish();
    }

    #[test]
    fn noop_ui_never_panics() {
        let ui = NoOpProgressUI;

        ui.update(&ProgressEvent::ModuleStart {
            name: "app".to_string(),
            current: None,
            total: None,
        });
        ui.update(&ProgressEvent::ModuleComplete {
            name: "app".to_string(),
            success: false,
            error: Some("exit code 1".to_string()),
        });
        ui.clear();
        ui.finish();
    }
}
