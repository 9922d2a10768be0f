//! Progress tracking and callbacks for registration workflows.
//!
//! The pattern search reports once per iteration and once per completed
//! step level; callbacks decide what to do with it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Progress information for one optimizer iteration.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Step level (0 is the coarsest).
    pub level: usize,
    /// Iteration within the level.
    pub iteration: usize,
    /// Iteration budget of the level.
    pub total_iterations: Option<usize>,
    /// Current objective value.
    pub loss: f64,
    /// Time elapsed since start.
    pub elapsed: Duration,
    /// Step scale of the level relative to the initial steps.
    pub step_scale: f64,
}

impl ProgressInfo {
    /// Create new progress information.
    pub fn new(
        level: usize,
        iteration: usize,
        total_iterations: Option<usize>,
        loss: f64,
        elapsed: Duration,
        step_scale: f64,
    ) -> Self {
        Self {
            level,
            iteration,
            total_iterations,
            loss,
            elapsed,
            step_scale,
        }
    }

    /// Calculate progress percentage within the level.
    pub fn progress_percent(&self) -> Option<f64> {
        self.total_iterations
            .filter(|total| *total > 0)
            .map(|total| (self.iteration as f64 / total as f64) * 100.0)
    }
}

/// Progress callback trait for monitoring registration progress.
pub trait ProgressCallback: Send + Sync {
    /// Called at each iteration with progress information.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when registration starts.
    fn on_start(&self) {}

    /// Called when registration completes successfully.
    fn on_complete(&self, _info: &ProgressInfo) {}

    /// Called when registration fails.
    fn on_error(&self, _error: &str) {}
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log interval (iterations).
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 10 }
    }
}

impl ConsoleProgressCallback {
    /// Create a new console progress callback.
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.iteration % self.log_interval == 0 || info.total_iterations == Some(info.iteration) {
            tracing::debug!(
                "Level {} iter {}/{} ({:.1}%) | Loss: {:.6} | Step scale: {:.3e} | Elapsed: {:.2}s",
                info.level,
                info.iteration,
                info.total_iterations.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
                info.progress_percent().unwrap_or(0.0),
                info.loss,
                info.step_scale,
                info.elapsed.as_secs_f64(),
            );
        }
    }

    fn on_start(&self) {
        tracing::debug!("Registration started");
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "Registration completed in {:.2}s with final loss: {:.6}",
            info.elapsed.as_secs_f64(),
            info.loss
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Registration failed: {}", error);
    }
}

/// History callback that records all progress information.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    /// Create a new history callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded history.
    pub fn get_history(&self) -> Vec<ProgressInfo> {
        lock(&self.history).clone()
    }

    /// Recorded losses in order.
    pub fn losses(&self) -> Vec<f64> {
        lock(&self.history).iter().map(|info| info.loss).collect()
    }

    /// Clear the history.
    pub fn clear(&self) {
        lock(&self.history).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        lock(&self.history).push(info.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Progress tracker that fans out to multiple callbacks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    start_time: Option<Instant>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Whether any callback is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Start tracking.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_start();
        }
    }

    /// Update progress.
    pub fn update(
        &self,
        level: usize,
        iteration: usize,
        total_iterations: Option<usize>,
        loss: f64,
        step_scale: f64,
    ) {
        let info = ProgressInfo::new(level, iteration, total_iterations, loss, self.elapsed(), step_scale);
        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    /// Complete tracking.
    pub fn complete(&self, final_loss: f64) {
        let info = ProgressInfo::new(0, 0, None, final_loss, self.elapsed(), 0.0);
        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    /// Report error.
    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
