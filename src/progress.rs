//! Progress bars and tail-friendly logging for batch runs.
//!
//! In log-only mode bars are hidden and `log_progress` prints periodic
//! `[phase] n/total (pct%)` lines to stderr instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "fuzzytrackmatch=info";

/// Install the stderr `tracing` subscriber for a binary.
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Human-readable duration: "4.2s", "3.5m", "1.2h".
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

fn hidden_if_log_only(pb: ProgressBar, style: impl FnOnce() -> Option<ProgressStyle>) -> ProgressBar {
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Some(style) = style() {
        pb.set_style(style);
    }
    pb
}

/// Progress bar over `len` records. Hidden in log-only mode.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = hidden_if_log_only(ProgressBar::new(len), || {
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
            .ok()
            .map(|s| s.progress_chars("=> "))
    });
    pb.set_message(msg.to_string());
    pb
}

/// Spinner for steps of unknown length (loading files, building the taxonomy).
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = hidden_if_log_only(ProgressBar::new_spinner(), || {
        ProgressStyle::default_spinner()
            .template("{msg} {spinner} [{elapsed_precise}]")
            .ok()
    });
    if !is_log_only() {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Print `[phase] current/total (pct%)` every `interval` records and at the
/// end. Only in log-only mode.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if !is_log_only() || total == 0 {
        return;
    }
    if current % interval.max(1) == 0 || current == total {
        eprintln!("{}", progress_line(phase, current, total));
    }
}

fn progress_line(phase: &str, current: u64, total: u64) -> String {
    let pct = 100.0 * current as f64 / total as f64;
    format!("[{}] {}/{} ({:.1}%)", phase, current, total, pct)
}
