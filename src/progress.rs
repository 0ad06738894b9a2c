use std::io::Write;

use crate::util;

const BAR_WIDTH: usize = 40;

/// One transfer update reported by the engine. Any field may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressEvent {
    pub percent: Option<f64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Seconds remaining
    pub eta: Option<u64>,
}

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);

    /// Transfer done, post-processing may follow.
    fn on_finished(&self) {}
}

pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Redraws a single console line per event.
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn render(event: &ProgressEvent) -> Option<String> {
        let percent = event.percent?.clamp(0.0, 100.0);
        let done = (BAR_WIDTH as f64 * percent / 100.0) as usize;

        let eta = event
            .eta
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "--".to_string());
        let speed = event
            .speed
            .map(util::format_rate)
            .unwrap_or_else(|| "--".to_string());

        Some(format!(
            "[{}{}] {:5.1}% | ETA: {} | Speed: {}",
            "=".repeat(done),
            " ".repeat(BAR_WIDTH - done),
            percent,
            eta,
            speed
        ))
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(line) = Self::render(event) {
            print!("\x1b[2K\r{}", line);
            let _ = std::io::stdout().lock().flush();
        }
    }

    fn on_finished(&self) {
        println!();
        println!("Download finished, post-processing...");
    }
}
