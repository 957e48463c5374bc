use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Simple progress bar for evaluation and data-processing loops
pub struct ProgressBar {
    total: usize,
    current: usize,
    prefix: String,
    width: usize,
    started: Instant,
}

impl ProgressBar {
    /// Create a new progress bar
    #[must_use]
    pub fn new(total: usize, prefix: &str) -> Self {
        Self {
            total,
            current: 0,
            prefix: prefix.to_string(),
            width: 40,
            started: Instant::now(),
        }
    }

    /// Update progress and display
    pub fn update(&mut self, current: usize) {
        self.current = current;
        self.render();
    }

    /// Increment by 1 and display
    pub fn inc(&mut self) {
        self.current += 1;
        self.render();
    }

    /// Time since the bar was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Finish the progress bar
    pub fn finish(&self) {
        eprint!("\r");
        let _ = io::stderr().flush();
    }

    fn render(&self) {
        let percent = if self.total > 0 {
            (self.current as f32 / self.total as f32 * 100.0) as usize
        } else {
            0
        };

        let filled = if self.total > 0 {
            (self.current * self.width / self.total).min(self.width)
        } else {
            0
        };

        let bar: String = "█".repeat(filled) + &"░".repeat(self.width - filled);

        eprint!(
            "\r{} [{}] {:3}% ({}/{}) {}",
            self.prefix,
            bar,
            percent,
            self.current,
            self.total,
            format_duration(self.elapsed())
        );
        let _ = io::stderr().flush();
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Human-readable duration showing at most the two most significant units,
/// e.g. "1d 3h", "2m 5s", "340ms".
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let days = total_ms / 86_400_000;
    let hours = (total_ms / 3_600_000) % 24;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;

    let units = [
        (days, "d"),
        (hours, "h"),
        (minutes, "m"),
        (seconds, "s"),
        (millis, "ms"),
    ];

    let mut parts = Vec::with_capacity(2);
    for &(value, suffix) in &units {
        if parts.len() == 2 {
            break;
        }
        if value > 0 {
            parts.push(format!("{value}{suffix}"));
        }
    }

    if parts.is_empty() {
        "0ms".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_zero() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }

    #[test]
    fn test_format_duration_millis_only() {
        assert_eq!(format_duration(Duration::from_millis(340)), "340ms");
    }

    #[test]
    fn test_format_duration_two_units() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3600 * 27)), "1d 3h");
    }

    #[test]
    fn test_format_duration_truncates_to_two_units() {
        // 1h 1m 1s renders as "1h 1m"
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }
}
