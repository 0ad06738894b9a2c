use std::time::Duration;

const BINARY_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Human-readable size in binary units, two decimals.
pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < BINARY_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, BINARY_UNITS[unit])
}

/// Transfer rate as reported by the engine, e.g. `1.50 MiB/s`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// `H:MM:SS` for anything an hour or longer, `M:SS` otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_scale_through_units() {
        assert_eq!(format_bytes(512.0), "512.00 B");
        assert_eq!(format_bytes(1024.0), "1.00 KiB");
        assert_eq!(format_bytes(1536.0), "1.50 KiB");
        assert_eq!(format_bytes(5.0 * 1024.0 * 1024.0), "5.00 MiB");
        assert_eq!(format_bytes(3.0 * 1024f64.powi(5)), "3072.00 TiB");
    }

    #[test]
    fn rate_is_per_second() {
        assert_eq!(format_rate(0.0), "0.00 B/s");
        assert_eq!(format_rate(1_572_864.0), "1.50 MiB/s");
        assert_eq!(format_rate(-5.0), "0.00 B/s");
    }

    #[test]
    fn elapsed_formats() {
        assert_eq!(format_elapsed(Duration::from_secs(7)), "0:07");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2:05");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "1:02:05");
    }
}
