// Formatting helpers shared by the widgets

/// Formats a byte count with a binary unit, e.g. `1.5 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Fraction of the list reached when `index` is displayed, in `0.0..=1.0`
pub fn calculate_progress(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((index + 1) as f64 / total as f64).min(1.0)
}

/// Frame of the loading spinner for a monotonically increasing tick
pub fn spinner_frame(tick: usize) -> char {
    const FRAMES: [char; 8] = ['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];
    FRAMES[tick % FRAMES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(50 * 1024 * 1024), "50.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_calculate_progress() {
        assert_eq!(calculate_progress(0, 0), 0.0);
        assert_eq!(calculate_progress(0, 4), 0.25);
        assert_eq!(calculate_progress(3, 4), 1.0);
        assert_eq!(calculate_progress(10, 4), 1.0);
    }

    #[test]
    fn test_spinner_wraps() {
        assert_eq!(spinner_frame(0), spinner_frame(8));
        assert_ne!(spinner_frame(0), spinner_frame(1));
    }
}
