use std::time::Duration;

use crate::types::Window;

/// Format seconds as MM:SS, or H:MM:SS past the hour
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, mins, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}.{}s", secs, d.subsec_millis() / 100)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Human-readable window span, e.g. `[03:30–08:30]`
pub fn format_window(window: &Window) -> String {
    format!(
        "[{}–{}]",
        format_timestamp(window.start),
        format_timestamp(window.end)
    )
}
