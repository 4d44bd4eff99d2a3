use std::time::Duration;

/// Format a downtime duration the way operators read it in the log stream.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total < 60 {
        format!("{total} seconds")
    } else if total < 3600 {
        format!("{} minutes {} seconds", total / 60, total % 60)
    } else {
        format!(
            "{} hours {} minutes {} seconds",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}
