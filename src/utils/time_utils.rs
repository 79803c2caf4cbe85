use chrono::{DateTime, Datelike, FixedOffset, Utc};

/// English ordinal suffix for a day of month: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st...
pub fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Format a timestamp as `"January 5th 2024, 3:04 PM"` in the given offset.
pub fn format_moment_label(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> String {
    let local = timestamp.with_timezone(offset);
    let day = local.day();
    format!(
        "{} {}{} {}",
        local.format("%B"),
        day,
        ordinal_suffix(day),
        local.format("%Y, %-I:%M %p"),
    )
}
