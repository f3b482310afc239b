use std::time::Duration;

/// Formats a duration as a human-readable span: `"2 minutes and 3 seconds"`,
/// `"1 hour, 4 minutes and 10 seconds"`, `"0.5 seconds"`.
///
/// Used by the epoch-summary log line where raw second counts read poorly.
pub fn format_timespan(d: Duration) -> String {
    const UNITS: [(u64, &str); 4] = [
        (604_800, "week"),
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
    ];

    let total = d.as_secs_f64();
    if total < 60.0 {
        return format_seconds(total);
    }

    let mut secs = d.as_secs();
    let mut parts = Vec::new();
    for (span, name) in UNITS {
        let n = secs / span;
        if n > 0 {
            parts.push(plural(n, name));
            secs %= span;
        }
    }
    if secs > 0 {
        parts.push(plural(secs, "second"));
    }
    join_with_and(&parts)
}

fn format_seconds(s: f64) -> String {
    // Round to centiseconds; drop the fraction entirely when whole.
    let rounded = (s * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        plural(rounded as u64, "second")
    } else {
        format!("{rounded} seconds")
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

fn join_with_and(parts: &[String]) -> String {
    match parts {
        [] => "0 seconds".to_string(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {last}", head.join(", ")),
    }
}
