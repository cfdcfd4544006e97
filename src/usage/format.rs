/// Formats a total as `{H}h {M}m {S}s`. The hour segment only appears from one hour on and the
/// minute segment only when the seconds left after whole hours reach a minute; seconds are always
/// present.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::with_capacity(3);
    if total_secs >= 3600 {
        parts.push(format!("{hours}h"));
    }
    if total_secs % 3600 >= 60 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}
