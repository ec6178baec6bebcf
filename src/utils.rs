use chrono::Duration;

/// Formats a song position as `mm:ss.d`, with a leading `-` in the pre-roll
pub fn format_time(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let tenths = (seconds.abs() * 10.0).floor() as i64;
    let duration = Duration::milliseconds(tenths * 100);
    format!(
        "{}{:02}:{:02}.{}",
        sign,
        duration.num_minutes(),
        duration.num_seconds() % 60,
        (duration.num_milliseconds() % 1000) / 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00.0");
        assert_eq!(format_time(1.5), "00:01.5");
        assert_eq!(format_time(125.96), "02:05.9");
        assert_eq!(format_time(-3.0), "-00:03.0");
    }
}
