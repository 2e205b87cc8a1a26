use chrono::{DateTime, Utc};

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Function to format timestamp as readable UTC date
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_formatting() {
        let timestamp = 1609459200; // 2021-01-01 00:00:00
        assert_eq!(format_timestamp(timestamp), "2021-01-01 00:00:00");
    }

    #[test]
    fn test_current_timestamp() {
        let timestamp = current_timestamp();
        assert!(timestamp > 0);
        // Verify timestamp is recent (within last minute)
        assert!(Utc::now().timestamp() - timestamp < 60);
    }
}
