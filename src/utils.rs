/// Utility functions for formatting
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_day_first() {
        assert_eq!(
            format_datetime(&datetime!(2024-01-05 07:08:09 UTC)),
            "05.01.2024 - 07:08:09"
        );
    }
}
