use chrono::NaiveDate;

/// Parse a date in the formats datasets arrive in: ISO-8601 (`YYYY-MM-DD`)
/// or the locale convention `MM/DD/YYYY`. A trailing time-of-day component
/// (`2024-01-01 10:30` or `...T10:30:00`) is ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let date_part = trimmed
        .split_once(|c| c == 'T' || c == ' ')
        .map_or(trimmed, |(date, _)| date);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%m/%d/%Y"))
        .ok()
}

/// Canonical rendering used everywhere a date becomes text.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_loader_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(expected));
        assert_eq!(parse_date("03/09/2024"), Some(expected));
        assert_eq!(parse_date(" 2024-03-09 "), Some(expected));
    }

    #[test]
    fn ignores_time_of_day() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09 10:30"), Some(expected));
        assert_eq!(parse_date("2024-03-09T10:30:00"), Some(expected));
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("13/01/2024"), None);
    }

    #[test]
    fn round_trips_through_formatting() {
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(parse_date(&format_date(date)), Some(date));
    }
}
