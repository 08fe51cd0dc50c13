/// Truncate a string to a maximum length in characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None or empty
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(d) = chrono::NaiveDate::parse_from_str(date.get(..10).unwrap_or(date), "%Y-%m-%d") {
        d.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}

/// Rand amount from cents, e.g. `29900` -> `R299.00`
pub fn format_zar(cents: f64) -> String {
    let cents = cents.round() as i64;
    let digits = (cents.abs() / 100).to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}R{}.{:02}", sign, grouped, cents.abs() % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Jóhannesburg", 6), "Jóh...");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some("Durban"), "-"), "Durban");
        assert_eq!(format_optional(Some("  "), "-"), "-");
        assert_eq!(format_optional(None, "-"), "-");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2026-03-05T10:00:00Z"), "Mar 05, 2026");
        assert_eq!(format_date("2026-03-05"), "Mar 05, 2026");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_format_zar() {
        assert_eq!(format_zar(29900.0), "R299.00");
        assert_eq!(format_zar(12345678.0), "R123 456.78");
        assert_eq!(format_zar(5.0), "R0.05");
    }
}
