//! Equality predicates for values the API canonicalises
//!
//! The API rewrites some values on the way back: durations come back in Go's
//! canonical form (`5m` becomes `5m0s`) and JSON payloads are re-serialised.
//! These predicates decide whether two literal forms mean the same thing.

use std::time::Duration;

/// Parse a duration string in either humantime or Go syntax
///
/// Accepts `1h`, `1h0m0s`, `90s`, `1.5h`, `300ms`, `2µs` and the bare `0`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "0" {
        return Some(Duration::ZERO);
    }

    let ascii = trimmed.replace(['µ', 'μ'], "u");
    humantime::parse_duration(&ascii)
        .ok()
        .or_else(|| parse_fractional(&ascii))
}

/// Go allows decimal fractions per unit (`1.5h`), which humantime rejects
fn parse_fractional(input: &str) -> Option<Duration> {
    let mut total = 0f64;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1e0,
            "us" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += number * nanos_per_unit;
    }

    Some(Duration::from_nanos(total.round() as u64))
}

/// Durations are equal when they parse to the same length of time
///
/// Unparseable input falls back to literal comparison.
pub fn duration_eq(a: &str, b: &str) -> bool {
    match (parse_duration(a), parse_duration(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// JSON documents are equal when they parse to the same value
///
/// Key order and whitespace are ignored. Unparseable input falls back to
/// literal comparison.
pub fn json_eq(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

/// Compact serialisation used when no prior literal form is available
pub fn canonical_json(value: &serde_json::Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_canonical_forms() {
        assert_eq!(parse_duration("1h0m0s"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("5m0s"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("2µs"), Some(Duration::from_micros(2)));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("0s"), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("5 fortnights"), None);
    }

    #[test]
    fn test_duration_eq() {
        assert!(duration_eq("1h", "1h0m0s"));
        assert!(duration_eq("5m", "5m0s"));
        assert!(duration_eq("24h", "1440m"));
        assert!(!duration_eq("5m", "5m1s"));
        assert!(duration_eq("bogus", "bogus"));
        assert!(!duration_eq("bogus", "5m"));
    }

    #[test]
    fn test_json_eq_ignores_layout() {
        assert!(json_eq(r#"{"a": 1, "b": [1, 2]}"#, r#"{"b":[1,2],"a":1}"#));
        assert!(json_eq("{\n  \"a\": {\"x\": true}\n}", r#"{"a":{"x":true}}"#));
        assert!(!json_eq(r#"{"b": [2, 1]}"#, r#"{"b": [1, 2]}"#));
        assert!(!json_eq(r#"{"a": 1}"#, "not json"));
    }
}
