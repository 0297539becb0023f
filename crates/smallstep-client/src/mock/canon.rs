//! Server-side canonical forms
//!
//! The real API echoes durations in Go's `time.Duration` format and
//! re-serializes JSON payloads. The fake server does the same so that
//! literal-form preservation is exercised.

use serde_json::Value as Json;
use std::time::Duration;

use smallstep_core::normalize::parse_duration;

/// Format like Go's `Duration.String()`: `5m0s`, `1h0m0s`, `1.5s`, `250ms`
pub fn go_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", fraction(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", fraction(nanos, 1_000_000));
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = fraction(u128::from(total_secs % 60) * 1_000_000_000 + u128::from(d.subsec_nanos()), 1_000_000_000);

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// `value / unit` with trailing zeros of the fraction trimmed
fn fraction(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rest = value % unit;
    if rest == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{:0width$}", rest, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

fn is_duration_key(key: &str) -> bool {
    key == "duration" || key.ends_with("Duration") || key == "instanceAge" || key == "syncInterval"
}

/// Rewrite every duration-valued field to Go form, recursively
pub fn canonicalize_durations(value: &mut Json) {
    match value {
        Json::Object(fields) => {
            for (key, field) in fields.iter_mut() {
                if is_duration_key(key) {
                    if let Some(d) = field.as_str().and_then(parse_duration) {
                        *field = Json::String(go_duration(d));
                        continue;
                    }
                }
                canonicalize_durations(field);
            }
        }
        Json::Array(items) => items.iter_mut().for_each(canonicalize_durations),
        _ => {}
    }
}

/// Insert `defaults` for every key missing from `target`
pub fn insert_defaults(target: &mut Json, defaults: Json) {
    let (Json::Object(fields), Json::Object(defaults)) = (target, defaults) else {
        return;
    };
    for (key, value) in defaults {
        fields.entry(key).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_go_duration() {
        assert_eq!(go_duration(Duration::ZERO), "0s");
        assert_eq!(go_duration(Duration::from_secs(300)), "5m0s");
        assert_eq!(go_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(go_duration(Duration::from_secs(24 * 3600)), "24h0m0s");
        assert_eq!(go_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(go_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(go_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(go_duration(Duration::from_nanos(42)), "42ns");
        assert_eq!(go_duration(Duration::from_secs(3 * 3600 + 4)), "3h0m4s");
    }

    #[test]
    fn test_canonicalize_durations() {
        let mut body = json!({
            "claims": {"minTLSCertDuration": "5m", "enableSSHCA": true},
            "certificateInfo": {"duration": "1h", "crtFile": "/etc/crt"},
            "name": "5m"
        });
        canonicalize_durations(&mut body);
        assert_eq!(body["claims"]["minTLSCertDuration"], "5m0s");
        assert_eq!(body["certificateInfo"]["duration"], "1h0m0s");
        assert_eq!(body["name"], "5m");
    }

    #[test]
    fn test_insert_defaults_keeps_present_keys() {
        let mut body = json!({"type": "ECDSA_P256"});
        insert_defaults(&mut body, json!({"type": "DEFAULT", "format": "DEFAULT"}));
        assert_eq!(body, json!({"type": "ECDSA_P256", "format": "DEFAULT"}));
    }
}
