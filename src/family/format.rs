//! Value formatting shared by the metadata families.

/// Drop trailing zeros of a decimal string, and the point if nothing is left
/// after it: `"44.10"` -> `"44.1"`, `"48.00"` -> `"48"`. Integers are kept.
pub fn strip_zeros(decimal: &str) -> String {
    if !decimal.contains('.') {
        return decimal.to_string();
    }
    let trimmed = decimal.trim_end_matches('0');
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

/// Two-decimal rendering with trailing zeros stripped
pub fn decimal(value: f64) -> String {
    strip_zeros(&format!("{:.2}", value))
}

/// Seconds as an ISO 8601 duration, `PT[h]H[m]M[s]S`, seconds to two
/// decimals. Zero components are omitted; a zero duration is `PT0S`.
pub fn iso8601_duration(seconds: f64) -> String {
    let hours = (seconds / 3600.0).floor();
    let minutes = (seconds / 60.0).floor().rem_euclid(60.0);
    let secs = seconds.rem_euclid(60.0);

    let mut out = String::from("PT");
    if hours != 0.0 {
        out.push_str(&format!("{}H", hours as i64));
    }
    if minutes != 0.0 {
        out.push_str(&format!("{}M", minutes as i64));
    }
    if secs != 0.0 {
        out.push_str(&format!("{}S", decimal(secs)));
    }

    if out.len() == 2 {
        out.push_str("0S");
    }
    out
}
