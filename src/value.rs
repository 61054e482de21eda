use serde_json::Value;

const MAGNITUDE_SUFFIXES: &[(i32, &str)] = &[
    (3, "k"),
    (6, "m"),
    (9, "b"),
    (12, "t"),
    (15, "qa"),
    (18, "qi"),
    (21, "sx"),
    (24, "sp"),
    (27, "oct"),
    (30, "non"),
    (33, "dec"),
];

/// Renders an ISK amount as a short magnitude string ("1.50k", "25.0k",
/// "999m"). Values below 1000 render as plain integer text; values past the
/// last suffix band fall back to plain integer text as well.
pub fn format_magnitude(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    if magnitude < 1_000.0 {
        return format!("{}", value.trunc() as i64);
    }
    if magnitude >= 1e36 {
        return format!("{value:.0}");
    }
    for (power, suffix) in MAGNITUDE_SUFFIXES.iter().rev() {
        let base = 10f64.powi(*power);
        if magnitude >= base {
            return format!("{}{suffix}", format_chopped(value / base));
        }
    }
    format!("{}", value.trunc() as i64)
}

/// JSON-boundary variant: numbers are formatted, anything else passes
/// through unchanged so a malformed source value never aborts a cycle.
pub fn format_value_field(value: &Value) -> String {
    match value.as_f64() {
        Some(number) => format_magnitude(number),
        None => match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}

fn format_chopped(chopped: f64) -> String {
    let scale = chopped.abs();
    if scale < 10.0 {
        format!("{chopped:.2}")
    } else if scale < 100.0 {
        format!("{chopped:.1}")
    } else {
        format!("{chopped:.0}")
    }
}
