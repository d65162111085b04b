//! CLI argument validators.

use crate::constants::threshold;

/// Parse a float, with a uniform error message.
fn parse_float(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{s}' is not a finite number"))
    }
}

/// Parse a detection threshold in `(0, 1]`.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_threshold(s: &str) -> Result<f32, String> {
    let value = parse_float(s)?;

    if value <= 0.0 || value > f64::from(threshold::MAX) {
        return Err(format!(
            "threshold must be greater than 0 and at most {}, got {value}",
            threshold::MAX
        ));
    }

    Ok(value as f32)
}

/// Parse a non-negative duration in seconds.
pub fn parse_non_negative_secs(s: &str) -> Result<f64, String> {
    let value = parse_float(s)?;

    if value < 0.0 {
        return Err(format!("seconds must not be negative, got {value}"));
    }

    Ok(value)
}

/// Parse a count of at least 1.
pub fn parse_positive_count(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("value must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("'{s}' is not a valid count")),
    }
}
