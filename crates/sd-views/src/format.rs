//! Number formatting for KPI display

/// Truncate `value` to at most `max_decimals` decimal places.
///
/// Non-finite values are returned unchanged.
pub fn trim_float(value: f64, max_decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(max_decimals as i32);
    let trimmed = (value * factor).trunc() / factor;
    if trimmed.is_finite() {
        trimmed
    } else {
        value
    }
}

/// Compact form of a number: `950`, `1.2K`, `3.45M`, `2.1B`
pub fn abbreviate_number(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let magnitude = value.abs();
    let (scaled, suffix) = if magnitude >= 1e9 {
        (value / 1e9, "B")
    } else if magnitude >= 1e6 {
        (value / 1e6, "M")
    } else if magnitude >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };

    format!("{}{}", trim_float(scaled, 2), suffix)
}

/// Signed percentage such as `+12.5%` or `-3%`
pub fn format_change(percentage: Option<f64>) -> String {
    match percentage {
        Some(p) if p.is_finite() => {
            let trimmed = trim_float(p, 2);
            if trimmed > 0.0 {
                format!("+{}%", trimmed)
            } else {
                format!("{}%", trimmed)
            }
        }
        _ => "-".to_string(),
    }
}
