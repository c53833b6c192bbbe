//! Number formatting for reports and chart axes.
//!
//! Every formatter prints `n/a` for `NaN` and infinities.

const NOT_AVAILABLE: &str = "n/a";

/// Dollar amount with thousands separators and two decimals.
///
/// # Examples
///
/// ```
/// use fairvalue_output::format_currency;
///
/// assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
/// assert_eq!(format_currency(-42.5), "-$42.50");
/// assert_eq!(format_currency(f64::NAN), "n/a");
/// ```
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${}.{fraction}", group_thousands(whole))
}

/// Rate as a percentage with two decimals, e.g. `0.08` becomes `8.00%`.
pub fn format_percent(rate: f64) -> String {
    if rate.is_finite() {
        format!("{:.2}%", rate * 100.0)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

/// Plain ratio with two decimals.
pub fn format_ratio(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        NOT_AVAILABLE.to_string()
    }
}

/// Short magnitude for axis labels, e.g. `1.25B`.
pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    format!("{scaled:.2}{suffix}")
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
