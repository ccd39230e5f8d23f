/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use econ_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return format_float(value);
    }

    // Handle the sign separately so the thousands grouping works on the
    // absolute value.
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Half-ULP nudge at the target precision so exact decimal midpoints
    // round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        // `frac_str` starts with "0.", e.g. "0.50".
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Shortest round-trip form of `value`, always carrying a decimal part for
/// finite integral values (`5.0`, `8.25`, `1e-7`).
///
/// This is the form used for the text cells of the yield sheets.
///
/// ```
/// use econ_core::formatting::format_float;
///
/// assert_eq!(format_float(5.0), "5.0");
/// assert_eq!(format_float(8.25), "8.25");
/// assert_eq!(format_float(f64::NAN), "nan");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Label form of a number read from a header or a spreadsheet cell.
///
/// Integral values print without a decimal part (`2024`), everything else
/// in shortest round-trip form (`0.05`).
pub fn format_label_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{}", value as i64)
    } else {
        format_float(value)
    }
}

/// Round `value` to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Whole-percent label for a fraction: `0.0523` → `"5%"`.
///
/// ```
/// use econ_core::formatting::percent_label;
///
/// assert_eq!(percent_label(0.0825), "8%");
/// assert_eq!(percent_label(0.12), "12%");
/// ```
pub fn percent_label(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// Percent text for a fraction, scaled by 100 and rounded to 3 decimals:
/// `0.0825` → `"8.25%"`, `0.05` → `"5.0%"`.
///
/// ```
/// use econ_core::formatting::percent_text;
///
/// assert_eq!(percent_text(0.0825), "8.25%");
/// assert_eq!(percent_text(0.123456), "12.346%");
/// ```
pub fn percent_text(fraction: f64) -> String {
    format!("{}%", format_float(round_to(fraction * 100.0, 3)))
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// ```
/// use econ_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    round_to((part / whole) * 100.0, decimal_places)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_234_567.0, 0), "1,234,567");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_negative_rounding_to_zero() {
        assert_eq!(format_number(-0.001, 0), "0");
    }

    #[test]
    fn test_format_number_nan() {
        assert_eq!(format_number(f64::NAN, 2), "nan");
    }

    // ── format_float ─────────────────────────────────────────────────────────

    #[test]
    fn test_format_float_integral_keeps_decimal() {
        assert_eq!(format_float(5.0), "5.0");
        assert_eq!(format_float(-12.0), "-12.0");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn test_format_float_shortest_form() {
        assert_eq!(format_float(8.25), "8.25");
        assert_eq!(format_float(0.1), "0.1");
    }

    #[test]
    fn test_format_float_infinite() {
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    }

    // ── format_label_number ──────────────────────────────────────────────────

    #[test]
    fn test_format_label_number() {
        assert_eq!(format_label_number(2024.0), "2024");
        assert_eq!(format_label_number(0.05), "0.05");
    }

    // ── percent helpers ──────────────────────────────────────────────────────

    #[test]
    fn test_percent_label_rounds_to_whole() {
        assert_eq!(percent_label(0.0523), "5%");
        assert_eq!(percent_label(0.0825), "8%");
        assert_eq!(percent_label(0.2), "20%");
    }

    #[test]
    fn test_percent_text_three_decimals() {
        assert_eq!(percent_text(0.0825), "8.25%");
        assert_eq!(percent_text(0.05), "5.0%");
        assert_eq!(percent_text(0.0123456), "1.235%");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(8.250000000000002, 3), 8.25);
        assert_eq!(round_to(1.23456, 2), 1.23);
    }

    // ── percentage ───────────────────────────────────────────────────────────

    #[test]
    fn test_percentage_basic() {
        let p = percentage(50.0, 200.0, 1);
        assert!((p - 25.0).abs() < 1e-9, "percentage = {p}");
    }

    #[test]
    fn test_percentage_zero_whole() {
        assert_eq!(percentage(10.0, 0.0, 2), 0.0);
    }

    #[test]
    fn test_percentage_rounding() {
        let p = percentage(1.0, 3.0, 2);
        assert!((p - 33.33).abs() < 1e-2, "percentage = {p}");
    }

    // ── group_thousands ──────────────────────────────────────────────────────

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("5"), "5");
        assert_eq!(group_thousands("1234"), "1,234");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }
}
