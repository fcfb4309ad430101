/// Formats a value the way axis tick labels render it.
///
/// Magnitudes of at least one thousand are abbreviated with `K`, `M` or `B`
/// and one decimal; smaller values print as integers or with one decimal.
#[must_use]
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_owned();
    }

    let magnitude = value.abs();
    if magnitude >= 1e9 {
        return format!("{:.1}B", value / 1e9);
    }
    if magnitude >= 1e6 {
        return format!("{:.1}M", value / 1e6);
    }
    if magnitude >= 1e3 {
        return format!("{:.1}K", value / 1e3);
    }

    let rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 {
        return "0".to_owned();
    }
    if rounded.fract() == 0.0 {
        group_thousands(&format!("{:.0}", rounded))
    } else {
        group_thousands(&format!("{rounded:.1}"))
    }
}

/// Inserts `,` separators into the integer part of an already formatted number.
#[must_use]
pub fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3);
    grouped.push_str(sign);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviates_large_magnitudes() {
        assert_eq!(format_value(1_500.0), "1.5K");
        assert_eq!(format_value(-2_340_000.0), "-2.3M");
        assert_eq!(format_value(7_000_000_000.0), "7.0B");
    }

    #[test]
    fn keeps_at_most_one_decimal() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(3.14159), "3.1");
        assert_eq!(format_value(-0.25), "-0.3");
        assert_eq!(format_value(999.96), "1,000");
    }

    #[test]
    fn groups_integer_digits() {
        assert_eq!(group_thousands("1234567.5"), "1,234,567.5");
        assert_eq!(group_thousands("-12"), "-12");
    }
}
