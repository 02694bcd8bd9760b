//! Lenient numeric parsing and rendering for free-text plan fields.
//!
//! Logged values arrive as whatever the athlete typed: "82,5", "100kg",
//! "8-10", " 7 ". Parsing takes the first numeric token and never fails
//! loudly; callers treat `None` as "no usable number".

/// Extract the first numeric token from a free-text field.
///
/// Decimal commas are accepted ("82,5" parses as 82.5), unit suffixes are
/// ignored ("100kg" parses as 100), and ranges yield their first bound
/// ("8-10" parses as 8). Returns `None` when no digits are present.
pub fn parse_first_number(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', ".");
    let bytes = cleaned.as_bytes();

    let first_digit = bytes.iter().position(|b| b.is_ascii_digit())?;

    // Pull in a leading "." so ".5" reads as 0.5.
    let start = if first_digit > 0 && bytes[first_digit - 1] == b'.' {
        first_digit - 1
    } else {
        first_digit
    };

    let mut end = start;
    let mut seen_dot = false;
    for &b in &bytes[start..] {
        match b {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    cleaned[start..end].parse::<f64>().ok()
}

/// Round to two decimal places, the precision stored in plan documents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render a numeric value back into plan-document text.
///
/// Whole numbers drop the fraction ("105" not "105.00"); others keep up to
/// two decimals with trailing zeros trimmed ("107.5" not "107.50").
pub fn format_number(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{:.0}", value)
    } else {
        let rendered = format!("{:.2}", value);
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// True when a free-text field holds nothing but whitespace.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_first_number("100"), Some(100.0));
        assert_eq!(parse_first_number("107.5"), Some(107.5));
        assert_eq!(parse_first_number(" 7 "), Some(7.0));
    }

    #[test]
    fn test_parse_decimal_comma() {
        assert_eq!(parse_first_number("82,5"), Some(82.5));
        assert_eq!(parse_first_number("2,25 kg"), Some(2.25));
    }

    #[test]
    fn test_parse_unit_suffix() {
        assert_eq!(parse_first_number("100kg"), Some(100.0));
        assert_eq!(parse_first_number("100 kg"), Some(100.0));
    }

    #[test]
    fn test_parse_range_takes_first_bound() {
        assert_eq!(parse_first_number("8-10"), Some(8.0));
        assert_eq!(parse_first_number("8,5-10"), Some(8.5));
    }

    #[test]
    fn test_parse_leading_dot() {
        assert_eq!(parse_first_number(".5"), Some(0.5));
    }

    #[test]
    fn test_parse_embedded_token() {
        assert_eq!(parse_first_number("x3 @ 60"), Some(3.0));
        assert_eq!(parse_first_number("RIR 2"), Some(2.0));
    }

    #[test]
    fn test_parse_no_digits() {
        assert_eq!(parse_first_number(""), None);
        assert_eq!(parse_first_number("   "), None);
        assert_eq!(parse_first_number("bodyweight"), None);
        assert_eq!(parse_first_number("-"), None);
    }

    #[test]
    fn test_parse_stops_at_second_dot() {
        assert_eq!(parse_first_number("3.1.2"), Some(3.1));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(107.5), 107.5);
        assert_eq!(round2(102.4999), 102.5);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(33.333333), 33.33);
    }

    #[test]
    fn test_format_number_trims_zeros() {
        assert_eq!(format_number(105.0), "105");
        assert_eq!(format_number(107.5), "107.5");
        assert_eq!(format_number(2.25), "2.25");
        assert_eq!(format_number(0.5), "0.5");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(!is_blank("8"));
    }
}
