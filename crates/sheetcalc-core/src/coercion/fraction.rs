/// Largest numerator or denominator of a fraction
const MAX_FRACTION_PART: u32 = 32_767;

/// Fraction `W N/D` with an optional whole part separated by exactly one space
pub(crate) fn parse_fraction(text: &str) -> Option<f64> {
    let mut rest = text.trim_matches(' ');
    let mut negative = false;
    if let Some(r) = rest.strip_prefix('-') {
        negative = true;
        rest = r.trim_start_matches(' ');
    } else if let Some(r) = rest.strip_prefix('+') {
        rest = r.trim_start_matches(' ');
    }

    let (whole, fraction) = match rest.split_once(' ') {
        Some((whole, fraction)) => (Some(whole), fraction),
        None => (None, rest),
    };

    let whole = match whole {
        Some(digits) if is_digits(digits) => digits.parse::<f64>().ok()?,
        Some(_) => return None,
        None => 0.0,
    };

    let (numerator, denominator) = fraction.split_once('/')?;
    let numerator = fraction_part(numerator)?;
    let denominator = fraction_part(denominator)?;
    if denominator == 0 {
        return None;
    }

    let value = whole + f64::from(numerator) / f64::from(denominator);
    Some(if negative { -value } else { value })
}

fn fraction_part(digits: &str) -> Option<u32> {
    if !(1..=5).contains(&digits.len()) || !is_digits(digits) {
        return None;
    }
    digits
        .parse()
        .ok()
        .filter(|value| *value <= MAX_FRACTION_PART)
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_without_whole_part() {
        assert_eq!(parse_fraction("3/4"), Some(0.75));
        assert_eq!(parse_fraction("-3/4"), Some(-0.75));
    }

    #[test]
    fn test_fraction_limits() {
        assert_eq!(parse_fraction("2 1/32767").map(f64::floor), Some(2.0));
        assert_eq!(parse_fraction("2 1/32768"), None);
        assert_eq!(parse_fraction("2 1/"), None);
        assert_eq!(parse_fraction("2 1"), None);
    }
}
