use crate::locale::{CurrencyPosition, Locale};

/// Plain number with optional sign, parentheses, percent, currency symbol,
/// digit grouping and exponent.
pub(crate) fn parse_number(text: &str, locale: &Locale) -> Option<f64> {
    if locale.decimal_separator == locale.group_separator {
        return None;
    }

    let mut rest = text.trim();
    let mut negative = false;
    let mut signed = false;

    if let Some(r) = rest.strip_prefix('-') {
        negative = true;
        signed = true;
        rest = r.trim_start();
    } else if let Some(r) = rest.strip_prefix('+') {
        signed = true;
        rest = r.trim_start();
    }

    if let Some(inner) = rest.strip_prefix('(') {
        // Either a sign or parentheses, never both
        if signed {
            return None;
        }
        rest = inner.strip_suffix(')')?.trim();
        negative = true;
    }

    let mut percent = false;
    if let Some(r) = rest.strip_suffix('%') {
        percent = true;
        rest = r.trim_end();
    } else if let Some(r) = rest.strip_prefix('%') {
        percent = true;
        rest = r.trim_start();
    }

    let symbol = locale.currency_symbol;
    let stripped = match locale.currency_position {
        CurrencyPosition::Prefix => rest.strip_prefix(symbol).map(str::trim_start),
        CurrencyPosition::Suffix => rest.strip_suffix(symbol).map(str::trim_end),
    };
    if let Some(r) = stripped {
        if percent {
            return None;
        }
        rest = r;
    }

    let mut value = parse_decimal(rest, locale)?;
    if percent {
        value /= 100.0;
    }
    Some(if negative { -value } else { value })
}

/// Unsigned decimal number: grouped integer part, fraction part and exponent
fn parse_decimal(text: &str, locale: &Locale) -> Option<f64> {
    let (mantissa, exponent) = split_exponent(text)?;
    let (int_part, frac_part) = mantissa
        .split_once(locale.decimal_separator)
        .unwrap_or((mantissa, ""));

    let int_digits = ungroup(int_part, locale)?;
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if int_digits.is_empty() && frac_part.is_empty() {
        return None;
    }

    let normalized = format!(
        "{}.{}e{}",
        if int_digits.is_empty() { "0" } else { &int_digits },
        if frac_part.is_empty() { "0" } else { frac_part },
        exponent
    );
    normalized.parse().ok()
}

/// Split off an integer exponent, the exponent is "0" when absent
fn split_exponent(text: &str) -> Option<(&str, &str)> {
    let Some(index) = text.find(['e', 'E']) else {
        return Some((text, "0"));
    };

    let (mantissa, exponent) = (&text[..index], &text[index + 1..]);
    let digits = exponent
        .strip_prefix('+')
        .or_else(|| exponent.strip_prefix('-'))
        .unwrap_or(exponent);
    if mantissa.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((mantissa, exponent.trim_start_matches('+')))
}

/// Remove group separators. Groups after the first one have exactly three digits.
fn ungroup(int_part: &str, locale: &Locale) -> Option<String> {
    let mut groups = int_part.split(|c| locale.is_group_separator(c));
    let first = groups.next().unwrap_or_default();
    if !first.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut digits = first.to_string();
    let mut grouped = false;
    for group in groups {
        grouped = true;
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }

    if grouped && !(1..=3).contains(&first.len()) {
        return None;
    }
    Some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        let en = Locale::en_us();
        assert_eq!(parse_number("42", &en), Some(42.0));
        assert_eq!(parse_number(" -3.5 ", &en), Some(-3.5));
        assert_eq!(parse_number(".5", &en), Some(0.5));
        assert_eq!(parse_number("5.", &en), Some(5.0));
        assert_eq!(parse_number("%50", &en), Some(0.5));
        assert_eq!(parse_number("-$2", &en), Some(-2.0));
        assert_eq!(parse_number(".", &en), None);
        assert_eq!(parse_number("1e", &en), None);
        assert_eq!(parse_number("e5", &en), None);
    }

    #[test]
    fn test_grouping() {
        let en = Locale::en_us();
        assert_eq!(parse_number("12,345,678.9", &en), Some(12_345_678.9));
        assert_eq!(parse_number("1234,567", &en), None);
        assert_eq!(parse_number(",123", &en), None);
        assert_eq!(parse_number("1,234.5,6", &en), None);
    }

    #[test]
    fn test_german_separators() {
        let de = Locale::de_de();
        assert_eq!(parse_number("1.234,5", &de), Some(1234.5));
        assert_eq!(parse_number("1,5 €", &de), Some(1.5));
        assert_eq!(parse_number("1,5.0", &de), None);
    }

    #[test]
    fn test_same_decimal_and_group_separator_is_rejected() {
        let odd = Locale {
            group_separator: '.',
            ..Locale::en_us()
        };
        assert_eq!(parse_number("1.5", &odd), None);
    }
}
