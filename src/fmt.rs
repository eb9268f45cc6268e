/// Format cents as a dollar amount with thousands separators: $1,234.56
pub fn money(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let int_part = (abs / 100).to_string();
    let dec_part = abs % 100;

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part:02}")
    } else {
        format!("${with_commas}.{dec_part:02}")
    }
}

/// Parse a human-entered amount into cents without going through floats.
///
/// Accepts `$`, thousands separators, a leading minus or accounting-style
/// parentheses. Fractions beyond two digits round half away from zero.
pub fn parse_cents(raw: &str) -> Option<i64> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$') && !c.is_whitespace())
        .collect();
    let (negative, body) = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        (true, inner)
    } else if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.strip_prefix('+').unwrap_or(&s))
    };
    if body.is_empty() {
        return None;
    }

    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if whole.is_empty() && frac.is_empty() {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let digits: Vec<i64> = frac.bytes().map(|b| i64::from(b - b'0')).collect();
    let tenths = digits.first().copied().unwrap_or(0);
    let hundredths = digits.get(1).copied().unwrap_or(0);
    let round_up = digits.get(2).is_some_and(|d| *d >= 5);

    let cents = whole
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths + i64::from(round_up))?;
    Some(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(123456), "$1,234.56");
        assert_eq!(money(-50000), "-$500.00");
        assert_eq!(money(0), "$0.00");
        assert_eq!(money(100000099), "$1,000,000.99");
        assert_eq!(money(4210), "$42.10");
        assert_eq!(money(-5), "-$0.05");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("1,234.56"), Some(123456));
        assert_eq!(parse_cents("\"500.00\""), Some(50000));
        assert_eq!(parse_cents("  -42.50  "), Some(-4250));
        assert_eq!(parse_cents("$125"), Some(12500));
        assert_eq!(parse_cents("0.1"), Some(10));
        assert_eq!(parse_cents(".05"), Some(5));
    }

    #[test]
    fn test_parse_cents_parenthesized_negatives() {
        assert_eq!(parse_cents("(1,500.00)"), Some(-150000));
    }

    #[test]
    fn test_parse_cents_rounds_extra_precision() {
        assert_eq!(parse_cents("19.995"), Some(2000));
        assert_eq!(parse_cents("19.994"), Some(1999));
    }

    #[test]
    fn test_parse_cents_rejects_garbage() {
        assert_eq!(parse_cents("not_a_number"), None);
        assert_eq!(parse_cents(""), None);
        assert_eq!(parse_cents("1.2.3"), None);
        assert_eq!(parse_cents("-"), None);
    }
}
