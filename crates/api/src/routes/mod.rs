mod evaluation;
mod health;
mod market;

pub use evaluation::evaluation_router;
pub use health::health_router;
pub use market::market_router;

/// `days` query value: default 90, capped at `max`, invalid or non-positive
/// input falls back to the default. Like a lenient integer parse, the
/// leading integer is taken and any trailing text ignored (`"12abc"` is 12).
pub(crate) fn parse_days(raw: Option<&str>, max: u32) -> u32 {
    const DEFAULT_DAYS: u32 = 90;
    raw.and_then(leading_int)
        .filter(|d| *d > 0)
        .map(|d| d.min(i64::from(max)) as u32)
        .unwrap_or(DEFAULT_DAYS)
}

fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    // Overlong inputs saturate.
    let value = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::parse_days;

    #[test]
    fn days_parameter() {
        assert_eq!(parse_days(None, 365), 90);
        assert_eq!(parse_days(Some("30"), 365), 30);
        assert_eq!(parse_days(Some("1000"), 365), 365);
        assert_eq!(parse_days(Some("0"), 365), 90);
        assert_eq!(parse_days(Some("-5"), 365), 90);
        assert_eq!(parse_days(Some("abc"), 365), 90);
        assert_eq!(parse_days(Some(""), 365), 90);
    }

    #[test]
    fn days_parameter_takes_leading_integer() {
        assert_eq!(parse_days(Some("12abc"), 365), 12);
        assert_eq!(parse_days(Some(" 45 days"), 365), 45);
        assert_eq!(parse_days(Some("7.9"), 365), 7);
        assert_eq!(parse_days(Some("+30"), 365), 30);
        assert_eq!(parse_days(Some("-12abc"), 365), 90);
        assert_eq!(parse_days(Some("99999999999999999999999"), 365), 365);
    }
}
