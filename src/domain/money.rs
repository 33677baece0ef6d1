use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// Balances and transaction amounts are stored this way; conversion to plain
/// decimal numbers happens only at the serialization boundary.
pub type Cents = i64;

/// Convert cents to major units as a plain number, e.g. 12050 -> 120.5.
///
/// This is the only sanctioned way to hand an amount to callers; the integer
/// representation never crosses the service boundary.
pub fn to_major_units(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Convert major units to cents, rounding to the nearest cent.
/// Example: 120.5 -> 12050, 0.015 -> 2.
pub fn from_major_units(amount: f64) -> Cents {
    (amount * 100.0).round() as Cents
}

/// Format cents as a decimal currency string, e.g. 12050 -> "120.50".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Errors from [parse_cents].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Parse a decimal string into cents.
/// Example: "120.50" -> 12050, "30" -> 3000, "-0.5" -> -50.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (digits, ""),
    };

    if decimal_str.contains('.') {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::InvalidFormat)?
    };

    // Pad or truncate the fractional part to two digits.
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => {
            decimal_str
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        _ => decimal_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units * 100 + decimal_cents;
    Ok(if negative { -cents } else { cents })
}
