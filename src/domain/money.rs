use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point drift.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Balances whose magnitude is below this many cents are considered settled.
pub const TOLERANCE_CENTS: Cents = 1;

/// Returns true if the amount is within the settlement tolerance of zero.
pub fn is_settled(cents: Cents) -> bool {
    cents.unsigned_abs() < TOLERANCE_CENTS.unsigned_abs()
}

/// Format cents as a two-digit decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
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

    if !decimal_str.chars().all(|c| c.is_ascii_digit())
        || (units_str.is_empty() && decimal_str.is_empty())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    // Pad or truncate the fractional part to exactly two digits
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => {
            decimal_str
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        _ => decimal_str
            .get(..2)
            .ok_or(ParseCentsError::InvalidFormat)?
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format")]
    InvalidFormat,
    #[error("amount is too large")]
    Overflow,
}
