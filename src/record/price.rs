//! Fixed-point prices and price-string normalization

use std::fmt;

/// A non-negative amount with exactly two fractional digits
///
/// Stored as whole cents so that no floating point rounding can leak into
/// the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: i64,
}

impl Price {
    pub const ZERO: Price = Price { cents: 0 };

    /// Creates a price from a cent amount, clamping negatives to zero
    pub fn from_cents(cents: i64) -> Self {
        Self {
            cents: cents.max(0),
        }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// Parses a locale-variant price string into a [`Price`]
///
/// # Normalization Steps
///
/// 1. Drop every character that is not a digit, `,`, `.` or `-`
///    (currency symbols, whitespace, letters)
/// 2. If a comma is present and no period, the comma is the decimal
///    separator; otherwise every comma is a thousands separator and is removed
/// 3. Read the longest leading number (`-?digits[.digits]`), ignoring
///    anything after it
/// 4. Round half-up to cents
///
/// This never fails. Input with no leading number degrades to `0.00`,
/// and so does a negative amount.
///
/// # Examples
///
/// ```
/// use shelf_harvest::record::normalize_price;
///
/// assert_eq!(normalize_price("£19.99").to_string(), "19.99");
/// assert_eq!(normalize_price("1,234.50").to_string(), "1234.50");
/// assert_eq!(normalize_price("19,99").to_string(), "19.99");
/// assert_eq!(normalize_price("").to_string(), "0.00");
/// ```
pub fn normalize_price(raw: &str) -> Price {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let numeric = if filtered.contains(',') && !filtered.contains('.') {
        filtered.replace(',', ".")
    } else {
        filtered.replace(',', "")
    };

    Price::from_cents(leading_cents(&numeric))
}

/// Reads the leading `-?digits[.digits]` of `s` as a cent amount
fn leading_cents(s: &str) -> i64 {
    let bytes = s.as_bytes();
    let mut pos = 0;

    let negative = bytes.first() == Some(&b'-');
    if negative {
        pos += 1;
    }

    let mut whole: i64 = 0;
    let mut saw_digit = false;
    while let Some(b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
        whole = whole.saturating_mul(10).saturating_add(i64::from(b - b'0'));
        saw_digit = true;
        pos += 1;
    }

    let mut fraction = [0u8; 3];
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let mut index = 0;
        while let Some(b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
            if index < fraction.len() {
                fraction[index] = b - b'0';
            }
            index += 1;
            saw_digit = true;
            pos += 1;
        }
    }

    if !saw_digit {
        return 0;
    }

    let mut cents = whole
        .saturating_mul(100)
        .saturating_add(i64::from(fraction[0]) * 10 + i64::from(fraction[1]));
    if fraction[2] >= 5 {
        cents = cents.saturating_add(1);
    }

    if negative {
        -cents
    } else {
        cents
    }
}
