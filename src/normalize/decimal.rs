//! Decimal parsing for monetary fields: strips currency symbols/codes and
//! resolves whichever of `,`/`.` is acting as the decimal separator.

use rust_decimal::Decimal;
use std::str::FromStr;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];
const CURRENCY_CODES: &[&str] = &[
	"USD", "EUR", "GBP", "CAD", "AUD", "JPY", "CHF", "ZAR", "NGN", "GHS", "KES",
];

/// Parse a currency-bearing, locale-ambiguous numeric string into a `Decimal`.
///
/// Returns `None` when the value is blank or cannot be interpreted as a number.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
	let mut s = value.trim().to_string();
	if s.is_empty() || s.eq_ignore_ascii_case("nan") {
		return None;
	}

	s.retain(|c| !CURRENCY_SYMBOLS.contains(&c));
	let upper = s.to_uppercase();
	for code in CURRENCY_CODES {
		if let Some(idx) = upper.find(code) {
			s.replace_range(idx..idx + code.len(), "");
		}
	}
	let s = s.trim();

	let negative = s.starts_with('-') || (s.starts_with('(') && s.ends_with(')'));
	let s = s.trim_start_matches('-').trim_start_matches('(').trim_end_matches(')');
	let s = s.trim().replace(' ', "");

	if s.is_empty() || s == "." || s == "," {
		return None;
	}

	let last_comma = s.rfind(',');
	let last_dot = s.rfind('.');

	let normalized = match (last_comma, last_dot) {
		(Some(c), Some(d)) if c > d => {
			// European style: '.' is a thousands separator, ',' is the decimal point.
			s.replace('.', "").replacen(',', ".", 1)
		}
		(Some(c), Some(d)) if d > c => {
			// US style: ',' is a thousands separator, '.' is the decimal point.
			s.replace(',', "")
		}
		(Some(_), None) => {
			// Only commas present: always a thousands separator.
			s.replace(',', "")
		}
		_ => s.to_string(),
	};

	let parsed = Decimal::from_str(&normalized).ok()?;
	Some(if negative { -parsed } else { parsed })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn d(s: &str) -> Decimal {
		Decimal::from_str(s).unwrap()
	}

	#[test]
	fn parses_plain_number() {
		assert_eq!(parse_decimal("1234.56"), Some(d("1234.56")));
	}

	#[test]
	fn strips_currency_symbol_and_code() {
		assert_eq!(parse_decimal("$1,234.56"), Some(d("1234.56")));
		assert_eq!(parse_decimal("USD 1234.56"), Some(d("1234.56")));
	}

	#[test]
	fn resolves_european_separators() {
		assert_eq!(parse_decimal("1.234,56"), Some(d("1234.56")));
	}

	#[test]
	fn resolves_us_separators() {
		assert_eq!(parse_decimal("1,234.56"), Some(d("1234.56")));
	}

	#[test]
	fn handles_negative_and_parenthesized() {
		assert_eq!(parse_decimal("-500"), Some(d("-500")));
		assert_eq!(parse_decimal("(500)"), Some(d("-500")));
	}

	#[test]
	fn rejects_lone_punctuation() {
		assert_eq!(parse_decimal("."), None);
		assert_eq!(parse_decimal("-"), None);
		assert_eq!(parse_decimal(""), None);
	}

	#[test]
	fn lone_comma_is_always_a_thousands_separator() {
		assert_eq!(parse_decimal("100,50"), Some(d("10050")));
	}

	#[test]
	fn idempotent_on_plain_decimal_string() {
		let a = parse_decimal("42.10").unwrap();
		let b = parse_decimal(&a.to_string()).unwrap();
		assert_eq!(a, b);
	}
}
