//! Currency code normalization against the closed set the rest of the
//! pipeline (templates, validation, proposals) is seeded with.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Currency {
	Usd,
	Eur,
	Gbp,
	Cad,
	Aud,
	Jpy,
	Chf,
	Zar,
	Ngn,
	Ghs,
	Kes,
}

impl Currency {
	pub fn code(self) -> &'static str {
		match self {
			Currency::Usd => "USD",
			Currency::Eur => "EUR",
			Currency::Gbp => "GBP",
			Currency::Cad => "CAD",
			Currency::Aud => "AUD",
			Currency::Jpy => "JPY",
			Currency::Chf => "CHF",
			Currency::Zar => "ZAR",
			Currency::Ngn => "NGN",
			Currency::Ghs => "GHS",
			Currency::Kes => "KES",
		}
	}

	fn from_code(code: &str) -> Option<Self> {
		Some(match code {
			"USD" => Currency::Usd,
			"EUR" => Currency::Eur,
			"GBP" => Currency::Gbp,
			"CAD" => Currency::Cad,
			"AUD" => Currency::Aud,
			"JPY" => Currency::Jpy,
			"CHF" => Currency::Chf,
			"ZAR" => Currency::Zar,
			"NGN" => Currency::Ngn,
			"GHS" => Currency::Ghs,
			"KES" => Currency::Kes,
			_ => return None,
		})
	}
}

impl fmt::Display for Currency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.code())
	}
}

const ALIASES: &[(&str, Currency)] = &[
	("DOLLAR", Currency::Usd),
	("DOLLARS", Currency::Usd),
	("US DOLLAR", Currency::Usd),
	("EURO", Currency::Eur),
	("EUROS", Currency::Eur),
	("POUND", Currency::Gbp),
	("POUNDS", Currency::Gbp),
	("STERLING", Currency::Gbp),
	("CANADIAN DOLLAR", Currency::Cad),
	("AUSTRALIAN DOLLAR", Currency::Aud),
	("YEN", Currency::Jpy),
	("SWISS FRANC", Currency::Chf),
	("RAND", Currency::Zar),
	("NAIRA", Currency::Ngn),
	("CEDI", Currency::Ghs),
	("SHILLING", Currency::Kes),
];

/// Normalize a free-form currency token to a closed-set `Currency`.
///
/// Tries an exact ISO-code match first, then a curated alias table, then
/// containment against the alias table as a last resort.
pub fn normalize_currency(value: &str) -> Option<Currency> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return None;
	}
	let upper: String = trimmed
		.chars()
		.filter(|c| !c.is_whitespace() || *c == ' ')
		.collect::<String>()
		.to_uppercase();
	let upper = upper.trim();

	if let Some(c) = Currency::from_code(upper) {
		return Some(c);
	}

	for (alias, currency) in ALIASES {
		if upper == *alias {
			return Some(*currency);
		}
	}

	for (alias, currency) in ALIASES {
		if upper.contains(alias) {
			return Some(*currency);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exact_code_matches() {
		assert_eq!(normalize_currency("usd"), Some(Currency::Usd));
		assert_eq!(normalize_currency("EUR"), Some(Currency::Eur));
	}

	#[test]
	fn alias_matches() {
		assert_eq!(normalize_currency("Euro"), Some(Currency::Eur));
		assert_eq!(normalize_currency("Rand"), Some(Currency::Zar));
	}

	#[test]
	fn unknown_is_none() {
		assert_eq!(normalize_currency("bitcoin"), None);
		assert_eq!(normalize_currency(""), None);
	}

	#[test]
	fn round_trips_every_variant() {
		for c in [
			Currency::Usd,
			Currency::Eur,
			Currency::Gbp,
			Currency::Cad,
			Currency::Aud,
			Currency::Jpy,
			Currency::Chf,
			Currency::Zar,
			Currency::Ngn,
			Currency::Ghs,
			Currency::Kes,
		] {
			assert_eq!(normalize_currency(c.code()), Some(c));
		}
	}
}
