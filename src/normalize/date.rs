//! Date parsing over the heterogeneous formats found in bordereaux exports.

use chrono::NaiveDate;

const FORMATS: &[&str] = &[
	"%Y-%m-%d",
	"%d/%m/%Y",
	"%m/%d/%Y",
	"%d-%m-%Y",
	"%Y/%m/%d",
	"%d.%m.%Y",
	"%Y.%m.%d",
	"%d %B %Y",
	"%d %b %Y",
	"%B %d, %Y",
	"%b %d, %Y",
	"%Y%m%d",
	"%d/%m/%y",
	"%m/%d/%y",
];

/// Parse a date-like string against the known formats, in priority order.
///
/// Returns `None` for blank input or input that matches none of the formats.
/// Ambiguous numeric forms (e.g. `01/02/2024`) resolve day-before-month,
/// since `%d/%m/%Y` is tried before `%m/%d/%Y`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
	let trimmed = value.trim();
	if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.eq_ignore_ascii_case("nat") {
		return None;
	}

	for format in FORMATS {
		if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
			return Some(date);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_iso() {
		assert_eq!(parse_date("2024-03-15"), NaiveDate::from_ymd_opt(2024, 3, 15));
	}

	#[test]
	fn day_before_month_on_ambiguous_slash_date() {
		// 01/02/2024 matches %d/%m/%Y before %m/%d/%Y, so this is Feb 1st.
		assert_eq!(parse_date("01/02/2024"), NaiveDate::from_ymd_opt(2024, 2, 1));
	}

	#[test]
	fn parses_textual_month() {
		assert_eq!(
			parse_date("15 March 2024"),
			NaiveDate::from_ymd_opt(2024, 3, 15)
		);
		assert_eq!(
			parse_date("March 15, 2024"),
			NaiveDate::from_ymd_opt(2024, 3, 15)
		);
	}

	#[test]
	fn blank_and_garbage_are_none() {
		assert_eq!(parse_date(""), None);
		assert_eq!(parse_date("   "), None);
		assert_eq!(parse_date("not a date"), None);
		assert_eq!(parse_date("NaN"), None);
	}

	#[test]
	fn round_trips_every_format_family() {
		let d = NaiveDate::from_ymd_opt(2023, 11, 2).unwrap();
		assert_eq!(parse_date(&d.format("%Y-%m-%d").to_string()), Some(d));
		assert_eq!(parse_date(&d.format("%Y%m%d").to_string()), Some(d));
	}
}
