use bordereaux::normalize::normalize_column_name;
use proptest::prelude::*;

proptest! {
	#[test]
	fn normalize_column_name_idempotent(s in ".*") {
		let once = normalize_column_name(&s);
		let twice = normalize_column_name(&once);
		prop_assert_eq!(once, twice);
	}

	#[test]
	fn normalize_column_name_no_uppercase(s in ".*") {
		let out = normalize_column_name(&s);
		prop_assert!(!out.chars().any(|c| c.is_ascii_uppercase()));
	}

	#[test]
	fn normalize_column_name_no_leading_trailing_underscore(s in ".*") {
		let out = normalize_column_name(&s);
		prop_assert!(!out.starts_with('_'));
		prop_assert!(!out.ends_with('_'));
	}

	#[test]
	fn normalize_column_name_no_double_underscore(s in ".*") {
		let out = normalize_column_name(&s);
		prop_assert!(!out.contains("__"));
	}
}
