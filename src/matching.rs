//! Selects the best active template for a parsed file's headers.

use std::collections::HashSet;

use tracing::warn;

use crate::models::Template;
use crate::normalize::normalize_column_name;

/// Match headers against a list of active templates (already filtered by
/// file type by the caller). Exact matches win over lenient ones; ties
/// within a tier resolve to the first in the supplied order, which callers
/// should provide sorted by ascending `created_at`.
pub fn find_matching_template<'a>(headers: &[String], templates: &'a [Template]) -> Option<&'a Template> {
	let header_set: HashSet<String> = headers.iter().cloned().collect();

	let mut lenient: Option<&Template> = None;

	for template in templates {
		let template_cols: HashSet<String> = template
			.column_mappings
			.keys()
			.map(|k| normalize_column_name(k))
			.collect();
		if template_cols.is_empty() {
			continue;
		}

		let matches = template_cols.intersection(&header_set).count();

		if matches == template_cols.len() && header_set.len() == template_cols.len() {
			return Some(template);
		}

		if lenient.is_none() {
			let match_ratio = matches as f64 / template_cols.len() as f64;
			let extra = header_set.len() as i64 - template_cols.len() as i64;
			let extra_ratio = extra as f64 / template_cols.len() as f64;
			if match_ratio >= 0.99 && extra_ratio <= 0.10 {
				if header_set.len() < template_cols.len() {
					warn!(
						template_id = %template.template_id,
						file_headers = header_set.len(),
						template_headers = template_cols.len(),
						"lenient template match selected with fewer file columns than the template expects"
					);
				}
				lenient = Some(template);
			}
		}
	}

	lenient
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use std::collections::HashMap;

	fn template(id: &str, mappings: &[(&str, &str)], created_at_offset_secs: i64) -> Template {
		Template {
			id: 0,
			template_id: id.to_string(),
			name: id.to_string(),
			carrier: None,
			file_type: "claims".to_string(),
			column_mappings: mappings.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>(),
			version: "1".to_string(),
			active_flag: true,
			pattern: None,
			json_file_path: None,
			created_at: Utc::now() + chrono::Duration::seconds(created_at_offset_secs),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn exact_match_requires_identical_header_sets() {
		let t = template("t1", &[("Policy Number", "policy_number"), ("Premium", "premium_amount")], 0);
		let headers = vec!["policy_number".to_string(), "premium_amount".to_string()];
		let templates = [t.clone()];
		let found = find_matching_template(&headers, &templates);
		assert_eq!(found.unwrap().template_id, "t1");
	}

	#[test]
	fn lenient_match_allows_small_excess_columns() {
		let t = template(
			"t1",
			&(1..=100)
				.map(|i| (format!("col{}", i), format!("field{}", i)))
				.collect::<Vec<_>>()
				.iter()
				.map(|(a, b)| (a.as_str(), b.as_str()))
				.collect::<Vec<_>>(),
			0,
		);
		let mut headers: Vec<String> = (1..=100).map(|i| format!("col{}", i)).collect();
		headers.push("extra_column".to_string());
		let templates = [t];
		let found = find_matching_template(&headers, &templates);
		assert!(found.is_some());
	}

	#[test]
	fn no_match_returns_none() {
		let t = template("t1", &[("Policy Number", "policy_number")], 0);
		let headers = vec!["totally_different".to_string()];
		assert!(find_matching_template(&headers, &[t]).is_none());
	}
}
