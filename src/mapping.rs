//! Applies a matched template to a parsed table, producing canonical rows.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

use crate::models::{CANONICAL_FIELDS, CanonicalRow, Template};
use crate::normalize::{normalize_column_name, normalize_currency, parse_date, parse_decimal, parse_string};
use crate::parsing::{Cell, ParsedTable};

/// Map every row of `table` to a `CanonicalRow` using `template`'s column
/// mappings. Multiple source columns claiming the same canonical field keep
/// the first non-null value, in template iteration order.
pub fn map_to_canonical(table: &ParsedTable, template: &Template) -> Vec<CanonicalRow> {
	// canonical field -> ordered list of header indices that map to it
	let mut canonical_to_indices: HashMap<&str, Vec<usize>> = HashMap::new();
	for (source_col, canonical_field) in &template.column_mappings {
		if !CANONICAL_FIELDS.contains(&canonical_field.as_str()) {
			continue;
		}
		if let Some(idx) = find_matching_header(&table.headers, source_col) {
			canonical_to_indices.entry(canonical_field.as_str()).or_default().push(idx);
		}
	}

	table
		.rows
		.iter()
		.enumerate()
		.map(|(row_idx, row)| build_row(row, &table.headers, &canonical_to_indices, row_idx as i64 + 1))
		.collect()
}

fn first_value<'a>(row: &'a [Cell], indices: &[usize]) -> Option<&'a Cell> {
	indices.iter().filter_map(|&idx| row.get(idx)).find(|cell| !matches!(cell, Cell::Null))
}

fn build_row(
	row: &[Cell],
	headers: &[String],
	canonical_to_indices: &HashMap<&str, Vec<usize>>,
	row_number: i64,
) -> CanonicalRow {
	let cell_of = |field: &str| -> Option<&Cell> {
		canonical_to_indices.get(field).and_then(|idxs| first_value(row, idxs))
	};

	let text_of = |field: &str| -> Option<String> {
		cell_of(field).and_then(|cell| cell.as_text()).and_then(|s| parse_string(&s))
	};

	// A cell that already carries a typed date/number is consumed directly;
	// only a text cell goes through the string parser.
	let date_of = |field: &str| -> Option<NaiveDate> {
		match cell_of(field)? {
			Cell::DateTime(dt) => Some(dt.date()),
			Cell::Text(s) => parse_string(s).as_deref().and_then(parse_date),
			_ => None,
		}
	};

	let decimal_of = |field: &str| -> Option<Decimal> {
		match cell_of(field)? {
			Cell::Int(i) => Some(Decimal::from(*i)),
			Cell::Float(f) => Decimal::from_str(&f.to_string()).ok(),
			Cell::Text(s) => parse_string(s).as_deref().and_then(parse_decimal),
			_ => None,
		}
	};

	let mut raw_data = serde_json::Map::new();
	for (idx, header) in headers.iter().enumerate() {
		if let Some(cell) = row.get(idx) {
			raw_data.insert(header.clone(), cell.to_json());
		}
	}

	CanonicalRow {
		policy_number: text_of("policy_number"),
		insured_name: text_of("insured_name"),
		inception_date: date_of("inception_date"),
		expiry_date: date_of("expiry_date"),
		premium_amount: decimal_of("premium_amount"),
		currency: text_of("currency").and_then(|s| normalize_currency(&s)),
		claim_amount: decimal_of("claim_amount"),
		commission_amount: decimal_of("commission_amount"),
		net_premium: decimal_of("net_premium"),
		broker_name: text_of("broker_name"),
		product_type: text_of("product_type"),
		coverage_type: text_of("coverage_type"),
		risk_location: text_of("risk_location"),
		row_number,
		raw_data: json!(raw_data),
	}
}

/// Find the header matching `source_col`: exact normalized match, then
/// case-insensitive, then containment in either direction.
fn find_matching_header(headers: &[String], source_col: &str) -> Option<usize> {
	let normalized = normalize_column_name(source_col);

	if let Some(idx) = headers.iter().position(|h| *h == normalized) {
		return Some(idx);
	}
	if let Some(idx) = headers.iter().position(|h| h.eq_ignore_ascii_case(&normalized)) {
		return Some(idx);
	}
	if let Some(idx) = headers.iter().position(|h| h.contains(&normalized) || normalized.contains(h.as_str())) {
		return Some(idx);
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;

	fn table() -> ParsedTable {
		ParsedTable {
			headers: vec!["policy_number".to_string(), "premium".to_string(), "currency".to_string()],
			rows: vec![vec![
				Cell::Text("POL1".to_string()),
				Cell::Text("1,234.56".to_string()),
				Cell::Text("USD".to_string()),
			]],
		}
	}

	fn template() -> Template {
		Template {
			id: 1,
			template_id: "t1".to_string(),
			name: "t1".to_string(),
			carrier: None,
			file_type: "premium".to_string(),
			column_mappings: [
				("Policy Number".to_string(), "policy_number".to_string()),
				("Premium".to_string(), "premium_amount".to_string()),
				("Currency".to_string(), "currency".to_string()),
			]
			.into_iter()
			.collect(),
			version: "1".to_string(),
			active_flag: true,
			pattern: None,
			json_file_path: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn maps_row_through_normalization() {
		let rows = map_to_canonical(&table(), &template());
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].policy_number.as_deref(), Some("POL1"));
		assert!(rows[0].premium_amount.is_some());
		assert_eq!(rows[0].currency, Some(crate::normalize::Currency::Usd));
		assert_eq!(rows[0].row_number, 1);
	}

	#[test]
	fn datetime_cell_maps_to_date_without_string_round_trip() {
		let table = ParsedTable {
			headers: vec!["inception".to_string()],
			rows: vec![vec![Cell::DateTime(
				chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(0, 0, 0).unwrap(),
			)]],
		};
		let mut template = template();
		template.column_mappings =
			[("inception".to_string(), "inception_date".to_string())].into_iter().collect();

		let rows = map_to_canonical(&table, &template);
		assert_eq!(rows[0].inception_date, chrono::NaiveDate::from_ymd_opt(2024, 3, 15));
	}

	#[test]
	fn numeric_cell_maps_to_decimal_directly() {
		let table = ParsedTable {
			headers: vec!["premium".to_string()],
			rows: vec![vec![Cell::Float(1234.5)]],
		};
		let mut template = template();
		template.column_mappings =
			[("premium".to_string(), "premium_amount".to_string())].into_iter().collect();

		let rows = map_to_canonical(&table, &template);
		assert_eq!(rows[0].premium_amount, Some(Decimal::from_str("1234.5").unwrap()));
	}
}
