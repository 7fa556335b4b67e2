//! Rule-based validation of canonical rows. A row with any failing rule is
//! excluded from the valid set entirely; every failure on that row is still
//! reported.

use serde::{Deserialize, Serialize};

use crate::models::CanonicalRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
	#[serde(default)]
	pub required_fields: Vec<String>,
	#[serde(default)]
	pub date_rules: Vec<DateRule>,
	#[serde(default)]
	pub numeric_rules: Vec<NumericRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRule {
	pub name: String,
	pub inception_field: String,
	pub expiry_field: String,
	#[serde(default)]
	pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericRule {
	pub name: String,
	pub field: String,
	#[serde(default)]
	pub min_value: Option<f64>,
	#[serde(default)]
	pub max_value: Option<f64>,
	#[serde(default)]
	pub message: Option<String>,
}

impl Default for RuleDocument {
	fn default() -> Self {
		Self {
			required_fields: vec!["policy_number".to_string()],
			date_rules: vec![DateRule {
				name: "inception_before_expiry".to_string(),
				inception_field: "inception_date".to_string(),
				expiry_field: "expiry_date".to_string(),
				message: None,
			}],
			numeric_rules: vec![
				numeric_rule("premium_non_negative", "premium_amount"),
				numeric_rule("claim_non_negative", "claim_amount"),
				numeric_rule("commission_non_negative", "commission_amount"),
				numeric_rule("net_premium_non_negative", "net_premium"),
			],
		}
	}
}

fn numeric_rule(name: &str, field: &str) -> NumericRule {
	NumericRule {
		name: name.to_string(),
		field: field.to_string(),
		min_value: Some(0.0),
		max_value: None,
		message: None,
	}
}

#[derive(Debug, Clone)]
pub struct RowError {
	pub row_index: i64,
	pub error_code: String,
	pub error_message: String,
	pub field_name: Option<String>,
	pub field_value: Option<String>,
	pub rule_name: String,
}

fn field_str(row: &CanonicalRow, field: &str) -> Option<String> {
	match field {
		"policy_number" => row.policy_number.clone(),
		"insured_name" => row.insured_name.clone(),
		"inception_date" => row.inception_date.map(|d| d.to_string()),
		"expiry_date" => row.expiry_date.map(|d| d.to_string()),
		"premium_amount" => row.premium_amount.map(|d| d.to_string()),
		"currency" => row.currency.map(|c| c.to_string()),
		"claim_amount" => row.claim_amount.map(|d| d.to_string()),
		"commission_amount" => row.commission_amount.map(|d| d.to_string()),
		"net_premium" => row.net_premium.map(|d| d.to_string()),
		"broker_name" => row.broker_name.clone(),
		"product_type" => row.product_type.clone(),
		"coverage_type" => row.coverage_type.clone(),
		"risk_location" => row.risk_location.clone(),
		_ => None,
	}
}

fn field_f64(row: &CanonicalRow, field: &str) -> Option<f64> {
	use rust_decimal::prelude::ToPrimitive;
	match field {
		"premium_amount" => row.premium_amount,
		"claim_amount" => row.claim_amount,
		"commission_amount" => row.commission_amount,
		"net_premium" => row.net_premium,
		_ => None,
	}
	.and_then(|d| d.to_f64())
}

/// Validate every row against `rules`, returning the rows that passed all
/// checks and the full list of per-row error records (possibly several per
/// rejected row).
pub fn validate_rows(rows: &[CanonicalRow], rules: &RuleDocument) -> (Vec<CanonicalRow>, Vec<RowError>) {
	let mut valid = Vec::new();
	let mut errors = Vec::new();

	for (idx, row) in rows.iter().enumerate() {
		let row_index = idx as i64;
		let mut row_errors = Vec::new();

		for field in &rules.required_fields {
			if field_str(row, field).is_none() {
				row_errors.push(RowError {
					row_index,
					error_code: "REQUIRED_FIELD_MISSING".to_string(),
					error_message: format!("required field '{}' is missing", field),
					field_name: Some(field.clone()),
					field_value: None,
					rule_name: "required_field".to_string(),
				});
			}
		}

		for rule in &rules.date_rules {
			let inception = field_str(row, &rule.inception_field).and_then(|s| s.parse::<chrono::NaiveDate>().ok());
			let expiry = field_str(row, &rule.expiry_field).and_then(|s| s.parse::<chrono::NaiveDate>().ok());
			if let (Some(inception), Some(expiry)) = (inception, expiry) {
				if inception > expiry {
					row_errors.push(RowError {
						row_index,
						error_code: "DATE_VALIDATION_FAILED".to_string(),
						error_message: rule
							.message
							.clone()
							.unwrap_or_else(|| format!("{} must be on or before {}", rule.inception_field, rule.expiry_field)),
						field_name: Some(format!("{},{}", rule.inception_field, rule.expiry_field)),
						field_value: Some(format!("{},{}", inception, expiry)),
						rule_name: rule.name.clone(),
					});
				}
			}
		}

		for rule in &rules.numeric_rules {
			let raw = field_str(row, &rule.field);
			if raw.is_none() {
				continue;
			}
			match field_f64(row, &rule.field) {
				None => row_errors.push(RowError {
					row_index,
					error_code: "INVALID_NUMERIC_VALUE".to_string(),
					error_message: format!("'{}' is not a valid number", rule.field),
					field_name: Some(rule.field.clone()),
					field_value: raw,
					rule_name: rule.name.clone(),
				}),
				Some(value) => {
					let below_min = rule.min_value.is_some_and(|min| value < min);
					let above_max = rule.max_value.is_some_and(|max| value > max);
					if below_min || above_max {
						row_errors.push(RowError {
							row_index,
							error_code: "NUMERIC_VALIDATION_FAILED".to_string(),
							error_message: rule
								.message
								.clone()
								.unwrap_or_else(|| format!("'{}' is out of the allowed range", rule.field)),
							field_name: Some(rule.field.clone()),
							field_value: Some(value.to_string()),
							rule_name: rule.name.clone(),
						});
					}
				}
			}
		}

		if row_errors.is_empty() {
			valid.push(row.clone());
		} else {
			errors.extend(row_errors);
		}
	}

	(valid, errors)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;
	use std::str::FromStr;

	fn row_with_premium(value: &str) -> CanonicalRow {
		CanonicalRow {
			policy_number: Some("POL1".to_string()),
			premium_amount: Some(Decimal::from_str(value).unwrap()),
			..Default::default()
		}
	}

	#[test]
	fn missing_required_field_rejects_row() {
		let rules = RuleDocument::default();
		let row = CanonicalRow::default();
		let (valid, errors) = validate_rows(&[row], &rules);
		assert!(valid.is_empty());
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].error_code, "REQUIRED_FIELD_MISSING");
	}

	#[test]
	fn negative_premium_rejects_row() {
		let rules = RuleDocument::default();
		let row = row_with_premium("-5");
		let (valid, errors) = validate_rows(&[row], &rules);
		assert!(valid.is_empty());
		assert_eq!(errors[0].error_code, "NUMERIC_VALIDATION_FAILED");
		assert_eq!(errors[0].rule_name, "premium_non_negative");
	}

	#[test]
	fn valid_row_passes() {
		let rules = RuleDocument::default();
		let row = row_with_premium("100");
		let (valid, errors) = validate_rows(&[row], &rules);
		assert_eq!(valid.len(), 1);
		assert!(errors.is_empty());
	}

	#[test]
	fn inception_after_expiry_fails_date_rule() {
		let rules = RuleDocument::default();
		let mut row = row_with_premium("100");
		row.inception_date = chrono::NaiveDate::from_ymd_opt(2024, 6, 1);
		row.expiry_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1);
		let (valid, errors) = validate_rows(&[row], &rules);
		assert!(valid.is_empty());
		let error = errors.iter().find(|e| e.error_code == "DATE_VALIDATION_FAILED").unwrap();
		assert_eq!(error.field_name.as_deref(), Some("inception_date,expiry_date"));
		assert_eq!(error.field_value.as_deref(), Some("2024-06-01,2024-01-01"));
	}
}
