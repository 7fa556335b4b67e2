//! Domain types shared across the storage, pipeline, and API layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a `BordereauxFile`. Transitions are enforced by the
/// pipeline orchestrator, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
	Pending,
	Received,
	Processing,
	ProcessedOk,
	ProcessedWithErrors,
	NewTemplateRequired,
	Failed,
}

impl FileStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			FileStatus::Pending => "pending",
			FileStatus::Received => "received",
			FileStatus::Processing => "processing",
			FileStatus::ProcessedOk => "processed_ok",
			FileStatus::ProcessedWithErrors => "processed_with_errors",
			FileStatus::NewTemplateRequired => "new_template_required",
			FileStatus::Failed => "failed",
		}
	}

	pub fn from_str(s: &str) -> Option<Self> {
		Some(match s {
			"pending" => FileStatus::Pending,
			"received" => FileStatus::Received,
			"processing" => FileStatus::Processing,
			"processed_ok" => FileStatus::ProcessedOk,
			"processed_with_errors" => FileStatus::ProcessedWithErrors,
			"new_template_required" => FileStatus::NewTemplateRequired,
			"failed" => FileStatus::Failed,
			_ => return None,
		})
	}

	/// Terminal states from which a reprocess is still permitted.
	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			FileStatus::ProcessedOk
				| FileStatus::ProcessedWithErrors
				| FileStatus::NewTemplateRequired
				| FileStatus::Failed
		)
	}
}

#[derive(Debug, Clone)]
pub struct BordereauxFile {
	pub id: i64,
	pub filename: String,
	pub file_path: String,
	pub file_size: i64,
	pub mime_type: Option<String>,
	pub content_hash: String,
	pub status: FileStatus,
	pub error_message: Option<String>,
	pub total_rows: i64,
	pub processed_rows: i64,
	pub sender: Option<String>,
	pub subject: Option<String>,
	pub received_at: Option<DateTime<Utc>>,
	pub proposal_path: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub processed_at: Option<DateTime<Utc>>,
}

/// The thirteen canonical fields every row mapper target and validator rule
/// draws from. Kept as a plain list rather than an enum so template
/// `column_mappings` (free-form JSON) can validate against it without a
/// bespoke deserializer.
pub const CANONICAL_FIELDS: &[&str] = &[
	"policy_number",
	"insured_name",
	"inception_date",
	"expiry_date",
	"premium_amount",
	"currency",
	"claim_amount",
	"commission_amount",
	"net_premium",
	"broker_name",
	"product_type",
	"coverage_type",
	"risk_location",
];

#[derive(Debug, Clone, Default)]
pub struct CanonicalRow {
	pub policy_number: Option<String>,
	pub insured_name: Option<String>,
	pub inception_date: Option<chrono::NaiveDate>,
	pub expiry_date: Option<chrono::NaiveDate>,
	pub premium_amount: Option<rust_decimal::Decimal>,
	pub currency: Option<crate::normalize::Currency>,
	pub claim_amount: Option<rust_decimal::Decimal>,
	pub commission_amount: Option<rust_decimal::Decimal>,
	pub net_premium: Option<rust_decimal::Decimal>,
	pub broker_name: Option<String>,
	pub product_type: Option<String>,
	pub coverage_type: Option<String>,
	pub risk_location: Option<String>,
	pub row_number: i64,
	pub raw_data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct BordereauxRow {
	pub id: i64,
	pub file_id: i64,
	pub policy_number: Option<String>,
	pub insured_name: Option<String>,
	pub inception_date: Option<chrono::NaiveDate>,
	pub expiry_date: Option<chrono::NaiveDate>,
	pub premium_amount: Option<rust_decimal::Decimal>,
	pub currency: Option<crate::normalize::Currency>,
	pub claim_amount: Option<rust_decimal::Decimal>,
	pub commission_amount: Option<rust_decimal::Decimal>,
	pub net_premium: Option<rust_decimal::Decimal>,
	pub broker_name: Option<String>,
	pub product_type: Option<String>,
	pub coverage_type: Option<String>,
	pub risk_location: Option<String>,
	pub row_number: i64,
	pub raw_data: serde_json::Value,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ValidationErrorRecord {
	pub id: i64,
	pub file_id: i64,
	pub row_index: i64,
	pub error_code: String,
	pub error_message: String,
	pub field_name: Option<String>,
	pub field_value: Option<String>,
	pub rule_name: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BordereauxFileType {
	Claims,
	Premium,
	Exposure,
}

impl BordereauxFileType {
	pub fn as_str(&self) -> &'static str {
		match self {
			BordereauxFileType::Claims => "claims",
			BordereauxFileType::Premium => "premium",
			BordereauxFileType::Exposure => "exposure",
		}
	}

	pub fn from_str(s: &str) -> Option<Self> {
		Some(match s {
			"claims" => BordereauxFileType::Claims,
			"premium" => BordereauxFileType::Premium,
			"exposure" => BordereauxFileType::Exposure,
			_ => return None,
		})
	}

	/// Infer a file type from an email subject, checking keywords in this
	/// fixed order: claims before premium before exposure.
	pub fn infer_from_subject(subject: &str) -> Option<Self> {
		let lower = subject.to_lowercase();
		if lower.contains("claim") {
			Some(BordereauxFileType::Claims)
		} else if lower.contains("premium") {
			Some(BordereauxFileType::Premium)
		} else if lower.contains("exposure") {
			Some(BordereauxFileType::Exposure)
		} else {
			None
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
	pub id: i64,
	pub template_id: String,
	pub name: String,
	pub carrier: Option<String>,
	pub file_type: String,
	pub column_mappings: HashMap<String, String>,
	pub version: String,
	pub active_flag: bool,
	pub pattern: Option<serde_json::Value>,
	pub json_file_path: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingProposal {
	pub file_id: i64,
	pub created_at: DateTime<Utc>,
	pub file_headers: Vec<String>,
	pub column_mappings: HashMap<String, String>,
	pub confidence_scores: HashMap<String, f64>,
	pub metadata: ProposalMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalMetadata {
	pub filename: Option<String>,
	pub sender: Option<String>,
	pub subject: Option<String>,
}
