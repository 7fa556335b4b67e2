//! Generates a mapping proposal for files that didn't match any registered
//! template: heuristic fuzzy/keyword scoring by default, optionally
//! augmented by an LLM suggestion that silently falls back on failure.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::llm::{self, OpenRouterClient};
use crate::models::{MappingProposal, ProposalMetadata, CANONICAL_FIELDS};

const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

fn field_keywords(field: &str) -> &'static [&'static str] {
	match field {
		"policy_number" => &["policy", "pol", "policy_no", "policy#", "policy number", "pol_no", "pol#"],
		"insured_name" => &["insured", "client", "customer", "name", "insured_name", "client_name"],
		"inception_date" => &["inception", "start", "start_date", "effective", "effective_date", "incept", "commence"],
		"expiry_date" => &["expiry", "expire", "end", "end_date", "expiration", "exp_date"],
		"premium_amount" => &["premium", "prem", "premium_amount", "premium_amt", "premium_total", "total_premium"],
		"currency" => &["currency", "curr", "ccy", "currency_code", "curr_code"],
		"claim_amount" => &["claim", "claim_amount", "claim_amt", "claim_total", "loss", "loss_amount", "paid"],
		"commission_amount" => &["commission", "comm", "commission_amount", "comm_amt", "brokerage"],
		"net_premium" => &["net", "net_premium", "net_prem", "net_amount"],
		"broker_name" => &["broker", "broker_name", "brokerage", "intermediary", "agent"],
		"product_type" => &["product", "product_type", "product_name", "line", "line_of_business"],
		"coverage_type" => &["coverage", "cover", "coverage_type", "type", "class"],
		"risk_location" => &["location", "loc", "risk_location", "address", "premises", "property"],
		_ => &[],
	}
}

fn normalize_for_match(s: &str) -> String {
	let lowered = s.to_lowercase();
	let filtered: String = lowered.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).collect();
	filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ratcliff/Obershelp-style similarity approximated with a bigram Dice
/// coefficient: cheap to compute and close enough for ranking candidates.
fn fuzzy_score(a: &str, b: &str) -> f64 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}
	if a == b {
		return 1.0;
	}

	let bigrams = |s: &str| -> HashSet<(char, char)> {
		let chars: Vec<char> = s.chars().collect();
		chars.windows(2).map(|w| (w[0], w[1])).collect()
	};

	let ba = bigrams(a);
	let bb = bigrams(b);
	if ba.is_empty() || bb.is_empty() {
		return 0.0;
	}

	let shared = ba.intersection(&bb).count() as f64;
	(2.0 * shared) / (ba.len() + bb.len()) as f64
}

fn keyword_score(column: &str, field: &str) -> f64 {
	let normalized_col = normalize_for_match(column);
	if normalized_col.is_empty() {
		return 0.0;
	}

	let mut best = 0.0f64;
	for keyword in field_keywords(field) {
		let normalized_keyword = normalize_for_match(keyword);
		if normalized_keyword == normalized_col {
			return 1.0;
		}
		if normalized_col.contains(&normalized_keyword) {
			let score = (normalized_keyword.len() as f64 / normalized_col.len() as f64).min(0.9);
			best = best.max(score);
		}
		if normalized_keyword.contains(&normalized_col) {
			let score = (normalized_col.len() as f64 / normalized_keyword.len() as f64).min(0.8);
			best = best.max(score);
		}
		best = best.max(fuzzy_score(&normalized_keyword, &normalized_col) * 0.7);
	}
	best
}

fn confidence(column: &str, field: &str) -> f64 {
	let fuzzy = fuzzy_score(&normalize_for_match(column), &normalize_for_match(field));
	let keyword = keyword_score(column, field);
	(fuzzy * 0.3 + keyword * 0.7).min(1.0)
}

/// Walk `file_headers` in file order; for each header, claim its single
/// best-scoring unclaimed canonical field. An earlier header wins any field
/// it shares with a later one, regardless of which scores higher.
fn heuristic_mappings(file_headers: &[String], min_confidence: f64) -> (HashMap<String, String>, HashMap<String, f64>) {
	let mut claimed_fields = HashSet::new();
	let mut mappings = HashMap::new();
	let mut scores = HashMap::new();

	for header in file_headers {
		let best = CANONICAL_FIELDS
			.iter()
			.filter(|field| !claimed_fields.contains(**field))
			.map(|field| (confidence(header, field), *field))
			.filter(|(score, _)| *score >= min_confidence)
			.max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

		if let Some((score, field)) = best {
			claimed_fields.insert(field);
			mappings.insert(header.to_string(), field.to_string());
			scores.insert(header.to_string(), score);
		}
	}

	(mappings, scores)
}

#[derive(Clone)]
pub struct ProposalGenerator {
	proposals_dir: PathBuf,
	min_confidence: f64,
}

impl ProposalGenerator {
	pub fn new(proposals_dir: PathBuf, min_confidence: Option<f64>) -> Self {
		Self {
			proposals_dir,
			min_confidence: min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
		}
	}

	/// Build column mappings for `file_headers`, trying the LLM client first
	/// (if supplied) and falling back to the heuristic scorer on any failure
	/// or when no client is configured.
	pub async fn suggest(
		&self,
		file_headers: &[String],
		metadata: &HashMap<&str, &str>,
		llm_client: Option<&OpenRouterClient>,
	) -> (HashMap<String, String>, HashMap<String, f64>) {
		if let Some(client) = llm_client {
			if let Some((mappings, scores)) = llm::try_suggest(client, file_headers, metadata).await {
				let filtered_mappings: HashMap<String, String> = mappings
					.into_iter()
					.filter(|(col, _)| scores.get(col).copied().unwrap_or(0.0) >= self.min_confidence)
					.collect();
				let filtered_scores: HashMap<String, f64> =
					scores.into_iter().filter(|(col, _)| filtered_mappings.contains_key(col)).collect();
				return (filtered_mappings, filtered_scores);
			}
		}
		heuristic_mappings(file_headers, self.min_confidence)
	}

	/// Generate and persist a proposal document for `file_id`, returning its
	/// path and the proposal itself.
	pub async fn generate(
		&self,
		file_id: i64,
		file_headers: &[String],
		metadata: ProposalMetadata,
		llm_client: Option<&OpenRouterClient>,
	) -> Result<(PathBuf, MappingProposal), ProposalError> {
		let meta_map: HashMap<&str, &str> = [
			metadata.filename.as_deref().map(|v| ("filename", v)),
			metadata.sender.as_deref().map(|v| ("sender", v)),
			metadata.subject.as_deref().map(|v| ("subject", v)),
		]
		.into_iter()
		.flatten()
		.collect();

		let (column_mappings, confidence_scores) = self.suggest(file_headers, &meta_map, llm_client).await;

		let proposal = MappingProposal {
			file_id,
			created_at: Utc::now(),
			file_headers: file_headers.to_vec(),
			column_mappings,
			confidence_scores,
			metadata,
		};

		fs::create_dir_all(&self.proposals_dir)?;
		let filename = format!("proposal_{}_{}.json", file_id, proposal.created_at.format("%Y%m%d_%H%M%S"));
		let path = self.proposals_dir.join(filename);
		fs::write(&path, serde_json::to_string_pretty(&proposal)?)?;

		info!(file_id, mapped = proposal.column_mappings.len(), total = file_headers.len(), "generated mapping proposal");

		Ok((path, proposal))
	}
}

impl AsRef<Path> for ProposalGenerator {
	fn as_ref(&self) -> &Path {
		&self.proposals_dir
	}
}

#[derive(Debug, Error)]
pub enum ProposalError {
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exact_keyword_scores_highest() {
		assert!(confidence("policy_number", "policy_number") > confidence("random_col", "policy_number"));
	}

	#[test]
	fn heuristic_does_not_double_claim_a_field() {
		let headers = vec!["Policy Number".to_string(), "Policy No".to_string()];
		let (mappings, _) = heuristic_mappings(&headers, 0.3);
		let fields: HashSet<&String> = mappings.values().collect();
		assert_eq!(fields.len(), mappings.len());
	}

	#[test]
	fn earlier_header_wins_a_contested_field_on_tied_score() {
		// Both headers match a `policy_number` keyword exactly (score 1.0), so
		// the tie must resolve to whichever header comes first in the file.
		let headers = vec!["pol_no".to_string(), "Policy Number".to_string()];
		let (mappings, _) = heuristic_mappings(&headers, 0.3);
		assert_eq!(mappings.get("pol_no").map(String::as_str), Some("policy_number"));
		assert_ne!(mappings.get("Policy Number").map(String::as_str), Some("policy_number"));
	}

	#[tokio::test]
	async fn generate_without_llm_writes_proposal_file() {
		let dir = tempfile::tempdir().unwrap();
		let generator = ProposalGenerator::new(dir.path().to_path_buf(), None);
		let headers = vec!["Policy Number".to_string(), "Premium".to_string()];
		let (path, proposal) = generator
			.generate(1, &headers, ProposalMetadata::default(), None)
			.await
			.unwrap();
		assert!(path.exists());
		assert!(proposal.column_mappings.contains_key("Policy Number"));
	}
}
