//! The tagged scalar type every parsed table cell is projected into.

use chrono::NaiveDateTime;
use serde_json::Value;

/// A single parsed table cell. Parsers emit this instead of handing
/// downstream code a dynamically-typed value to probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	DateTime(NaiveDateTime),
}

impl Cell {
	/// Render the cell the way the row mapper's normalization functions expect:
	/// a plain string, or `None` for `Null`.
	pub fn as_text(&self) -> Option<String> {
		match self {
			Cell::Null => None,
			Cell::Bool(b) => Some(b.to_string()),
			Cell::Int(i) => Some(i.to_string()),
			Cell::Float(f) => Some(f.to_string()),
			Cell::Text(s) => {
				let trimmed = s.trim();
				if trimmed.is_empty() {
					None
				} else {
					Some(trimmed.to_string())
				}
			}
			Cell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
		}
	}

	/// Lossy projection into JSON for the row's `raw_data` snapshot.
	pub fn to_json(&self) -> Value {
		match self {
			Cell::Null => Value::Null,
			Cell::Bool(b) => Value::Bool(*b),
			Cell::Int(i) => Value::from(*i),
			Cell::Float(f) => serde_json::Number::from_f64(*f)
				.map(Value::Number)
				.unwrap_or(Value::Null),
			Cell::Text(s) => Value::String(s.clone()),
			Cell::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
		}
	}
}
