use super::cell::Cell;
use super::header::normalize_headers;
use super::{ParseError, ParsedTable};
use encoding_rs::{UTF_8, WINDOWS_1252};

/// Decode CSV bytes trying, in order, utf-8 then windows-1252 (which covers
/// latin-1/iso-8859-1/cp1252 for the vast majority of real-world bordereaux
/// exports), falling back to a lossy utf-8 decode if nothing decodes cleanly.
fn decode(bytes: &[u8]) -> String {
	for encoding in [UTF_8, WINDOWS_1252] {
		let (decoded, _, had_errors) = encoding.decode(bytes);
		if !had_errors {
			return decoded.into_owned();
		}
	}
	let (decoded, _, _) = UTF_8.decode(bytes);
	decoded.into_owned()
}

pub fn parse_csv(bytes: &[u8]) -> Result<ParsedTable, ParseError> {
	let text = decode(bytes);
	let mut reader = csv::ReaderBuilder::new()
		.flexible(true)
		.has_headers(true)
		.from_reader(text.as_bytes());

	let raw_headers: Vec<String> = reader
		.headers()
		.map_err(|e| ParseError::Csv(e.to_string()))?
		.iter()
		.map(|h| h.to_string())
		.collect();
	let headers = normalize_headers(&raw_headers);

	let mut rows = Vec::new();
	for record in reader.records() {
		// Malformed lines are skipped rather than aborting the whole parse.
		let record = match record {
			Ok(r) => r,
			Err(_) => continue,
		};
		let mut row = Vec::with_capacity(headers.len());
		for idx in 0..headers.len() {
			let cell = record
				.get(idx)
				.map(|s| {
					if s.trim().is_empty() {
						Cell::Null
					} else {
						Cell::Text(s.to_string())
					}
				})
				.unwrap_or(Cell::Null);
			row.push(cell);
		}
		rows.push(row);
	}

	Ok(ParsedTable { headers, rows })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_simple_csv() {
		let data = b"Policy Number,Premium\nPOL1,1234.56\n";
		let table = parse_csv(data).unwrap();
		assert_eq!(table.headers, vec!["policy_number", "premium"]);
		assert_eq!(table.rows.len(), 1);
		assert_eq!(table.rows[0][0], Cell::Text("POL1".to_string()));
	}

	#[test]
	fn skips_malformed_rows_without_aborting() {
		let data = b"a,b\n1,2\n\"unterminated\n3,4\n";
		let table = parse_csv(data).unwrap();
		assert!(table.rows.len() >= 1);
	}
}
