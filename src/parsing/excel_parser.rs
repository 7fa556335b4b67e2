use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDateTime;

use super::cell::Cell;
use super::header::normalize_headers;
use super::{ParseError, ParsedTable};

pub fn parse_excel(bytes: &[u8]) -> Result<ParsedTable, ParseError> {
	let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
		.map_err(|e| ParseError::Excel(e.to_string()))?;

	let sheet_name = workbook
		.sheet_names()
		.first()
		.cloned()
		.ok_or_else(|| ParseError::Excel("workbook has no sheets".to_string()))?;

	let range = workbook
		.worksheet_range(&sheet_name)
		.map_err(|e| ParseError::Excel(e.to_string()))?;

	let mut rows_iter = range.rows();
	let raw_headers: Vec<String> = match rows_iter.next() {
		Some(header_row) => header_row.iter().map(data_to_header).collect(),
		None => return Ok(ParsedTable { headers: Vec::new(), rows: Vec::new() }),
	};
	let headers = normalize_headers(&raw_headers);

	let rows: Vec<Vec<Cell>> = rows_iter
		.map(|row| {
			(0..headers.len())
				.map(|idx| row.get(idx).map(data_to_cell).unwrap_or(Cell::Null))
				.collect()
		})
		.collect();

	Ok(ParsedTable { headers, rows })
}

fn data_to_header(data: &Data) -> String {
	match data {
		Data::Empty => String::new(),
		other => other.to_string(),
	}
}

fn data_to_cell(data: &Data) -> Cell {
	match data {
		Data::Empty => Cell::Null,
		Data::String(s) => Cell::Text(s.clone()),
		Data::Float(f) => Cell::Float(*f),
		Data::Int(i) => Cell::Int(*i),
		Data::Bool(b) => Cell::Bool(*b),
		Data::DateTime(dt) => dt
			.as_datetime()
			.map(Cell::DateTime)
			.unwrap_or(Cell::Null),
		Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
			.map(Cell::DateTime)
			.unwrap_or_else(|_| Cell::Text(s.clone())),
		Data::DurationIso(s) => Cell::Text(s.clone()),
		Data::Error(e) => Cell::Text(format!("{:?}", e)),
	}
}
