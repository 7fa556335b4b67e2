//! IMAP mailbox polling: fetches unseen messages, saves every attachment as
//! a bordereaux file, and only marks a message seen once every attachment in
//! it was stored successfully — a partially failed message stays unseen so
//! the next poll retries it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::Database;
use crate::storage::Storage;

pub struct MailboxConfig {
	pub host: String,
	pub port: u16,
	pub username: String,
	pub password: String,
	pub folder: String,
}

#[derive(Debug, Default)]
pub struct PollResult {
	pub processed_count: usize,
	pub duplicate_count: usize,
	pub failed_count: usize,
	pub emails_marked_seen: usize,
}

/// Connect, search for unseen messages in `config.folder`, store every
/// attachment via `storage`, and mark fully-successful messages seen.
pub fn poll_once(config: &MailboxConfig, db: &Database, storage: &Storage) -> Result<PollResult, MailboxError> {
	let client = imap::ClientBuilder::new(&config.host, config.port).connect()?;
	let mut session = client.login(&config.username, &config.password).map_err(|(err, _)| err)?;
	session.select(&config.folder)?;

	let mut result = PollResult::default();
	let uids = session.search("UNSEEN")?;
	if uids.is_empty() {
		info!(folder = %config.folder, "email poll completed, no unseen messages");
		session.logout()?;
		return Ok(result);
	}

	info!(folder = %config.folder, email_count = uids.len(), "emails fetched");

	let mut message_ok: HashMap<u32, bool> = HashMap::new();

	for uid in uids {
		let fetched = session.fetch(uid.to_string(), "RFC822")?;
		let Some(fetch) = fetched.iter().next() else {
			continue;
		};
		let Some(body) = fetch.body() else {
			continue;
		};

		let ok = store_message_attachments(db, storage, body, &mut result);
		message_ok.insert(uid, ok);
		if !ok {
			result.failed_count += 1;
		}
	}

	let seen_uids: Vec<String> = message_ok.iter().filter(|(_, ok)| **ok).map(|(uid, _)| uid.to_string()).collect();
	if !seen_uids.is_empty() {
		let set = seen_uids.join(",");
		if let Err(err) = session.store(&set, "+FLAGS (\\Seen)") {
			error!(folder = %config.folder, %err, "error marking emails as seen");
		} else {
			result.emails_marked_seen = seen_uids.len();
			info!(folder = %config.folder, email_count = seen_uids.len(), "emails marked as seen");
		}
	}

	session.logout()?;

	info!(
		folder = %config.folder,
		processed = result.processed_count,
		duplicate = result.duplicate_count,
		failed = result.failed_count,
		marked_seen = result.emails_marked_seen,
		"email poll completed"
	);

	Ok(result)
}

fn store_message_attachments(db: &Database, storage: &Storage, raw: &[u8], result: &mut PollResult) -> bool {
	let Some(message) = MessageParser::default().parse(raw) else {
		warn!("could not parse message body, skipping");
		return false;
	};

	let sender = message.from().and_then(|f| f.first()).and_then(|a| a.address()).map(|s| s.to_string());
	let subject = message.subject().map(|s| s.to_string());
	let received_at: Option<DateTime<Utc>> = message.date().and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

	let attachments: Vec<_> = message.attachments().collect();
	if attachments.is_empty() {
		return true;
	}

	let mut all_ok = true;
	for attachment in attachments {
		let filename = attachment.attachment_name().unwrap_or("attachment").to_string();
		let bytes = attachment.contents();

		let mime_type = attachment.content_type().map(|c| c.ctype());
		match storage.save(db, bytes, &filename, mime_type, sender.as_deref(), subject.as_deref(), received_at) {
			Ok(outcome) if outcome.is_duplicate => {
				result.duplicate_count += 1;
				info!(file_id = outcome.file_id, filename, "file stored (duplicate)");
			}
			Ok(outcome) => {
				result.processed_count += 1;
				info!(file_id = outcome.file_id, filename, "file stored");
			}
			Err(err) => {
				all_ok = false;
				error!(filename, %err, "error storing attachment");
			}
		}
	}

	all_ok
}

#[derive(Debug, Error)]
pub enum MailboxError {
	#[error("imap error: {0}")]
	Imap(#[from] imap::Error),
}
