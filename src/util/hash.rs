use std::io;

use sha2::Digest;
use thiserror::Error;

pub struct Hash {}

impl Hash {
	/// Compute the SHA-256 digest of a reader, used as the content-address for stored files.
	pub fn calculate_sha256(reader: &mut impl io::Read) -> Result<String, HashError> {
		let mut hasher = sha2::Sha256::new();
		let mut buffer = [0; 4096];

		loop {
			let bytes_read = reader.read(&mut buffer)?;
			if bytes_read == 0 {
				break;
			}
			hasher.update(&buffer[..bytes_read]);
		}

		Ok(format!("{:x}", hasher.finalize()))
	}

	pub fn sha256_bytes(bytes: &[u8]) -> String {
		let mut hasher = sha2::Sha256::new();
		hasher.update(bytes);
		format!("{:x}", hasher.finalize())
	}
}

#[derive(Debug, Error)]
pub enum HashError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),
}
