use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::constants::DEFAULT_BUFFER_SIZE;

/// Calculate the SHA-256 of a file, returned as lowercase hex
pub fn calculate_sha256(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; DEFAULT_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash a file without blocking the async runtime
pub async fn calculate_sha256_async(path: PathBuf) -> io::Result<String> {
    tokio::task::spawn_blocking(move || calculate_sha256(&path))
        .await
        .map_err(io::Error::other)?
}

/// SHA-256 of an in-memory buffer
pub fn sha256_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
