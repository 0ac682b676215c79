use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK: usize = 64 * 1024;

/// Hex characters in a finished digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Streaming content fingerprint. Identity key only, not an integrity check.
#[derive(Clone, Default)]
pub struct ContentHasher {
    state: Sha256,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.state.update(bytes);
    }

    /// Lowercase hex digest.
    pub fn finalize(self) -> String {
        hex::encode(self.state.finalize())
    }

    pub fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Self::new();
        hasher.update(bytes);
        hasher.finalize()
    }

    /// Hashes everything `reader` yields, one chunk resident at a time.
    pub async fn hash_reader<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<String> {
        let mut hasher = Self::new();
        let mut buf = vec![0u8; CHUNK];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    pub async fn hash_file(path: impl AsRef<Path>) -> std::io::Result<String> {
        let file = tokio::fs::File::open(path).await?;
        Self::hash_reader(file).await
    }
}

/// Reads `reader` to the end, feeding every chunk to a hasher on the way.
/// Returns the bytes together with their digest, so the file is read once.
pub async fn read_and_hash<R: AsyncRead + Unpin>(
    mut reader: R,
    size_hint: usize,
) -> std::io::Result<(Vec<u8>, String)> {
    let mut hasher = ContentHasher::new();
    let mut bytes = Vec::with_capacity(size_hint);
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        bytes.extend_from_slice(&buf[..n]);
    }
    Ok((bytes, hasher.finalize()))
}
