//! Asset version hashing.
//!
//! Versions are MD5 hex digests, so they match what other server adapters of
//! the protocol send for the same manifest.

use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;

/// Hashes a version string into the value sent to clients.
pub fn hash_version(version: &str) -> String {
    format!("{:x}", Md5::digest(version.as_bytes()))
}

/// Hashes the content of a reader, typically an asset manifest.
pub fn hash_reader(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn hash_file(path: &Path) -> std::io::Result<String> {
    hash_reader(std::fs::File::open(path)?)
}
