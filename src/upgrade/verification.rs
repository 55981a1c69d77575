use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Verifies the integrity of downloaded packages and installers using SHA256.
///
/// Feeds publish digests either as a bare hex string or with a `sha256:`
/// prefix; both are accepted and compared case-insensitively.
///
/// # Security Benefits
///
/// - **Download Integrity**: Detects corrupted or truncated packages
/// - **Tamper Detection**: Refuses installers that differ from the manifest
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the SHA256 checksum of a file as `sha256:<hex>`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use hoist_cli::upgrade::verification::ChecksumVerifier;
    /// use std::path::Path;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let checksum = ChecksumVerifier::compute_sha256(Path::new("/path/to/package.nupkg"))?;
    /// println!("SHA256: {}", checksum);
    /// # Ok(())
    /// # }
    /// ```
    pub fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {:?}", file_path);

        let mut file = fs::File::open(file_path)
            .with_context(|| format!("Failed to read file: {file_path:?}"))?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = file
                .read(&mut buffer)
                .with_context(|| format!("Failed to read file: {file_path:?}"))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    /// Verify a file against an expected checksum.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if checksums match
    /// - `Err` if checksums don't match or the file cannot be read
    pub fn verify_checksum(file_path: &Path, expected_checksum: &str) -> Result<()> {
        info!("Verifying checksum for: {:?}", file_path);

        let actual_checksum = Self::compute_sha256(file_path)?;
        let expected = Self::normalize(expected_checksum);

        if actual_checksum != expected {
            bail!(
                "Checksum verification failed!\n  Expected: {expected}\n  Actual:   {actual_checksum}"
            );
        }

        info!("Checksum verification successful");
        Ok(())
    }

    /// Parse the content of a `.sha256` sidecar file.
    ///
    /// Accepts `sha256sum` output (`<hex>  <file>`), a bare digest, or a
    /// `sha256:` prefixed digest. Returns `None` if no digest is present.
    #[must_use]
    pub fn parse_sidecar(content: &str) -> Option<String> {
        let token = content.split_whitespace().next()?;
        let hex_part = token.strip_prefix("sha256:").unwrap_or(token);
        if hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self::normalize(hex_part))
        } else {
            None
        }
    }

    fn normalize(checksum: &str) -> String {
        let lower = checksum.trim().to_lowercase();
        if lower.starts_with("sha256:") {
            lower
        } else {
            format!("sha256:{lower}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HELLO_SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn hello_file() -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"hello world").unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_compute_sha256() {
        let temp_file = hello_file();
        let checksum = ChecksumVerifier::compute_sha256(temp_file.path()).unwrap();
        assert_eq!(checksum, format!("sha256:{HELLO_SHA}"));
    }

    #[test]
    fn test_verify_checksum_accepts_prefixed_bare_and_uppercase() {
        let temp_file = hello_file();
        ChecksumVerifier::verify_checksum(temp_file.path(), HELLO_SHA).unwrap();
        ChecksumVerifier::verify_checksum(temp_file.path(), &format!("sha256:{HELLO_SHA}"))
            .unwrap();
        ChecksumVerifier::verify_checksum(temp_file.path(), &HELLO_SHA.to_uppercase()).unwrap();
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let temp_file = hello_file();
        let err = ChecksumVerifier::verify_checksum(temp_file.path(), &"0".repeat(64)).unwrap_err();
        assert!(err.to_string().contains("Checksum verification failed"));
    }

    #[test]
    fn test_parse_sidecar_formats() {
        let expected = Some(format!("sha256:{HELLO_SHA}"));
        assert_eq!(ChecksumVerifier::parse_sidecar(HELLO_SHA), expected);
        assert_eq!(
            ChecksumVerifier::parse_sidecar(&format!("{HELLO_SHA}  hoist.linux.1.2.3.nupkg\n")),
            expected
        );
        assert_eq!(ChecksumVerifier::parse_sidecar(&format!("sha256:{HELLO_SHA}")), expected);
        assert_eq!(ChecksumVerifier::parse_sidecar("not-a-digest"), None);
        assert_eq!(ChecksumVerifier::parse_sidecar(""), None);
    }
}
