//! Credential scrubbing for storage errors.
//!
//! Detects and replaces secrets that storage backends tend to echo back in
//! error messages before those messages are logged.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Patterns for credentials seen in S3 and SFTP error output
    static ref CREDENTIAL_PATTERNS: Vec<(Regex, &'static str)> = vec![
        // AWS Access Key ID
        (Regex::new(r"(?i)(aws[_-]?access[_-]?key[_-]?id|access[_-]?key[_-]?id)\s*[:=]\s*([A-Z0-9]{16,32})").unwrap(),
         "$1=<REDACTED_AWS_KEY>"),

        // AWS Secret Access Key
        (Regex::new(r"(?i)(aws[_-]?secret[_-]?access[_-]?key|aws[_-]?secret[_-]?key|secret[_-]?access[_-]?key|secret[_-]?key)\s*[:=]\s*([A-Za-z0-9/+=]{16,})").unwrap(),
         "$1=<REDACTED_AWS_SECRET>"),

        // Presigned URL query parameters
        (Regex::new(r"(?i)(X-Amz-(?:Signature|Credential|Security-Token))=([^&\s]+)").unwrap(),
         "$1=<REDACTED>"),

        // Generic passwords
        (Regex::new(r"(?i)(password|passwd|pwd)\s*[:=]\s*([^\s]+)").unwrap(),
         "$1=<REDACTED_PASSWORD>"),

        // Generic tokens
        (Regex::new(r"(?i)(token|session[_-]?token|auth[_-]?token)\s*[:=]\s*([A-Za-z0-9\-._~+/]{20,}=*)").unwrap(),
         "$1=<REDACTED_TOKEN>"),

        // Basic auth in URLs
        (Regex::new(r"((?:https?|sftp|ssh)://)([^:/@\s]+):([^@\s]+)@").unwrap(),
         "$1<REDACTED_USER>:<REDACTED_PASS>@"),
    ];

    /// Paths that point at key material
    static ref SENSITIVE_PATH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\.ssh[/\\]").unwrap(),
        Regex::new(r"(?i)\.aws[/\\]").unwrap(),
        Regex::new(r"(?i)id_(rsa|dsa|ecdsa|ed25519)").unwrap(),
        Regex::new(r"(?i)\.(pem|key|p12|pfx)$").unwrap(),
        Regex::new(r"(?i)credentials").unwrap(),
    ];
}

/// Scrub credentials from a string.
///
/// ```
/// use debug_collector::security::scrub_credentials;
///
/// let scrubbed = scrub_credentials("PutObject failed: password=hunter2");
/// assert_eq!(scrubbed, "PutObject failed: password=<REDACTED_PASSWORD>");
/// ```
pub fn scrub_credentials(input: &str) -> String {
    let mut result = input.to_string();

    for (pattern, replacement) in CREDENTIAL_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

/// Check if a path looks like key material.
pub fn is_sensitive_path(path: &str) -> bool {
    SENSITIVE_PATH_PATTERNS.iter().any(|pattern| pattern.is_match(path))
}

/// Replace the file name of a sensitive path, keeping its directory.
pub fn scrub_path(path: &str) -> String {
    if !is_sensitive_path(path) {
        return path.to_string();
    }

    match path.rfind(|c| c == '/' || c == '\\') {
        Some(pos) => format!("{}/[REDACTED_SENSITIVE_FILE]", &path[..pos]),
        None => "[REDACTED_SENSITIVE_FILE]".to_string(),
    }
}

/// Format `context: error` with credentials scrubbed.
pub fn safe_error_message(context: &str, error: &impl std::fmt::Display) -> String {
    scrub_credentials(&format!("{}: {}", context, error))
}
