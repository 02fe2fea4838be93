use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use uuid::Uuid;

/// Compute SHA256 hash of uploaded bytes
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Longest sanitized name. With the `{unix}_{token}_` prefix the staged
/// reference stays under the 255-byte filename limit of common filesystems.
pub const MAX_SANITIZED_NAME_BYTES: usize = 200;

/// Extensions longer than this are treated as part of the stem when capping
const MAX_KEPT_EXTENSION_BYTES: usize = 16;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"))
}

/// Reduce a user-supplied filename to something safe to use inside the stage.
///
/// Only the final path component is kept (both `/` and `\` separate), and
/// every character outside `[A-Za-z0-9._-]` becomes `_`. Names longer than
/// `MAX_SANITIZED_NAME_BYTES` lose the end of their stem; the extension stays.
///
/// ```text
/// "report.pdf"           → "report.pdf"
/// "../../etc/passwd"     → "passwd"
/// "Q3 Results (final).pdf" → "Q3_Results__final_.pdf"
/// ""                     → "upload"
/// ```
pub fn sanitize_filename(original_name: &str) -> String {
    let normalized = original_name.replace('\\', "/");
    let base = normalized
        .rsplit('/')
        .next()
        .unwrap_or("")
        .trim();

    let cleaned = unsafe_chars().replace_all(base, "_").to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cap_length(cleaned)
    }
}

fn cap_length(name: String) -> String {
    if name.len() <= MAX_SANITIZED_NAME_BYTES {
        return name;
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_KEPT_EXTENSION_BYTES => name.split_at(dot),
        _ => (name.as_str(), ""),
    };

    let mut cut = MAX_SANITIZED_NAME_BYTES - extension.len();
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &stem[..cut], extension)
}

/// Build a staged reference for an upload.
///
/// Format: `{unix_seconds}_{12 hex chars}_{sanitized name}`. The timestamp
/// keeps the stage listing roughly chronological; the random token keeps two
/// uploads of the same name within one second apart.
pub fn staged_reference(original_name: &str, now: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", now.timestamp(), &token[..12], sanitize_filename(original_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_content_hash() {
        let hash = compute_content_hash(b"test content");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_content_hash(b"test content"));
        assert_ne!(hash, compute_content_hash(b"other content"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\doc.docx"), "doc.docx");
        assert_eq!(sanitize_filename("Q3 Results (final).pdf"), "Q3_Results__final_.pdf");
        assert_eq!(sanitize_filename("it's.txt"), "it_s.txt");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename("dir/"), "upload");
    }

    #[test]
    fn test_long_name_capped_with_extension_kept() {
        let long = format!("{}.txt", "a".repeat(250));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.len(), MAX_SANITIZED_NAME_BYTES);
        assert!(sanitized.ends_with("aaa.txt"));

        let no_extension = "b".repeat(300);
        assert_eq!(sanitize_filename(&no_extension).len(), MAX_SANITIZED_NAME_BYTES);

        let reference = staged_reference(&long, Utc::now());
        assert!(reference.len() <= 255);
        assert_eq!(crate::ingest::FileType::from_filename(&reference), crate::ingest::FileType::Txt);
    }

    #[test]
    fn test_staged_reference_format() {
        let now = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z").unwrap().with_timezone(&Utc);
        let reference = staged_reference("doc.pdf", now);

        let parts: Vec<&str> = reference.splitn(3, '_').collect();
        assert_eq!(parts[0], now.timestamp().to_string());
        assert_eq!(parts[1].len(), 12);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[2], "doc.pdf");
    }

    #[test]
    fn test_staged_reference_unique_within_same_second() {
        let now = Utc::now();
        let a = staged_reference("doc.pdf", now);
        let b = staged_reference("doc.pdf", now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_staged_reference_keeps_file_type() {
        let reference = staged_reference("Annual Report.DOCX", Utc::now());
        assert!(reference.ends_with("Annual_Report.DOCX"));
        assert_eq!(
            crate::ingest::FileType::from_filename(&reference),
            crate::ingest::FileType::Docx
        );
    }
}
