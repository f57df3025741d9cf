//! Subject masking for log output

/// Number of trailing characters left visible by [`mask_subject`]
const VISIBLE_SUFFIX: usize = 4;

/// Mask a subject identifier for logging (e.g., ***5678)
///
/// Subjects are phone numbers, emails or user ids and must never reach the
/// logs in clear text. Only the last four characters are kept; anything
/// shorter than five characters is fully masked.
pub fn mask_subject(subject: &str) -> String {
    let len = subject.chars().count();
    if len <= VISIBLE_SUFFIX {
        return "****".to_string();
    }
    let suffix: String = subject.chars().skip(len - VISIBLE_SUFFIX).collect();
    format!("***{}", suffix)
}
