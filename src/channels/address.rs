//! Recipient address normalization.

/// Normalize a phone number to E.164 form (`+` followed by digits).
///
/// A `whatsapp:` prefix is dropped and every non-digit is removed. The
/// result always carries exactly one leading `+`.
pub fn normalize_e164(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix("whatsapp:").unwrap_or(trimmed).trim();
    let digits: String = without_prefix
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    format!("+{}", digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_and_prefixed() {
        assert_eq!(normalize_e164("+15551234567"), "+15551234567");
        assert_eq!(normalize_e164("15551234567"), "+15551234567");
        assert_eq!(normalize_e164("whatsapp:+15551234567"), "+15551234567");
    }

    #[test]
    fn test_normalize_strips_formatting() {
        assert_eq!(normalize_e164(" +1 (555) 123-4567 "), "+15551234567");
    }

    #[test]
    fn test_normalize_empty_is_bare_plus() {
        assert_eq!(normalize_e164(""), "+");
        assert_eq!(normalize_e164("abc"), "+");
    }
}
