const VISIBLE_PREFIX: usize = 6;

/// Keeps a short prefix of a credential for correlation in logs.
pub fn redact_credential(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.len() <= VISIBLE_PREFIX * 2 {
        return "***REDACTED***".to_string();
    }
    let mut end = VISIBLE_PREFIX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}***({} chars)", &trimmed[..end], trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_tokens_are_fully_hidden() {
        assert_eq!(redact_credential("abc"), "***REDACTED***");
    }

    #[test]
    fn long_tokens_keep_prefix_and_length_only() {
        let token = "eyJhbGciOiJIUzI1NiJ9.payload.signature";
        let redacted = redact_credential(token);
        assert!(redacted.starts_with("eyJhbG***"));
        assert!(!redacted.contains("signature"));
        assert!(redacted.contains(&token.len().to_string()));
    }
}
