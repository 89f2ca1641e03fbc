//! Normalization helpers applied before validation.

/// Trim surrounding whitespace
pub fn trim(value: &str) -> String {
    value.trim().to_string()
}

/// Lowercase and trim an Ethereum address
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Uppercase and trim a token symbol
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Trim, collapse internal whitespace runs, and strip control characters
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_was_space = true;
    for c in label.trim().chars() {
        if c.is_control() {
            continue;
        }
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Sanitize an optional label in place, dropping it when empty after cleanup
pub fn sanitize_label_optional(label: &mut Option<String>) {
    if let Some(ref value) = label {
        let cleaned = sanitize_label(value);
        *label = if cleaned.is_empty() { None } else { Some(cleaned) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_addresses_to_lowercase() {
        assert_eq!(
            normalize_address("  0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B "),
            "0xab5801a7d398351b8be11c439e05c5b3259aec9b"
        );
    }

    #[test]
    fn symbol_is_uppercased() {
        assert_eq!(normalize_symbol(" oec "), "OEC");
    }

    #[test]
    fn label_whitespace_is_collapsed() {
        assert_eq!(sanitize_label("  main \t\n wallet  "), "main wallet");
        assert_eq!(sanitize_label("a\u{0000}b"), "ab");
    }

    #[test]
    fn empty_labels_collapse_to_none() {
        let mut label = Some("   ".to_string());
        sanitize_label_optional(&mut label);
        assert_eq!(label, None);

        let mut label = Some(" cold storage ".to_string());
        sanitize_label_optional(&mut label);
        assert_eq!(label.as_deref(), Some("cold storage"));
    }
}
