use sha2::{Digest, Sha256};

/// Stable, filesystem-safe file name for an item's record:
/// `{sanitized_name}--{short_hash(name)}.json`.
///
/// The hash keeps names that sanitize to the same text apart.
pub fn record_filename(name: &str) -> String {
    let sanitized = sanitize(name);
    let hash = short_hash(name);
    format!("{sanitized}--{hash}.json")
}

fn sanitize(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut cleaned = compacted.trim_matches(&['_', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "item".to_string();
    }
    if cleaned.len() > 80 {
        let mut end = 80;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }
    if is_reserved_windows_name(&cleaned) {
        cleaned.push('_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::record_filename;

    #[test]
    fn names_are_sanitized_and_hashed() {
        let name = record_filename("SAP S/4HANA: Finance");
        assert!(name.starts_with("SAP_S_4HANA_Finance--"));
        assert!(name.ends_with(".json"));
        assert_eq!(name, record_filename("SAP S/4HANA: Finance"));
    }

    #[test]
    fn colliding_sanitized_names_get_distinct_files() {
        assert_ne!(record_filename("a/b"), record_filename("a:b"));
    }

    #[test]
    fn reserved_and_empty_names_are_patched() {
        assert!(record_filename("con").starts_with("con_--"));
        assert!(record_filename("???").starts_with("item--"));
    }
}
