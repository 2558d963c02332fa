pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.trim().to_string()
}

/// Strip whitespace and fold to upper case so residues compare uniformly.
pub(crate) fn normalize_sequence_line(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '\u{feff}' && *ch != '\u{200b}')
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}
