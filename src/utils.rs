//! Utility functions for draft ids and user supplied text

use bech32::Bech32m;
use uuid7::uuid7;

const TITLE_LIMIT: usize = 100;
const UNTITLED: &str = "Untitled";

// construct a unique draft id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Replaces path and pattern characters, caps the length and falls back to
/// `Untitled` when nothing is left.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '*' | '[' | ']' => '-',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        return UNTITLED.to_string();
    }
    if cleaned.chars().count() > TITLE_LIMIT {
        let mut cut: String = cleaned.chars().take(TITLE_LIMIT).collect();
        cut.push_str("...");
        return cut;
    }
    cleaned
}
