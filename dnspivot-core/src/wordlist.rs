// Subdomain wordlist loading

use crate::error::{DiscoveryError, Result};
use std::fs;
use std::path::Path;

/// Bundled subdomain labels, used when no wordlist is installed.
pub const DEFAULT_WORDLIST: &str = include_str!("../wordlists/default.txt");

/// Load a wordlist from file
pub fn load_wordlist(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        DiscoveryError::Wordlist(format!("Failed to read wordlist {}: {}", path.display(), e))
    })?;

    let words = parse_wordlist(&content);
    if words.is_empty() {
        return Err(DiscoveryError::Wordlist(format!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        )));
    }

    Ok(words)
}

/// One label per line; blank lines and `#` comments are skipped.
pub fn parse_wordlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn default_wordlist() -> Vec<String> {
    parse_wordlist(DEFAULT_WORDLIST)
}
