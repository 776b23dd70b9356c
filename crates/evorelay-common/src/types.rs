use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized participant identifier used to address stored history.
///
/// The same person maps to the same key regardless of which webhook field
/// supplied the raw id (`5511999@s.whatsapp.net`, `+5511999`, `5511999`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderKey(String);

impl SenderKey {
    /// Normalize a raw id. Returns `None` when nothing is left after stripping.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = normalize_remote_id(raw);
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SenderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trim, drop the `@domain` suffix and any leading `+`.
pub fn normalize_remote_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let local = match trimmed.split_once('@') {
        Some((local, _)) => local,
        None => trimmed,
    };
    local
        .trim_start_matches(|c: char| c == '+' || c.is_whitespace())
        .trim_end()
        .to_string()
}
