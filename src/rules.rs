//! Artist ignore/allow rules
//!
//! A rule set is two ordered pattern lists parsed from a line-oriented
//! file: `exclude` patterns (plain lines) and `include` overrides (lines
//! prefixed with `!`). Blank lines and `#` comments are ignored, and a
//! missing file yields an empty rule set rather than an error.

use std::path::Path;

use crate::types::Artist;

/// Include/exclude wildcard patterns controlling which artists are processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl IgnoreRules {
    /// Build a rule set from explicit pattern lists.
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Load rules from a file. An absent file is an empty rule set.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(_) => {
                tracing::debug!(path = %path.display(), "no rule file, all artists allowed");
                Self::default()
            }
        }
    }

    /// Parse rule text. Blank lines and `#` comments are skipped; a leading
    /// `!` marks an include override, everything else is an exclude.
    pub fn parse(text: &str) -> Self {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.strip_prefix('!') {
                Some(pattern) => include.push(pattern.trim().to_string()),
                None => exclude.push(line.to_string()),
            }
        }
        Self { include, exclude }
    }

    /// Whether both pattern lists are empty.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Decide whether `artist` should be skipped.
    ///
    /// Precedence:
    /// 1. any identifier matches any include pattern → keep (overrides
    ///    everything, including a blanket `*` exclude)
    /// 2. exclude contains the literal `*` → skip
    /// 3. any identifier matches any exclude pattern → skip
    /// 4. otherwise → keep
    pub fn should_skip(&self, artist: &Artist) -> bool {
        let identifiers = artist.identifiers();
        if identifiers
            .iter()
            .any(|id| self.include.iter().any(|p| matches(p, id)))
        {
            return false;
        }
        if self.exclude.iter().any(|p| p == "*") {
            return true;
        }
        identifiers
            .iter()
            .any(|id| self.exclude.iter().any(|p| matches(p, id)))
    }
}

/// Match one identifier against one pattern.
///
/// `*` alone matches everything; `*s*` is contains, `*s` ends-with,
/// `s*` starts-with, anything else exact equality.
fn matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(_), Some(_)) => value.contains(&pattern[1..pattern.len() - 1]),
        (Some(suffix), None) => value.ends_with(suffix),
        (None, Some(prefix)) => value.starts_with(prefix),
        (None, None) => value == pattern,
    }
}
