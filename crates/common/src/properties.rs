//! Minimal reader for Java-style `.properties` text

use std::collections::HashMap;

/// Parsed key/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// Parse properties text.
    ///
    /// Supports `key=value`, `key: value` and `key value`, `#`/`!` comments,
    /// and lines continued with a trailing backslash. Later keys win.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        let mut logical = String::new();

        for raw in content.lines() {
            let line = raw.trim_start();

            if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }

            if ends_with_continuation(line) {
                logical.push_str(&line[..line.len() - 1]);
                continue;
            }

            logical.push_str(line);
            if let Some((key, value)) = split_entry(&logical) {
                entries.insert(key, value);
            }
            logical.clear();
        }

        if !logical.is_empty() {
            if let Some((key, value)) = split_entry(&logical) {
                entries.insert(key, value);
            }
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An odd number of trailing backslashes continues the line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let split_at = line.find(|c: char| c == '=' || c == ':' || c.is_whitespace());
    let (key, rest) = match split_at {
        Some(idx) => (&line[..idx], &line[idx..]),
        None => (line, ""),
    };

    // Separator is optional whitespace, at most one of '=' / ':', then whitespace
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);

    Some((key.to_string(), rest.trim_start().to_string()))
}
