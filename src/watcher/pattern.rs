//! Glob-style file name patterns.
//!
//! Folders declare the files they care about with patterns such as `*.log`
//! or `app-??.txt`. A pattern always covers the whole file name: `*` matches
//! any run of characters, `?` matches exactly one, everything else is literal.

use regex::Regex;

use super::error::WatcherError;

/// Compiled set of file name patterns for one folder.
///
/// An empty set, or a set containing `*`, matches every file name.
#[derive(Debug, Clone)]
pub struct PatternSet {
    /// Patterns as configured, for display.
    sources: Vec<String>,
    /// Single anchored alternation of every pattern, `None` when all names match.
    regex: Option<Regex>,
}

impl PatternSet {
    /// Compile a set of glob patterns.
    ///
    /// Blank entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::InvalidPattern` if the translated expression
    /// cannot be compiled (for example because it exceeds the regex size limit).
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, WatcherError> {
        let sources: Vec<String> = patterns
            .iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if sources.is_empty() || sources.iter().any(|p| p == "*") {
            return Ok(Self {
                sources,
                regex: None,
            });
        }

        let alternation = sources
            .iter()
            .map(|p| glob_to_regex(p))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("^(?:{alternation})$")).map_err(|source| {
            WatcherError::InvalidPattern {
                pattern: sources.join(", "),
                source,
            }
        })?;

        Ok(Self {
            sources,
            regex: Some(regex),
        })
    }

    /// Check whether a file name (basename, not a full path) matches any pattern.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(file_name),
            None => true,
        }
    }

    /// Returns `true` if this set accepts every file name.
    #[must_use]
    pub fn matches_everything(&self) -> bool {
        self.regex.is_none()
    }

    /// Patterns as configured.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

/// Translate a single glob into an unanchored regex fragment.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut literal = String::new();

    for ch in glob.chars() {
        match ch {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}
