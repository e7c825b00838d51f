use onig::{Regex, RegexOptions};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::{
    convert::TryFrom,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegexRepr {
    pattern: String,
    case_sensitive: bool,
}

impl TryFrom<RegexRepr> for SerializeRegex {
    type Error = onig::Error;

    fn try_from(repr: RegexRepr) -> Result<Self, onig::Error> {
        SerializeRegex::new(&repr.pattern, repr.case_sensitive)
    }
}

impl From<SerializeRegex> for RegexRepr {
    fn from(regex: SerializeRegex) -> Self {
        RegexRepr {
            pattern: regex.pattern,
            case_sensitive: regex.case_sensitive,
        }
    }
}

/// A regular expression which always has to match the full input and which
/// (de)serializes through its pattern string.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RegexRepr", into = "RegexRepr")]
pub struct SerializeRegex {
    pattern: String,
    case_sensitive: bool,
    regex: Arc<Regex>,
}

impl fmt::Debug for SerializeRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializeRegex")
            .field("pattern", &self.pattern)
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}

impl PartialEq for SerializeRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.case_sensitive == other.case_sensitive
    }
}

impl Eq for SerializeRegex {}

impl Hash for SerializeRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pattern.hash(state);
        self.case_sensitive.hash(state);
    }
}

impl SerializeRegex {
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, onig::Error> {
        let pattern = pattern.trim().to_string();
        let regex = SerializeRegex::compile(&pattern, case_sensitive)?;

        Ok(SerializeRegex {
            pattern,
            case_sensitive,
            regex: Arc::new(regex),
        })
    }

    fn compile(pattern: &str, case_sensitive: bool) -> Result<Regex, onig::Error> {
        Regex::with_options(
            &format!("^(?:{})$", pattern),
            if case_sensitive {
                RegexOptions::REGEX_OPTION_NONE
            } else {
                RegexOptions::REGEX_OPTION_IGNORECASE
            },
            onig::Syntax::java(),
        )
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// If the pattern is nothing but an alternation of literal words (e. g. `brow|lid|lash`),
    /// returns the words. Such patterns can be looked up in an index term by term.
    pub fn literal_alternatives(&self) -> Option<Vec<&str>> {
        let is_literal_char = |c: char| c.is_alphanumeric() || c == '-' || c == '\'' || c == '_';

        if !self.pattern.chars().all(|c| c == '|' || is_literal_char(c)) {
            return None;
        }

        let alternatives: Vec<_> = self.pattern.split('|').collect();
        if alternatives.iter().any(|x| x.is_empty()) {
            return None;
        }

        Some(alternatives)
    }
}

impl Deref for SerializeRegex {
    type Target = Regex;

    fn deref(&self) -> &Self::Target {
        &self.regex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_full_input_only() {
        let regex = SerializeRegex::new("lids?", true).unwrap();

        assert!(regex.is_match("lid"));
        assert!(regex.is_match("lids"));
        assert!(!regex.is_match("eyelid"));
        assert!(!regex.is_match("Lid"));
    }

    #[test]
    fn respects_case_insensitivity() {
        let regex = SerializeRegex::new("brow|lid", false).unwrap();

        assert!(regex.is_match("LID"));
        assert!(regex.is_match("Brow"));
    }

    #[test]
    fn finds_literal_alternatives() {
        let regex = SerializeRegex::new("brow|lid|lash", false).unwrap();
        assert_eq!(regex.literal_alternatives(), Some(vec!["brow", "lid", "lash"]));

        let regex = SerializeRegex::new("lids?", false).unwrap();
        assert_eq!(regex.literal_alternatives(), None);

        let regex = SerializeRegex::new("a||b", false).unwrap();
        assert_eq!(regex.literal_alternatives(), None);
    }

    #[test]
    fn roundtrips_through_bincode() {
        let regex = SerializeRegex::new("lash(es)?", false).unwrap();
        let bytes = bincode::serialize(&regex).unwrap();
        let other: SerializeRegex = bincode::deserialize(&bytes).unwrap();

        assert_eq!(regex, other);
        assert!(other.is_match("LASHES"));
    }
}
