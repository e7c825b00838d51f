//! Pattern rules: ordered sequences of token-level constraints describing a linguistic error.
//!
//! A [PatternRule] only describes *what* to look for. The [engine] turns it into an executable
//! matcher, and the [crate::searcher] derives an index query from the same description.

use crate::{utils::regex::SerializeRegex, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod engine;

/// How the text (or part-of-speech tag) of a token is matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextPattern {
    Literal(String),
    Regex(SerializeRegex),
}

impl TextPattern {
    pub fn regex(pattern: &str, case_sensitive: bool) -> Result<Self, Error> {
        Ok(TextPattern::Regex(SerializeRegex::new(pattern, case_sensitive)?))
    }

    /// The finite set of strings this pattern can match, if there is one.
    ///
    /// The matcher and the query compiler both go through this method, so a literal set
    /// is compared the same way in both places.
    pub fn literals(&self) -> Option<Vec<&str>> {
        match self {
            TextPattern::Literal(string) => Some(vec![string.as_str()]),
            TextPattern::Regex(regex) => regex.literal_alternatives(),
        }
    }

    /// Whether this pattern compares case-sensitively, given the case sensitivity of the enclosing constraint.
    /// Regexes carry their own flag.
    pub fn is_case_sensitive(&self, default: bool) -> bool {
        match self {
            TextPattern::Literal(_) => default,
            TextPattern::Regex(regex) => regex.case_sensitive(),
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextPattern::Literal(string) => write!(f, "{:?}", string),
            TextPattern::Regex(regex) => write!(f, "/{}/", regex.pattern()),
        }
    }
}

/// A condition on a single token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Constraint {
    /// Matched against the surface form, or against the lemma if `inflected` is set.
    pub text: Option<TextPattern>,
    pub case_sensitive: bool,
    pub inflected: bool,
    /// The token matches iff the text does *not* match.
    pub negate: bool,
    /// Part-of-speech tag, always compared case-sensitively.
    pub pos: Option<TextPattern>,
    pub negate_pos: bool,
}

impl Constraint {
    /// Whether this constraint holds for every token.
    pub fn is_trivial(&self) -> bool {
        self.text.is_none() && self.pos.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantifier {
    pub min: usize,
    pub max: usize,
}

impl Quantifier {
    /// A `max` below `min` is raised to `min`.
    pub fn new(min: usize, max: usize) -> Self {
        Quantifier {
            min,
            max: max.max(min),
        }
    }
}

impl Default for Quantifier {
    fn default() -> Self {
        Quantifier::new(1, 1)
    }
}

/// Number of tokens which may be skipped between an element and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Skip {
    pub min: usize,
    /// `None` means the skip is only bounded by the end of the sentence.
    pub max: Option<usize>,
}

/// By default the next element must match the token right after this one.
impl Default for Skip {
    fn default() -> Self {
        Skip { min: 0, max: Some(0) }
    }
}

impl Skip {
    pub fn is_adjacent(&self) -> bool {
        self.max == Some(0)
    }
}

/// One constituent of a pattern rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    pub constraint: Constraint,
    /// Constraints which must *not* hold for the matched token.
    pub exceptions: Vec<Constraint>,
    pub quantifier: Quantifier,
    pub skip: Skip,
    /// Whether the element is part of the span reported for a match.
    /// If no element of a rule is marked, the whole match is reported.
    pub marked: bool,
}

impl Element {
    /// Creates an element matching a string.
    ///
    /// # Errors
    /// - If `regexp` is set and `text` is not a valid regular expression.
    pub fn new(text: &str, case_sensitive: bool, regexp: bool, inflected: bool) -> Result<Self, Error> {
        let pattern = if regexp {
            TextPattern::regex(text, case_sensitive)?
        } else {
            TextPattern::Literal(text.trim().to_string())
        };

        Ok(Element::from_constraint(Constraint {
            text: Some(pattern),
            case_sensitive,
            inflected,
            ..Constraint::default()
        }))
    }

    /// Creates an element matching any token.
    pub fn any() -> Self {
        Element::from_constraint(Constraint::default())
    }

    pub fn from_constraint(constraint: Constraint) -> Self {
        Element {
            constraint,
            exceptions: Vec::new(),
            quantifier: Quantifier::default(),
            skip: Skip::default(),
            marked: false,
        }
    }

    pub fn with_pos(mut self, pos: &str, regexp: bool) -> Result<Self, Error> {
        self.constraint.pos = Some(if regexp {
            TextPattern::regex(pos, true)?
        } else {
            TextPattern::Literal(pos.trim().to_string())
        });
        Ok(self)
    }

    pub fn negated(mut self) -> Self {
        self.constraint.negate = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.quantifier = Quantifier::new(0, self.quantifier.max);
        self
    }

    pub fn with_quantifier(mut self, quantifier: Quantifier) -> Self {
        self.quantifier = quantifier;
        self
    }

    pub fn with_skip(mut self, min: usize, max: Option<usize>) -> Self {
        self.skip = Skip { min, max };
        self
    }

    pub fn with_exception(mut self, exception: Constraint) -> Self {
        self.exceptions.push(exception);
        self
    }

    pub fn marked(mut self, marked: bool) -> Self {
        self.marked = marked;
        self
    }

    /// Whether every match of the rule must consume a token for this element.
    pub fn is_required(&self) -> bool {
        self.quantifier.min > 0
    }
}

/// A rule consisting of an ordered sequence of [Element]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    id: String,
    lang_code: String,
    elements: Vec<Element>,
    antipatterns: Vec<Vec<Element>>,
    description: String,
    message: String,
    short_message: String,
}

impl PatternRule {
    /// Creates a new rule.
    ///
    /// # Errors
    /// - If the id is empty or there are no elements.
    pub fn new<S: Into<String>>(
        id: S,
        lang_code: &str,
        elements: Vec<Element>,
        description: S,
        message: S,
        short_message: S,
    ) -> Result<Self, Error> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(Error::InvalidRule("rule id must not be empty".into()));
        }

        if elements.is_empty() {
            return Err(Error::InvalidRule(format!(
                "rule {} must have at least one element",
                id
            )));
        }

        Ok(PatternRule {
            id,
            lang_code: crate::utils::normalize_lang_code(lang_code),
            elements,
            antipatterns: Vec::new(),
            description: description.into(),
            message: message.into(),
            short_message: short_message.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lang_code(&self) -> &str {
        &self.lang_code
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Adds patterns which suppress every match of this rule they overlap with.
    pub fn with_antipatterns(mut self, antipatterns: Vec<Vec<Element>>) -> Self {
        self.antipatterns
            .extend(antipatterns.into_iter().filter(|x| !x.is_empty()));
        self
    }

    pub fn antipatterns(&self) -> &[Vec<Element>] {
        &self.antipatterns
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn short_message(&self) -> &str {
        &self.short_message
    }
}

impl fmt::Display for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.id, self.lang_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_without_elements_is_invalid() {
        let result = PatternRule::new("EMPTY", "en", Vec::new(), "", "", "");
        assert!(matches!(result, Err(Error::InvalidRule(_))));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        assert!(matches!(
            Element::new("(unclosed", false, true, false),
            Err(Error::Regex(_))
        ));
    }

    #[test]
    fn literal_elements_have_one_literal() {
        let element = Element::new(" move ", false, false, false).unwrap();
        let pattern = element.constraint.text.as_ref().unwrap();

        assert_eq!(pattern.literals(), Some(vec!["move"]));
        assert!(element.is_required());
        assert!(!element.optional().is_required());
    }

    #[test]
    fn quantifier_max_is_at_least_min() {
        assert_eq!(Quantifier::new(2, 1), Quantifier { min: 2, max: 2 });
        assert_eq!(Quantifier::new(0, 3), Quantifier { min: 0, max: 3 });
    }
}
