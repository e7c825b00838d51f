//! Fundamental types used by this crate.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Identifier of a sentence document inside one index.
pub type DocId = u32;

/// Lemma and part-of-speech tag associated with a word.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct WordData {
    pub lemma: String,
    pub pos: String,
}

impl WordData {
    pub fn new<S: Into<String>, P: Into<String>>(lemma: S, pos: P) -> Self {
        WordData {
            lemma: lemma.into(),
            pos: pos.into(),
        }
    }
}

/// One token of an annotated sentence with all of its searchable facets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The surface form, exactly as it occurs in the text.
    pub text: String,
    pub lemma: Option<String>,
    pub pos: Option<String>,
    /// Index of this token in its sentence, contiguous from zero.
    pub position: usize,
    pub has_space_before: bool,
    /// Start (inclusive) and end (exclusive) char index in the sentence text.
    pub char_span: (usize, usize),
}

impl Token {
    /// The lemma of this token. Tokens the annotator knows nothing about are their own lemma.
    pub fn lemma_or_text(&self) -> &str {
        self.lemma.as_deref().unwrap_or(&self.text)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// A sentence as produced by an annotator, before it is assigned an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl AnnotatedSentence {
    pub fn new(text: String, tokens: Vec<Token>) -> Self {
        AnnotatedSentence { text, tokens }
    }

    /// Whether at least one token contains an alphanumeric character.
    pub fn has_word(&self) -> bool {
        self.tokens
            .iter()
            .any(|token| token.text.chars().any(char::is_alphanumeric))
    }
}

/// A sentence document as stored in an index. Immutable once indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    id: DocId,
    lang_code: String,
    text: String,
    tokens: Vec<Token>,
}

impl Sentence {
    pub fn new(id: DocId, lang_code: &str, sentence: AnnotatedSentence) -> Self {
        Sentence {
            id,
            lang_code: crate::utils::normalize_lang_code(lang_code),
            text: sentence.text,
            tokens: sentence.tokens,
        }
    }

    pub fn id(&self) -> DocId {
        self.id
    }

    pub fn lang_code(&self) -> &str {
        &self.lang_code
    }

    /// The raw sentence text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Rebuilds the sentence text from the tokens and their whitespace flags.
    /// Runs of whitespace collapse to a single space.
    pub fn reconstruct(&self) -> String {
        let mut out = String::new();

        for token in &self.tokens {
            if token.has_space_before && !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&token.text);
        }

        out
    }
}

/// A confirmed occurrence of a rule in a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// The ID of the rule this match is from.
    pub rule_id: String,
    /// Token positions covered by the match.
    pub token_range: Range<usize>,
    /// Char offsets covered by the match inside the sentence text.
    pub char_range: Range<usize>,
    /// A human-readable message.
    pub message: String,
}

impl Match {
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// The matched part of the sentence text.
    pub fn text<'a>(&self, sentence: &'a Sentence) -> &'a str {
        crate::utils::char_slice(sentence.text(), self.char_range.clone())
    }
}

/// A sentence together with the matches one rule produced in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingSentence {
    sentence: Sentence,
    matches: Vec<Match>,
}

impl MatchingSentence {
    pub fn new(sentence: Sentence, matches: Vec<Match>) -> Self {
        MatchingSentence { sentence, matches }
    }

    pub fn sentence(&self) -> &Sentence {
        &self.sentence
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }
}
