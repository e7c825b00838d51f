//! Splits text into annotated sentences. This is the default annotator consumed by the [Indexer][crate::Indexer].

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use onig::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

pub mod tag;

use crate::{
    types::{AnnotatedSentence, Token},
    utils,
};
use tag::Tagger;

/// Why a single sentence could not be annotated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("sentence {index} has {n_tokens} tokens, the limit is {limit}")]
    TooLong {
        index: usize,
        n_tokens: usize,
        limit: usize,
    },
    #[error("sentence {index} contains control character {character:?}")]
    ControlCharacter { index: usize, character: char },
    #[error("no annotator for language {0:?}")]
    UnsupportedLanguage(String),
}

/// Turns raw text into annotated sentences.
pub trait Annotate {
    /// Annotates every sentence of the text. Sentences fail individually.
    fn annotate(&self, text: &str, lang_code: &str) -> Vec<Result<AnnotatedSentence, AnnotationError>>;

    /// Whether text in this language can be annotated.
    fn supports(&self, _lang_code: &str) -> bool {
        true
    }
}

impl<A: Annotate + ?Sized> Annotate for &A {
    fn annotate(&self, text: &str, lang_code: &str) -> Vec<Result<AnnotatedSentence, AnnotationError>> {
        (**self).annotate(text, lang_code)
    }

    fn supports(&self, lang_code: &str) -> bool {
        (**self).supports(lang_code)
    }
}

/// Options for a tokenizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOptions {
    /// Sentences with more tokens fail to annotate.
    pub max_sentence_tokens: usize,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions {
            max_sentence_tokens: 1024,
        }
    }
}

// see https://stackoverflow.com/a/40296745
fn split<F>(text: &str, split_func: F) -> Vec<&str>
where
    F: Fn(char) -> bool,
{
    let mut result = Vec::new();
    let mut last = 0;
    for (index, matched) in text.match_indices(split_func) {
        if last != index {
            result.push(&text[last..index]);
        }
        result.push(matched);
        last = index + matched.len();
    }
    if last < text.len() {
        result.push(&text[last..]);
    }

    result
}

fn get_token_strs(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();

    lazy_static! {
        // see https://stackoverflow.com/a/17773849
        static ref URL_REGEX: Regex = Regex::new(r"(https?:\/\/(?:www\.|(?!www))[a-zA-Z0-9][a-zA-Z0-9-]+[a-zA-Z0-9]\.[^\s]{2,}|www\.[a-zA-Z0-9][a-zA-Z0-9-]+[a-zA-Z0-9]\.[^\s]{2,}|https?:\/\/(?:www\.|(?!www))[a-zA-Z0-9]+\.[^\s]{2,}|www\.[a-zA-Z0-9]+\.[^\s]{2,})").unwrap();
    }

    let mut prev = 0;
    let split_func = |c: char| c.is_whitespace() || crate::utils::splitting_chars().contains(c);

    for (start, end) in URL_REGEX.find_iter(text) {
        tokens.extend(split(&text[prev..start], split_func));
        tokens.push(&text[start..end]);
        prev = end;
    }

    tokens.extend(split(&text[prev..text.len()], split_func));

    tokens
}

/// A rule based tokenizer with a dictionary [Tagger].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tokenizer {
    tagger: Tagger,
    options: TokenizerOptions,
}

impl Tokenizer {
    pub fn new(tagger: Tagger, options: TokenizerOptions) -> Self {
        Tokenizer { tagger, options }
    }

    pub fn tagger(&self) -> &Tagger {
        &self.tagger
    }

    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    /// Splits a text into sentences, keeping trailing whitespace out of the sentences.
    pub fn sentencize<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        text.split_sentence_bounds()
            .map(|x| x.trim())
            .filter(|x| !x.is_empty())
    }

    /// Tokenizes and tags one sentence.
    pub fn tokenize(&self, sentence: &str) -> Vec<Token> {
        let mut current_char = 0;
        let mut tokens = Vec::new();

        for token_str in get_token_strs(sentence) {
            let char_start = current_char;
            current_char += token_str.chars().count();

            let text = token_str.trim();
            if text.is_empty() {
                continue;
            }

            let byte_start = token_str.as_ptr() as usize - sentence.as_ptr() as usize;
            let data = self.tagger.get_tags(text).into_iter().next();

            tokens.push(Token {
                text: text.to_string(),
                lemma: data.map(|x| x.lemma.clone()),
                pos: data.map(|x| x.pos.clone()),
                position: tokens.len(),
                has_space_before: sentence[..byte_start].ends_with(char::is_whitespace),
                char_span: (char_start, current_char),
            });
        }

        tokens
    }
}

impl Annotate for Tokenizer {
    fn annotate(&self, text: &str, _lang_code: &str) -> Vec<Result<AnnotatedSentence, AnnotationError>> {
        self.sentencize(text)
            .enumerate()
            .map(|(index, sentence)| {
                if let Some(character) = sentence
                    .chars()
                    .find(|c| c.is_control() && !c.is_whitespace())
                {
                    return Err(AnnotationError::ControlCharacter { index, character });
                }

                let tokens = self.tokenize(sentence);
                if tokens.len() > self.options.max_sentence_tokens {
                    return Err(AnnotationError::TooLong {
                        index,
                        n_tokens: tokens.len(),
                        limit: self.options.max_sentence_tokens,
                    });
                }

                Ok(AnnotatedSentence::new(sentence.to_string(), tokens))
            })
            .collect()
    }
}

/// Tokenizers selected by the language code of the text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tokenizers {
    tokenizers: FnvHashMap<String, Tokenizer>,
}

lazy_static! {
    static ref BUILTIN: Tokenizers = {
        let mut tokenizers = Tokenizers::default();
        tokenizers.insert("en", Tokenizer::new(Tagger::english(), TokenizerOptions::default()));
        tokenizers
    };
}

impl Tokenizers {
    /// The tokenizers for the languages with a built-in lexicon. Currently only English (`en`).
    pub fn builtin() -> &'static Tokenizers {
        &BUILTIN
    }

    /// Sets the tokenizer for a language, replacing the previous one.
    pub fn insert(&mut self, lang_code: &str, tokenizer: Tokenizer) {
        self.tokenizers
            .insert(utils::normalize_lang_code(lang_code), tokenizer);
    }

    pub fn get(&self, lang_code: &str) -> Option<&Tokenizer> {
        self.tokenizers.get(&utils::normalize_lang_code(lang_code))
    }

    pub fn lang_codes(&self) -> impl Iterator<Item = &str> {
        self.tokenizers.keys().map(|x| x.as_str())
    }
}

impl Annotate for Tokenizers {
    fn annotate(&self, text: &str, lang_code: &str) -> Vec<Result<AnnotatedSentence, AnnotationError>> {
        match self.get(lang_code) {
            Some(tokenizer) => tokenizer.annotate(text, lang_code),
            None => vec![Err(AnnotationError::UnsupportedLanguage(
                utils::normalize_lang_code(lang_code),
            ))],
        }
    }

    fn supports(&self, lang_code: &str) -> bool {
        self.get(lang_code).is_some()
    }
}
