//! Turns raw text into sentence documents of an index.

use crate::{
    index::{IndexStore, IndexWriter},
    tokenizer::{Annotate, AnnotationError, Tokenizers},
    types::{AnnotatedSentence, Sentence},
    utils, Error,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Options for indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Whether to leave out sentences which can not contain a match of a useful rule.
    pub skip_low_signal: bool,
    /// If `skip_low_signal` is set, sentences with fewer tokens are left out.
    pub min_tokens: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            skip_low_signal: false,
            min_tokens: 1,
        }
    }
}

impl IndexOptions {
    fn is_low_signal(&self, sentence: &AnnotatedSentence) -> bool {
        self.skip_low_signal && (!sentence.has_word() || sentence.tokens.len() < self.min_tokens)
    }
}

/// What happened to the sentences of one indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub indexed: usize,
    /// Sentences left out because they are low-signal.
    pub skipped: usize,
    /// Sentences which could not be annotated.
    pub failed: usize,
}

/// Annotates text and writes one document per sentence to an index.
#[derive(Debug, Clone)]
pub struct Indexer<A: Annotate = Tokenizers> {
    annotator: A,
    options: IndexOptions,
}

impl<A: Annotate> Indexer<A> {
    pub fn new(annotator: A, options: IndexOptions) -> Self {
        Indexer { annotator, options }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Indexes all sentences of the text. The documents become visible to readers at once,
    /// when this method returns successfully.
    ///
    /// # Errors
    /// - If the annotator does not support the language.
    /// - If the index has another open writer or can not be written. Sentences which fail
    ///   to annotate are logged and counted, they do not fail the run.
    pub fn index<S: IndexStore>(&self, text: &str, store: &S, lang_code: &str) -> Result<IndexStats, Error> {
        if !self.annotator.supports(lang_code) {
            return Err(AnnotationError::UnsupportedLanguage(utils::normalize_lang_code(lang_code)).into());
        }

        let mut writer = store.writer()?;
        let mut stats = IndexStats::default();

        for result in self.annotator.annotate(text, lang_code) {
            let sentence = match result {
                Ok(sentence) => sentence,
                Err(error) => {
                    warn!("skipping sentence: {}", error);
                    stats.failed += 1;
                    continue;
                }
            };

            if self.options.is_low_signal(&sentence) {
                debug!("skipping low-signal sentence {:?}", sentence.text);
                stats.skipped += 1;
                continue;
            }

            let id = writer.next_doc_id();
            writer.add_document(Sentence::new(id, lang_code, sentence))?;
            stats.indexed += 1;
        }

        writer.commit()?;
        writer.close()?;

        info!(
            "indexed {} sentences ({} skipped, {} failed)",
            stats.indexed, stats.skipped, stats.failed
        );

        Ok(stats)
    }
}

/// Indexes the text with the built-in tokenizer of the language, see [Tokenizers::builtin].
///
/// # Errors
/// - If there is no built-in tokenizer for the language.
/// - If the index has another open writer or can not be written.
///
/// Sentence IDs continue from the number of documents already in the store.
/// If `skip_low_signal` is set, sentences without any alphanumeric token are not indexed.
pub fn build_index<S: IndexStore>(
    text: &str,
    store: &S,
    lang_code: &str,
    skip_low_signal: bool,
) -> Result<IndexStats, Error> {
    let options = IndexOptions {
        skip_low_signal,
        ..IndexOptions::default()
    };

    Indexer::new(Tokenizers::builtin(), options).index(text, store, lang_code)
}
