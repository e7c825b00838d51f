//! Find matches of LanguageTool-style pattern rules in large corpora without checking every sentence.
//! # Overview
//!
//! nlprule-index has the following core abstractions:
//! - An [Index][index::Index] storing one document per annotated sentence, with searchable fields for
//!   surface form, lemma and part-of-speech tag of every token. It is filled once by [build_index].
//! - [PatternRule][rule::PatternRule]s, looked up by ID from a [RuleSource][rules::RuleSource] with [get_rule_by_id].
//! - A [Searcher][searcher::Searcher] which compiles a rule into an index query matching a *superset* of the sentences
//!   the rule matches, fetches those candidates and confirms them with the exact [Engine][rule::engine::Engine].
//!
//! # Examples
//!
//! ```no_run
//! use nlprule_index::{build_index, get_rule_by_id, index::{Index, IndexStore}, rules::XmlRuleSource, searcher::Searcher};
//!
//! let index = Index::in_memory();
//! build_index("How to move back and fourth from linux to xmb?", &index, "en", false)?;
//!
//! let rule = get_rule_by_id("BACK_AND_FOURTH", &XmlRuleSource::new("grammar.xml"))?;
//! let reader = index.reader()?;
//!
//! for sentence in Searcher::default().find_rule_matches(&rule, "en", &reader)? {
//!     println!("{}: {:?}", sentence.sentence().text(), sentence.matches());
//! }
//! # Ok::<(), nlprule_index::Error>(())
//! ```

use std::io;

use thiserror::Error;

pub mod index;
pub mod indexer;
pub mod rule;
pub mod rules;
pub mod searcher;
pub mod tokenizer;
pub mod types;
pub(crate) mod utils;

pub use indexer::{build_index, IndexOptions, IndexStats, Indexer};
pub use rules::get_rule_by_id;
pub use types::DocId;

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// (De)serialization error. Can have occured during deserialization or during serialization.
    #[error(transparent)]
    Serialization(#[from] bincode::Error),
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
    #[error(transparent)]
    Regex(#[from] onig::Error),
    #[error(transparent)]
    Annotation(#[from] tokenizer::AnnotationError),
    /// The rule source does not contain a rule with this ID.
    #[error("no rule with id {0:?} found")]
    RuleNotFound(String),
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("confirmation failed for sentence {id}: {reason}")]
    Confirmation { id: DocId, reason: String },
    #[error("invalid rule: {0}")]
    InvalidRule(String),
    #[error("feature not implemented: {0}")]
    Unimplemented(String),
}
