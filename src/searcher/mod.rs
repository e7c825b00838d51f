//! Finds the sentences of an index in which a rule matches.
//!
//! A search runs in three steps: the rule is compiled into a [Query] which matches a superset
//! of the sentences the rule matches in, the query retrieves candidates from an [IndexReader],
//! and every candidate is confirmed by an exact [PatternMatcher].

use crate::{
    index::{Field, IndexReader, Query, Term},
    rule::{
        engine::{Engine, PatternMatcher},
        PatternRule,
    },
    types::{MatchingSentence, Sentence},
    utils::parallelism::{MaybeParallelIterator, MaybeParallelRefIterator},
    Error,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use unicase::UniCase;

mod compile;

pub use compile::{compile, compile_rule};

/// Options for a searcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearcherOptions {
    /// Whether runs of adjacent literal elements also have to occur at consecutive positions.
    /// Reduces the number of candidates, does not change the results.
    pub positional: bool,
    /// Confirm at most this many candidates, in ascending ID order.
    pub max_candidates: Option<usize>,
}

/// Searches an index for matches of pattern rules.
#[derive(Debug, Clone, Default)]
pub struct Searcher {
    options: SearcherOptions,
}

impl Searcher {
    pub fn new(options: SearcherOptions) -> Self {
        Searcher { options }
    }

    pub fn options(&self) -> &SearcherOptions {
        &self.options
    }

    /// The query used to retrieve candidates for this rule.
    pub fn query(&self, rule: &PatternRule, lang_code: &str) -> Query {
        compile(rule, lang_code, &self.options)
    }

    /// Finds all sentences in `lang_code` in which the rule matches, in ascending ID order.
    /// Sentences without a match are not returned.
    ///
    /// # Errors
    /// - If the index can not be searched. Sentences which fail confirmation are logged and left out.
    pub fn find_rule_matches<R: IndexReader>(
        &self,
        rule: &PatternRule,
        lang_code: &str,
        reader: &R,
    ) -> Result<Vec<MatchingSentence>, Error> {
        if UniCase::new(rule.lang_code()) != UniCase::new(lang_code.trim()) {
            warn!(
                "rule {} is for language {:?}, searching sentences in {:?}",
                rule.id(),
                rule.lang_code(),
                lang_code
            );
        }

        let query = self.query(rule, lang_code);
        if let Query::Term(Term {
            field: Field::Lang, ..
        }) = query
        {
            info!("no element of {} restricts the candidates, scanning all sentences", rule.id());
        }

        self.find_matches_with(&Engine::new(rule), &query, reader)
    }

    /// Confirms the candidates retrieved by `query` with an arbitrary matcher.
    ///
    /// The query must match every sentence the matcher can match in, otherwise matches are missed.
    pub fn find_matches_with<M: PatternMatcher, R: IndexReader>(
        &self,
        matcher: &M,
        query: &Query,
        reader: &R,
    ) -> Result<Vec<MatchingSentence>, Error> {
        debug!("searching {} with query {}", matcher.rule_id(), query);

        let mut candidates = reader.search(query)?;

        if let Some(max) = self.options.max_candidates {
            if candidates.len() > max {
                info!(
                    "confirming {} of {} candidates for {}",
                    max,
                    candidates.len(),
                    matcher.rule_id()
                );
                candidates.truncate(max);
            }
        }

        let sentences = candidates
            .into_iter()
            .map(|id| reader.fetch(id))
            .collect::<Result<Vec<Sentence>, Error>>()?;

        let results: Vec<Option<MatchingSentence>> = sentences
            .maybe_par_iter()
            .map(|sentence| match matcher.find_matches(sentence) {
                Ok(matches) if matches.is_empty() => None,
                Ok(matches) => Some(MatchingSentence::new(sentence.clone(), matches)),
                Err(error) => {
                    warn!("skipping sentence {}: {}", sentence.id(), error);
                    None
                }
            })
            .collect();

        let results: Vec<_> = results.into_iter().flatten().collect();
        debug!(
            "{} of {} candidates matched {}",
            results.len(),
            sentences.len(),
            matcher.rule_id()
        );

        Ok(results)
    }
}
