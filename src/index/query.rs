//! Queries against the token fields of an [Index][super::Index].

use super::segment::Segment;
use crate::types::{DocId, Sentence};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Range};

/// A searchable field of a sentence document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    /// The surface form, case preserved.
    Surface,
    /// The surface form, case folded.
    SurfaceFolded,
    /// The lemma (or the surface form if the token has no lemma), case preserved.
    Lemma,
    /// The lemma, case folded.
    LemmaFolded,
    /// The part-of-speech tag.
    Pos,
    /// The language code of the sentence. Document level, has no positions.
    Lang,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Surface => "surface",
            Field::SurfaceFolded => "surface_folded",
            Field::Lemma => "lemma",
            Field::LemmaFolded => "lemma_folded",
            Field::Pos => "pos",
            Field::Lang => "lang",
        }
    }
}

/// A term of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    pub field: Field,
    pub text: String,
}

impl Term {
    pub fn new<S: Into<String>>(field: Field, text: S) -> Self {
        Term {
            field,
            text: text.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.field.name(), self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Matches every document.
    All,
    Term(Term),
    /// Matches documents matching all subqueries. Empty conjunctions match everything.
    And(Vec<Query>),
    /// Matches documents matching any subquery. Empty disjunctions match nothing.
    Or(Vec<Query>),
    /// Matches documents where the slots occur at consecutive token positions.
    /// A slot matches a token if any of its terms does.
    Phrase(Vec<Vec<Term>>),
    /// Matches documents where the term occurs at a token position in `range`.
    /// Document level terms have no positions and never match.
    Position { term: Term, range: Range<u32> },
}

impl Query {
    pub fn term<S: Into<String>>(field: Field, text: S) -> Self {
        Query::Term(Term::new(field, text))
    }

    /// Conjunction which drops `All` clauses and flattens a single clause.
    pub fn and(clauses: Vec<Query>) -> Self {
        let mut clauses: Vec<_> = clauses
            .into_iter()
            .filter(|x| !matches!(x, Query::All))
            .collect();

        match clauses.len() {
            0 => Query::All,
            1 => clauses.remove(0),
            _ => Query::And(clauses),
        }
    }

    /// Disjunction which is `All` as soon as one clause is.
    pub fn or(mut clauses: Vec<Query>) -> Self {
        if clauses.iter().any(|x| matches!(x, Query::All)) {
            return Query::All;
        }

        match clauses.len() {
            1 => clauses.remove(0),
            _ => Query::Or(clauses),
        }
    }

    /// Matches documents with `term` at exactly `position`.
    pub fn at_position(term: Term, position: u32) -> Self {
        Query::Position {
            term,
            range: position..position + 1,
        }
    }

    /// Whether this query matches every document.
    pub fn is_all(&self) -> bool {
        matches!(self, Query::All)
    }

    /// Whether a single sentence would be returned by this query.
    /// Terms are extracted exactly like the index extracts them when the sentence is added.
    pub fn is_match_sentence(&self, sentence: &Sentence) -> bool {
        let segment = Segment::from_sentence(sentence.clone());
        !self.evaluate(&segment).is_empty()
    }

    /// The sorted IDs of all documents in the segment matching this query.
    pub(crate) fn evaluate(&self, segment: &Segment) -> Vec<DocId> {
        match self {
            Query::All => segment.doc_ids(),
            Query::Term(term) => segment.postings(term).map(|x| x.doc).collect(),
            Query::And(clauses) => {
                let mut iter = clauses.iter();
                let mut docs = match iter.next() {
                    Some(first) => first.evaluate(segment),
                    None => return segment.doc_ids(),
                };

                for clause in iter {
                    if docs.is_empty() {
                        break;
                    }
                    docs = intersect(&docs, &clause.evaluate(segment));
                }

                docs
            }
            Query::Or(clauses) => clauses
                .iter()
                .map(|x| x.evaluate(segment))
                .kmerge()
                .dedup()
                .collect(),
            Query::Phrase(slots) => evaluate_phrase(slots, segment),
            Query::Position { term, range } => segment
                .postings(term)
                .filter(|posting| posting.positions.iter().any(|x| range.contains(x)))
                .map(|posting| posting.doc)
                .collect(),
        }
    }
}

fn intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            i += 1;
        } else if a[i] > b[j] {
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
            j += 1;
        }
    }

    out
}

fn evaluate_phrase(slots: &[Vec<Term>], segment: &Segment) -> Vec<DocId> {
    if slots.is_empty() {
        return segment.doc_ids();
    }

    // documents containing every slot somewhere
    let docs = Query::and(
        slots
            .iter()
            .map(|slot| Query::Or(slot.iter().cloned().map(Query::Term).collect()))
            .collect(),
    )
    .evaluate(segment);

    docs.into_iter()
        .filter(|doc| {
            let positions: Vec<Vec<u32>> = slots
                .iter()
                .map(|slot| {
                    slot.iter()
                        .flat_map(|term| segment.positions(term, *doc))
                        .sorted()
                        .dedup()
                        .collect()
                })
                .collect();

            positions[0].iter().any(|start| {
                positions[1..]
                    .iter()
                    .enumerate()
                    .all(|(offset, slot)| slot.binary_search(&(start + offset as u32 + 1)).is_ok())
            })
        })
        .collect()
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::All => write!(f, "*"),
            Query::Term(term) => write!(f, "{}", term),
            Query::And(clauses) => write!(f, "({})", clauses.iter().join(" AND ")),
            Query::Or(clauses) => write!(f, "({})", clauses.iter().join(" OR ")),
            Query::Phrase(slots) => write!(
                f,
                "\"{}\"",
                slots
                    .iter()
                    .map(|slot| slot.iter().join("|"))
                    .join(" ")
            ),
            Query::Position { term, range } => {
                write!(f, "{}@{}..{}", term, range.start, range.end)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotatedSentence, Token};

    fn sentence(id: DocId, text: &str) -> Sentence {
        let tokens = text
            .split(' ')
            .enumerate()
            .map(|(i, word)| Token {
                text: word.to_string(),
                lemma: None,
                pos: None,
                position: i,
                has_space_before: i > 0,
                char_span: (0, 0),
            })
            .collect();

        Sentence::new(id, "en", AnnotatedSentence::new(text.to_string(), tokens))
    }

    fn segment() -> Segment {
        let mut segment = Segment::default();
        segment.add(sentence(0, "How to move back and fourth"));
        segment.add(sentence(1, "Calcium deposits on eye lid"));
        segment.add(sentence(2, "back and back"));
        segment
    }

    #[test]
    fn evaluates_boolean_queries() {
        let segment = segment();

        let back = Query::term(Field::Surface, "back");
        let eye = Query::term(Field::Surface, "eye");

        assert_eq!(back.evaluate(&segment), vec![0, 2]);
        assert_eq!(Query::and(vec![back.clone(), eye.clone()]).evaluate(&segment), Vec::<DocId>::new());
        assert_eq!(Query::or(vec![back, eye]).evaluate(&segment), vec![0, 1, 2]);
        assert_eq!(Query::All.evaluate(&segment), vec![0, 1, 2]);
        assert_eq!(Query::Or(Vec::new()).evaluate(&segment), Vec::<DocId>::new());
    }

    #[test]
    fn folded_fields_ignore_case() {
        let segment = segment();

        assert_eq!(Query::term(Field::Surface, "how").evaluate(&segment), Vec::<DocId>::new());
        assert_eq!(Query::term(Field::SurfaceFolded, "how").evaluate(&segment), vec![0]);
    }

    #[test]
    fn evaluates_phrases() {
        let segment = segment();
        let slot = |text: &str| vec![Term::new(Field::Surface, text)];

        let phrase = Query::Phrase(vec![slot("move"), slot("back")]);
        assert_eq!(phrase.evaluate(&segment), vec![0]);

        let phrase = Query::Phrase(vec![slot("back"), slot("move")]);
        assert_eq!(phrase.evaluate(&segment), Vec::<DocId>::new());

        let phrase = Query::Phrase(vec![slot("and"), vec![Term::new(Field::Surface, "fourth"), Term::new(Field::Surface, "back")]]);
        assert_eq!(phrase.evaluate(&segment), vec![0, 2]);
    }

    #[test]
    fn evaluates_positions() {
        let segment = segment();
        let back = Term::new(Field::Surface, "back");

        assert_eq!(Query::at_position(back.clone(), 3).evaluate(&segment), vec![0]);
        assert_eq!(Query::at_position(back.clone(), 2).evaluate(&segment), vec![2]);
        assert_eq!(Query::at_position(back.clone(), 1).evaluate(&segment), Vec::<DocId>::new());

        let range = |range: Range<u32>| Query::Position {
            term: back.clone(),
            range,
        };
        assert_eq!(range(0..3).evaluate(&segment), vec![2]);
        assert_eq!(range(0..4).evaluate(&segment), vec![0, 2]);
        assert_eq!(range(4..10).evaluate(&segment), Vec::<DocId>::new());

        // document level terms have no positions
        let lang = Query::at_position(Term::new(Field::Lang, "en"), 0);
        assert_eq!(lang.evaluate(&segment), Vec::<DocId>::new());
        assert_eq!(range(0..4).to_string(), "surface:\"back\"@0..4");
    }

    #[test]
    fn simplifies_conjunctions() {
        assert_eq!(Query::and(vec![Query::All, Query::All]), Query::All);
        assert_eq!(
            Query::and(vec![Query::All, Query::term(Field::Pos, "NN")]),
            Query::term(Field::Pos, "NN")
        );
        assert!(Query::or(vec![Query::All, Query::term(Field::Pos, "NN")]).is_all());
    }

    #[test]
    fn matches_single_sentences() {
        let query = Query::and(vec![
            Query::term(Field::SurfaceFolded, "eye"),
            Query::term(Field::Lang, "en"),
        ]);

        assert!(query.is_match_sentence(&sentence(7, "Calcium deposits on Eye lid")));
        assert!(!query.is_match_sentence(&sentence(7, "back and fourth")));
    }

    #[test]
    fn displays_queries() {
        let query = Query::and(vec![
            Query::term(Field::SurfaceFolded, "back"),
            Query::term(Field::Lang, "en"),
        ]);

        assert_eq!(query.to_string(), "(surface_folded:\"back\" AND lang:\"en\")");
    }
}
