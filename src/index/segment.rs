use super::query::{Field, Term};
use crate::{
    types::{DocId, Sentence},
    utils,
};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Posting {
    pub doc: DocId,
    pub positions: Vec<u32>,
}

/// All terms of a sentence. Token level terms carry the token position, document level terms do not.
pub(crate) fn sentence_terms(sentence: &Sentence) -> Vec<(Term, Option<u32>)> {
    let mut terms = vec![(Term::new(Field::Lang, sentence.lang_code()), None)];

    for token in sentence.tokens() {
        let position = Some(token.position as u32);
        let lemma = token.lemma_or_text();

        terms.push((Term::new(Field::Surface, token.text.as_str()), position));
        terms.push((Term::new(Field::SurfaceFolded, utils::fold(&token.text)), position));
        terms.push((Term::new(Field::Lemma, lemma), position));
        terms.push((Term::new(Field::LemmaFolded, utils::fold(lemma)), position));

        if let Some(pos) = &token.pos {
            terms.push((Term::new(Field::Pos, pos.as_str()), position));
        }
    }

    terms
}

/// Sentence documents and the inverted index over their terms.
/// Documents are kept ordered by ID, so postings lists are sorted too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Segment {
    docs: Vec<Sentence>,
    postings: FnvHashMap<Term, Vec<Posting>>,
}

impl Segment {
    pub fn from_sentence(sentence: Sentence) -> Self {
        let mut segment = Segment::default();
        segment.add(sentence);
        segment
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// The ID the next added document must have.
    pub fn next_doc_id(&self) -> DocId {
        self.docs.last().map_or(0, |x| x.id() + 1)
    }

    /// Adds a sentence. Its ID must be greater than the ID of every sentence added before.
    pub fn add(&mut self, sentence: Sentence) {
        assert!(
            self.docs.last().map_or(true, |x| x.id() < sentence.id()),
            "document ids must be added in increasing order"
        );
        let doc = sentence.id();

        for (term, position) in sentence_terms(&sentence) {
            let postings = self.postings.entry(term).or_insert_with(Vec::new);

            match postings.last_mut() {
                Some(posting) if posting.doc == doc => posting.positions.extend(position),
                _ => postings.push(Posting {
                    doc,
                    positions: position.into_iter().collect(),
                }),
            }
        }

        self.docs.push(sentence);
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.docs.iter().map(|x| x.id()).collect()
    }

    pub fn get(&self, id: DocId) -> Option<&Sentence> {
        self.docs
            .binary_search_by_key(&id, |x| x.id())
            .ok()
            .map(|i| &self.docs[i])
    }

    pub fn postings<'a>(&'a self, term: &Term) -> impl Iterator<Item = &'a Posting> + 'a {
        self.postings
            .get(term)
            .map(|x| x.as_slice())
            .unwrap_or(&[])
            .iter()
    }

    pub fn positions(&self, term: &Term, doc: DocId) -> Vec<u32> {
        self.postings
            .get(term)
            .and_then(|postings| {
                postings
                    .binary_search_by_key(&doc, |x| x.doc)
                    .ok()
                    .map(|i| postings[i].positions.clone())
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotatedSentence, Token};

    fn token(text: &str, lemma: Option<&str>, pos: Option<&str>, position: usize) -> Token {
        Token {
            text: text.to_string(),
            lemma: lemma.map(|x| x.to_string()),
            pos: pos.map(|x| x.to_string()),
            position,
            has_space_before: position > 0,
            char_span: (0, 0),
        }
    }

    #[test]
    fn indexes_all_token_facets() {
        let sentence = Sentence::new(
            4,
            "EN",
            AnnotatedSentence::new(
                "Eye lids".into(),
                vec![
                    token("Eye", None, Some("NN"), 0),
                    token("lids", Some("lid"), Some("NNS"), 1),
                ],
            ),
        );
        let segment = Segment::from_sentence(sentence);

        let positions = |field, text: &str| segment.positions(&Term::new(field, text), 4);

        assert_eq!(positions(Field::Surface, "Eye"), vec![0]);
        assert_eq!(positions(Field::SurfaceFolded, "eye"), vec![0]);
        assert_eq!(positions(Field::Lemma, "Eye"), vec![0]);
        assert_eq!(positions(Field::Lemma, "lid"), vec![1]);
        assert_eq!(positions(Field::LemmaFolded, "lid"), vec![1]);
        assert_eq!(positions(Field::Pos, "NNS"), vec![1]);
        assert!(positions(Field::Surface, "lid").is_empty());
        assert_eq!(segment.postings(&Term::new(Field::Lang, "en")).count(), 1);
    }

    #[test]
    fn repeated_terms_share_a_posting() {
        let sentence = Sentence::new(
            0,
            "en",
            AnnotatedSentence::new(
                "back and back".into(),
                vec![
                    token("back", None, None, 0),
                    token("and", None, None, 1),
                    token("back", None, None, 2),
                ],
            ),
        );
        let segment = Segment::from_sentence(sentence);

        assert_eq!(segment.postings(&Term::new(Field::Surface, "back")).count(), 1);
        assert_eq!(segment.positions(&Term::new(Field::Surface, "back"), 0), vec![0, 2]);
        assert_eq!(segment.next_doc_id(), 1);
        assert!(segment.get(0).is_some());
        assert!(segment.get(1).is_none());
    }
}
