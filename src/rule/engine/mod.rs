//! The exact matcher which decides whether (and where) a rule matches a sentence.

use crate::{
    rule::PatternRule,
    types::{Match, Sentence, Token},
    Error,
};

pub mod composition;

use composition::{Composition, MatchGraph};

/// Finds the matches of one rule in a sentence.
pub trait PatternMatcher: Send + Sync {
    /// The ID of the rule this matcher evaluates.
    fn rule_id(&self) -> &str;

    /// Returns the maximal matches in the sentence, ordered by start.
    /// Matches may overlap, but no match lies within another one.
    ///
    /// # Errors
    /// - If the sentence can not be evaluated, e. g. because it is malformed.
    fn find_matches(&self, sentence: &Sentence) -> Result<Vec<Match>, Error>;
}

/// The default [PatternMatcher], built from the elements of a [PatternRule].
#[derive(Debug, Clone)]
pub struct Engine {
    rule_id: String,
    message: String,
    composition: Composition,
    /// Indices of the visible parts of marked elements.
    marked_parts: Vec<usize>,
    antipatterns: Vec<Composition>,
}

fn visible_parts(composition: &Composition) -> Vec<usize> {
    composition
        .parts
        .iter()
        .enumerate()
        .filter(|(_, part)| part.visible)
        .map(|(i, _)| i)
        .collect()
}

impl Engine {
    pub fn new(rule: &PatternRule) -> Self {
        let (composition, element_to_part) = Composition::from_elements(rule.elements());

        let marked_parts = rule
            .elements()
            .iter()
            .zip(element_to_part)
            .filter(|(element, _)| element.marked)
            .map(|(_, part)| part)
            .collect();

        Engine {
            rule_id: rule.id().to_string(),
            message: rule.message().to_string(),
            composition,
            marked_parts,
            antipatterns: rule
                .antipatterns()
                .iter()
                .map(|elements| Composition::from_elements(elements).0)
                .collect(),
        }
    }

    /// The token ranges of all antipattern matches in the tokens.
    fn blocked_spans(&self, tokens: &[Token]) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();

        for antipattern in &self.antipatterns {
            let visible = visible_parts(antipattern);
            let mut reaches = antipattern.reaches(tokens);

            for start in 0..tokens.len() {
                if let Some(graph) = antipattern.apply_with(tokens, start, &mut reaches) {
                    spans.extend(self.span(&graph, &mut visible.iter().copied()));
                }
            }
        }

        spans
    }

    /// The token range of the visible groups in `parts`, if any of them consumed a token.
    fn span(&self, graph: &MatchGraph, parts: &mut dyn Iterator<Item = usize>) -> Option<(usize, usize)> {
        let mut span: Option<(usize, usize)> = None;

        for group in parts.map(|i| graph.by_index(i)).filter(|x| !x.is_empty()) {
            let range = &group.token_range;
            span = Some(span.map_or((range.start, range.end), |(start, end)| {
                (start.min(range.start), end.max(range.end))
            }));
        }

        span
    }

    fn check(&self, sentence: &Sentence) -> Result<(), Error> {
        for (i, token) in sentence.tokens().iter().enumerate() {
            if token.position != i {
                return Err(Error::Confirmation {
                    id: sentence.id(),
                    reason: format!(
                        "token {:?} has position {}, expected {}",
                        token.text, token.position, i
                    ),
                });
            }
        }

        Ok(())
    }
}

impl PatternMatcher for Engine {
    fn rule_id(&self) -> &str {
        &self.rule_id
    }

    fn find_matches(&self, sentence: &Sentence) -> Result<Vec<Match>, Error> {
        self.check(sentence)?;
        let tokens = sentence.tokens();

        let visible = visible_parts(&self.composition);
        let blocked = self.blocked_spans(tokens);

        let mut reaches = self.composition.reaches(tokens);

        // (full span, reported span) of the longest match at every start position
        let mut candidates: Vec<((usize, usize), (usize, usize))> = (0..tokens.len())
            .filter_map(|start| {
                let graph = self.composition.apply_with(tokens, start, &mut reaches)?;
                let full = self.span(&graph, &mut visible.iter().copied())?;
                if blocked.iter().any(|(from, to)| *from < full.1 && full.0 < *to) {
                    return None;
                }
                let reported = self
                    .span(&graph, &mut self.marked_parts.iter().copied())
                    .unwrap_or(full);

                Some((full, reported))
            })
            .collect();

        candidates.sort_by(|(a, _), (b, _)| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

        let mut covered_until = 0;
        let mut matches = Vec::new();

        // sorted by start, so a span lies within an earlier one iff it does not end later
        for ((_, end), (reported_start, reported_end)) in candidates {
            if end <= covered_until {
                continue;
            }
            covered_until = end;

            matches.push(Match {
                rule_id: self.rule_id.clone(),
                token_range: reported_start..reported_end,
                char_range: tokens[reported_start].char_span.0..tokens[reported_end - 1].char_span.1,
                message: self.message.clone(),
            });
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rule::Element,
        types::{AnnotatedSentence, Token},
    };

    fn sentence(text: &str) -> Sentence {
        let mut char_start = 0;
        let tokens = text
            .split(' ')
            .enumerate()
            .map(|(i, word)| {
                let start = char_start;
                char_start += word.chars().count() + 1;

                Token {
                    text: word.to_string(),
                    lemma: None,
                    pos: None,
                    position: i,
                    has_space_before: i > 0,
                    char_span: (start, start + word.chars().count()),
                }
            })
            .collect();

        Sentence::new(0, "en", AnnotatedSentence::new(text.to_string(), tokens))
    }

    fn literal(text: &str) -> Element {
        Element::new(text, false, false, false).unwrap()
    }

    fn rule(elements: Vec<Element>) -> PatternRule {
        PatternRule::new("TEST", "en", elements, "desc", "msg", "short").unwrap()
    }

    #[test]
    fn keeps_overlapping_maximal_matches() {
        let engine = Engine::new(&rule(vec![Element::any(), literal("b")]));
        let sentence = sentence("a b b");

        let matches = engine.find_matches(&sentence).unwrap();
        assert_eq!(
            matches.iter().map(|x| x.token_range.clone()).collect::<Vec<_>>(),
            vec![0..2, 1..3]
        );
        assert_eq!(matches[1].text(&sentence), "b b");
    }

    #[test]
    fn drops_matches_within_other_matches() {
        let engine = Engine::new(&rule(vec![
            literal("back").with_skip(0, None),
            literal("and"),
        ]));

        // "back and" at 2..4 lies within 0..4
        let matches = engine.find_matches(&sentence("back or back and")).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token_range, 0..4);
    }

    #[test]
    fn antipatterns_suppress_overlapping_matches() {
        let rule = rule(vec![literal("eye"), literal("lid")])
            .with_antipatterns(vec![vec![literal("lid"), literal("lifter")], Vec::new()]);
        let engine = Engine::new(&rule);
        assert_eq!(rule.antipatterns().len(), 1);

        assert!(engine.find_matches(&sentence("eye lid lifter")).unwrap().is_empty());

        let matches = engine.find_matches(&sentence("eye lid and lid lifter")).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token_range, 0..2);
    }

    #[test]
    fn finds_all_non_overlapping_matches() {
        let engine = Engine::new(&rule(vec![literal("back"), literal("and")]));
        let sentence = sentence("back and back and forth");

        let matches = engine.find_matches(&sentence).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].token_range, 0..2);
        assert_eq!(matches[1].token_range, 2..4);
        assert_eq!(matches[1].char_range, 9..17);
        assert_eq!(matches[1].text(&sentence), "back and");
        assert_eq!(matches[0].rule_id(), "TEST");
        assert_eq!(matches[0].message, "msg");
    }

    #[test]
    fn wrong_order_does_not_match() {
        let engine = Engine::new(&rule(vec![literal("back"), literal("move")]));

        assert!(engine
            .find_matches(&sentence("How to move back and fourth"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reports_marked_span() {
        let engine = Engine::new(&rule(vec![
            literal("back"),
            literal("and"),
            literal("fourth").marked(true),
        ]));
        let sentence = sentence("move back and fourth from linux");

        let matches = engine.find_matches(&sentence).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token_range, 3..4);
        assert_eq!(matches[0].text(&sentence), "fourth");
    }

    #[test]
    fn trailing_skip_is_not_part_of_the_match() {
        let engine = Engine::new(&rule(vec![
            literal("back").with_skip(0, None),
            literal("forth").optional(),
        ]));

        let matches = engine.find_matches(&sentence("back and fourth")).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token_range, 0..1);
    }

    #[test]
    fn all_optional_rule_never_yields_empty_matches() {
        let engine = Engine::new(&rule(vec![literal("xmb").optional()]));

        assert!(engine.find_matches(&sentence("from linux")).unwrap().is_empty());
        assert_eq!(engine.find_matches(&sentence("to xmb")).unwrap().len(), 1);
    }

    #[test]
    fn malformed_sentences_are_rejected() {
        let mut tokens = sentence("back and").tokens().to_vec();
        tokens[1].position = 5;
        let malformed = Sentence::new(3, "en", AnnotatedSentence::new("back and".into(), tokens));

        let engine = Engine::new(&rule(vec![literal("back")]));
        assert!(matches!(
            engine.find_matches(&malformed),
            Err(Error::Confirmation { id: 3, .. })
        ));
    }
}
