//! Derives an index query from a pattern rule.
//!
//! The query must match every sentence the [Engine][crate::rule::engine::Engine] can match in,
//! so an element only contributes a clause if each match of the rule needs a token satisfying it.

use super::SearcherOptions;
use crate::{
    index::{Field, Query, Term},
    rule::{Constraint, Element, PatternRule},
    utils,
};

/// Terms for the text of a constraint, one of which every matching token has.
fn text_terms(constraint: &Constraint) -> Option<Vec<Term>> {
    let pattern = constraint.text.as_ref()?;
    let literals = pattern.literals()?;
    let case_sensitive = pattern.is_case_sensitive(constraint.case_sensitive);

    let field = match (constraint.inflected, case_sensitive) {
        (true, true) => Field::Lemma,
        (true, false) => Field::LemmaFolded,
        (false, true) => Field::Surface,
        (false, false) => Field::SurfaceFolded,
    };

    Some(
        literals
            .into_iter()
            .map(|literal| {
                if case_sensitive {
                    Term::new(field, literal)
                } else {
                    Term::new(field, utils::fold(literal))
                }
            })
            .collect(),
    )
}

fn pos_terms(constraint: &Constraint) -> Option<Vec<Term>> {
    if constraint.negate_pos {
        return None;
    }

    let literals = constraint.pos.as_ref()?.literals()?;
    Some(literals.into_iter().map(|x| Term::new(Field::Pos, x)).collect())
}

/// The term sets of an element. Each set must be hit by the token matching the element.
fn element_terms(element: &Element) -> Vec<Vec<Term>> {
    // negation and optional elements do not need a token with known terms
    if !element.is_required() || element.constraint.negate {
        return Vec::new();
    }

    text_terms(&element.constraint)
        .into_iter()
        .chain(pos_terms(&element.constraint))
        .collect()
}

fn disjunction(terms: Vec<Term>) -> Query {
    Query::or(terms.into_iter().map(Query::Term).collect())
}

fn end_run(phrases: &mut Vec<Vec<Vec<Term>>>, current: &mut Vec<Vec<Term>>) {
    if current.len() > 1 {
        phrases.push(std::mem::take(current));
    }
    current.clear();
}

/// Runs of elements which must match consecutive tokens. Only elements with terms take part.
fn phrases(elements: &[Element]) -> Vec<Vec<Vec<Term>>> {
    let mut phrases = Vec::new();
    let mut current: Vec<Vec<Term>> = Vec::new();

    for (i, element) in elements.iter().enumerate() {
        let slot = element_terms(element).into_iter().next();

        match slot {
            Some(slot) => current.push(slot),
            None => {
                end_run(&mut phrases, &mut current);
                continue;
            }
        }

        // the next element starts right after this one only if this one consumes exactly one token
        let is_last = i + 1 == elements.len();
        let exactly_one = element.quantifier.min == 1 && element.quantifier.max == 1;
        if is_last || !exactly_one || !element.skip.is_adjacent() {
            end_run(&mut phrases, &mut current);
        }
    }

    phrases
}

/// Compiles the elements of a rule into a query, independent of language.
/// Returns [Query::All] if no element yields a clause.
pub fn compile_rule(rule: &PatternRule, options: &SearcherOptions) -> Query {
    let mut clauses: Vec<Query> = rule
        .elements()
        .iter()
        .flat_map(element_terms)
        .map(disjunction)
        .collect();

    if options.positional {
        clauses.extend(phrases(rule.elements()).into_iter().map(Query::Phrase));
    }

    Query::and(clauses)
}

/// Compiles a rule into a query for sentences in one language.
/// Every sentence the rule matches in is found by this query.
pub fn compile(rule: &PatternRule, lang_code: &str, options: &SearcherOptions) -> Query {
    Query::and(vec![
        Query::term(Field::Lang, utils::normalize_lang_code(lang_code)),
        compile_rule(rule, options),
    ])
}
