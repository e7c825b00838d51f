use crate::{
    rule::{Constraint, Element, Quantifier, TextPattern},
    types::Token,
    utils::{self, regex::SerializeRegex},
};
use either::Either;
use enum_dispatch::enum_dispatch;
use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matcher {
    matcher: Either<FnvHashSet<String>, SerializeRegex>,
    case_sensitive: bool,
}

impl Matcher {
    pub fn new(pattern: &TextPattern, case_sensitive: bool) -> Self {
        let case_sensitive = pattern.is_case_sensitive(case_sensitive);

        let matcher = match pattern.literals() {
            // literal sets are compared exactly like the index compares terms, see `utils::fold`
            Some(literals) => Either::Left(
                literals
                    .into_iter()
                    .map(|x| {
                        if case_sensitive {
                            x.to_string()
                        } else {
                            utils::fold(x)
                        }
                    })
                    .collect(),
            ),
            None => match pattern {
                TextPattern::Regex(regex) => Either::Right(regex.clone()),
                TextPattern::Literal(string) => Either::Left(Some(string.clone()).into_iter().collect()),
            },
        };

        Matcher {
            matcher,
            case_sensitive,
        }
    }

    pub fn is_match(&self, input: &str) -> bool {
        match &self.matcher {
            Either::Left(set) => {
                if self.case_sensitive {
                    set.contains(input)
                } else {
                    set.contains(&utils::fold(input))
                }
            }
            Either::Right(regex) => regex.is_match(input),
        }
    }
}

#[enum_dispatch]
pub trait Atomable: Send + Sync {
    fn is_match(&self, input: &[Token], position: usize) -> bool;
}

#[enum_dispatch(Atomable)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Atom {
    TextAtom(concrete::TextAtom),
    LemmaAtom(concrete::LemmaAtom),
    PosAtom(concrete::PosAtom),
    TrueAtom,
    FalseAtom,
    AndAtom,
    OrAtom,
    NotAtom,
}

pub mod concrete {
    use super::{Atomable, Matcher, Token};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TextAtom {
        matcher: Matcher,
    }

    impl Atomable for TextAtom {
        fn is_match(&self, input: &[Token], position: usize) -> bool {
            self.matcher.is_match(&input[position].text)
        }
    }

    impl TextAtom {
        pub fn new(matcher: Matcher) -> Self {
            TextAtom { matcher }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LemmaAtom {
        matcher: Matcher,
    }

    impl Atomable for LemmaAtom {
        fn is_match(&self, input: &[Token], position: usize) -> bool {
            self.matcher.is_match(input[position].lemma_or_text())
        }
    }

    impl LemmaAtom {
        pub fn new(matcher: Matcher) -> Self {
            LemmaAtom { matcher }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PosAtom {
        matcher: Matcher,
    }

    impl Atomable for PosAtom {
        fn is_match(&self, input: &[Token], position: usize) -> bool {
            input[position]
                .pos
                .as_ref()
                .map_or(false, |pos| self.matcher.is_match(pos))
        }
    }

    impl PosAtom {
        pub fn new(matcher: Matcher) -> Self {
            PosAtom { matcher }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrueAtom {}

impl Atomable for TrueAtom {
    fn is_match(&self, _input: &[Token], _position: usize) -> bool {
        true
    }
}

impl TrueAtom {
    pub fn new() -> Self {
        TrueAtom {}
    }
}

impl Default for TrueAtom {
    fn default() -> Self {
        TrueAtom::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FalseAtom {}

impl Atomable for FalseAtom {
    fn is_match(&self, _input: &[Token], _position: usize) -> bool {
        false
    }
}

impl FalseAtom {
    pub fn new() -> Self {
        FalseAtom {}
    }
}

impl Default for FalseAtom {
    fn default() -> Self {
        FalseAtom::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndAtom {
    atoms: Vec<Atom>,
}

impl AndAtom {
    pub fn and(atoms: Vec<Atom>) -> Atom {
        let mut atoms: Vec<_> = atoms
            .into_iter()
            .filter(|x| !matches!(x, Atom::TrueAtom { .. }))
            .collect();

        if atoms.is_empty() {
            (TrueAtom {}).into()
        } else if atoms.len() == 1 {
            atoms.remove(0)
        } else {
            (AndAtom { atoms }).into()
        }
    }
}

impl Atomable for AndAtom {
    fn is_match(&self, input: &[Token], position: usize) -> bool {
        self.atoms.iter().all(|x| x.is_match(input, position))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrAtom {
    atoms: Vec<Atom>,
}

impl OrAtom {
    pub fn or(atoms: Vec<Atom>) -> Atom {
        let mut atoms: Vec<_> = atoms
            .into_iter()
            .filter(|x| !matches!(x, Atom::FalseAtom { .. }))
            .collect();

        if atoms.is_empty() {
            (FalseAtom {}).into()
        } else if atoms.len() == 1 {
            atoms.remove(0)
        } else {
            (OrAtom { atoms }).into()
        }
    }
}

impl Atomable for OrAtom {
    fn is_match(&self, input: &[Token], position: usize) -> bool {
        self.atoms.iter().any(|x| x.is_match(input, position))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotAtom {
    atom: Box<Atom>,
}

impl NotAtom {
    pub fn not(atom: Atom) -> Atom {
        match atom {
            Atom::TrueAtom { .. } => FalseAtom::new().into(),
            Atom::FalseAtom { .. } => TrueAtom::new().into(),
            x => (NotAtom { atom: Box::new(x) }).into(),
        }
    }
}

impl Atomable for NotAtom {
    fn is_match(&self, input: &[Token], position: usize) -> bool {
        !self.atom.is_match(input, position)
    }
}

/// Builds the atom which checks one token against a constraint.
pub fn constraint_atom(constraint: &Constraint) -> Atom {
    let mut atoms = Vec::new();

    if let Some(text) = &constraint.text {
        let matcher = Matcher::new(text, constraint.case_sensitive);
        let atom: Atom = if constraint.inflected {
            concrete::LemmaAtom::new(matcher).into()
        } else {
            concrete::TextAtom::new(matcher).into()
        };

        atoms.push(if constraint.negate {
            NotAtom::not(atom)
        } else {
            atom
        });
    }

    if let Some(pos) = &constraint.pos {
        let atom: Atom = concrete::PosAtom::new(Matcher::new(pos, true)).into();

        atoms.push(if constraint.negate_pos {
            NotAtom::not(atom)
        } else {
            atom
        });
    }

    AndAtom::and(atoms)
}

/// Builds the atom for an element: its constraint holds and none of its exceptions do.
pub fn element_atom(element: &Element) -> Atom {
    let exceptions = element
        .exceptions
        .iter()
        .filter(|x| !x.is_trivial())
        .map(constraint_atom)
        .collect();

    AndAtom::and(vec![
        constraint_atom(&element.constraint),
        NotAtom::not(OrAtom::or(exceptions)),
    ])
}

/// The tokens consumed by one part of a composition.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Group {
    pub token_range: Range<usize>,
}

impl Group {
    pub fn is_empty(&self) -> bool {
        self.token_range.start >= self.token_range.end
    }
}

/// The groups of one successful application of a [Composition], one per part.
#[derive(Debug, Clone)]
pub struct MatchGraph {
    groups: Vec<Group>,
}

impl MatchGraph {
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn by_index(&self, index: usize) -> &Group {
        &self.groups[index]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub atom: Atom,
    pub quantifier: Quantifier,
    /// Gap parts created for skips are not visible.
    pub visible: bool,
}

impl Part {
    pub fn new(atom: Atom, quantifier: Quantifier, visible: bool) -> Self {
        Part {
            atom,
            quantifier,
            visible,
        }
    }
}

// `None`: the rest of the composition can not match from here.
// `Some(None)`: it matches without consuming a visible token.
// `Some(Some(end))`: it matches and the last visible token ends at `end`.
type Reach = Option<Option<usize>>;

/// The memoised reach of every part at every position of one sentence.
/// It does not depend on where a match starts, so one table serves all starts.
#[derive(Debug, Clone)]
pub struct Reaches {
    memo: Vec<Vec<Option<Reach>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
    pub parts: Vec<Part>,
}

impl Composition {
    pub fn new(parts: Vec<Part>) -> Self {
        Composition { parts }
    }

    /// Builds the composition for a sequence of elements. Skips become invisible gap parts.
    pub fn from_elements(elements: &[Element]) -> (Self, Vec<usize>) {
        let mut parts = Vec::new();
        let mut element_to_part = Vec::new();

        for (i, element) in elements.iter().enumerate() {
            element_to_part.push(parts.len());
            parts.push(Part::new(element_atom(element), element.quantifier, true));

            let is_last = i + 1 == elements.len();
            if !is_last && !element.skip.is_adjacent() {
                let max = element.skip.max.unwrap_or(usize::MAX).max(element.skip.min);

                parts.push(Part::new(
                    TrueAtom::new().into(),
                    Quantifier::new(element.skip.min, max),
                    false,
                ));
            }
        }

        (Composition::new(parts), element_to_part)
    }

    /// How many tokens the part at `index` can consume starting at `position`, in increasing order.
    fn counts(&self, tokens: &[Token], index: usize, position: usize) -> Vec<usize> {
        let part = &self.parts[index];
        let mut counts = Vec::new();
        let mut count = 0;

        loop {
            if count >= part.quantifier.min {
                counts.push(count);
            }

            if count >= part.quantifier.max
                || position + count >= tokens.len()
                || !part.atom.is_match(tokens, position + count)
            {
                break;
            }
            count += 1;
        }

        counts
    }

    fn reach(&self, tokens: &[Token], index: usize, position: usize, reaches: &mut Reaches) -> Reach {
        if index == self.parts.len() {
            return Some(None);
        }

        if let Some(reach) = reaches.memo[index][position] {
            return reach;
        }

        let visible = self.parts[index].visible;
        let mut best: Reach = None;

        for count in self.counts(tokens, index, position) {
            if let Some(rest) = self.reach(tokens, index + 1, position + count, reaches) {
                let end = match rest {
                    Some(end) => Some(end),
                    None if visible && count > 0 => Some(position + count),
                    None => None,
                };

                if best.map_or(true, |best| end > best) {
                    best = Some(end);
                }
            }
        }

        reaches.memo[index][position] = Some(best);
        best
    }

    /// An empty reach table for `tokens`.
    pub fn reaches(&self, tokens: &[Token]) -> Reaches {
        Reaches {
            memo: vec![vec![None; tokens.len() + 1]; self.parts.len()],
        }
    }

    /// Applies the composition at `start`, returning the longest match there.
    /// The match may leave tokens at the start unconsumed if the leading parts are optional.
    pub fn apply(&self, tokens: &[Token], start: usize) -> Option<MatchGraph> {
        self.apply_with(tokens, start, &mut self.reaches(tokens))
    }

    /// Like [Composition::apply], reusing the reach table of earlier calls on the same tokens.
    pub fn apply_with(&self, tokens: &[Token], start: usize, reaches: &mut Reaches) -> Option<MatchGraph> {
        // the best reachable end is also used to walk back through the parts
        self.reach(tokens, 0, start, reaches)?;

        let mut groups = Vec::with_capacity(self.parts.len());
        let mut position = start;

        for index in 0..self.parts.len() {
            let target = self.reach(tokens, index, position, reaches);
            let visible = self.parts[index].visible;

            // prefer consuming as many tokens as possible among the choices reaching the same end
            let count = self
                .counts(tokens, index, position)
                .into_iter()
                .rev()
                .find(|count| {
                    self.reach(tokens, index + 1, position + count, reaches)
                        .map(|rest| match rest {
                            Some(end) => Some(end),
                            None if visible && *count > 0 => Some(position + count),
                            None => None,
                        })
                        == target
                })?;

            groups.push(Group {
                token_range: position..position + count,
            });
            position += count;
        }

        Some(MatchGraph { groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Element;

    fn tokens(text: &str) -> Vec<Token> {
        let mut char_start = 0;

        text.split(' ')
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
            .collect()
    }

    fn literal(text: &str) -> Element {
        Element::new(text, false, false, false).unwrap()
    }

    #[test]
    fn adjacent_elements_match() {
        let (composition, _) = Composition::from_elements(&[literal("move"), literal("back")]);
        let tokens = tokens("How to move back and fourth");

        let graph = composition.apply(&tokens, 2).unwrap();
        assert_eq!(graph.by_index(0).token_range, 2..3);
        assert_eq!(graph.by_index(1).token_range, 3..4);

        assert!(composition.apply(&tokens, 1).is_none());
    }

    #[test]
    fn skip_allows_gaps() {
        let (composition, _) = Composition::from_elements(&[
            literal("move").with_skip(0, Some(2)),
            literal("and"),
        ]);
        let tokens = tokens("move back and fourth");

        let graph = composition.apply(&tokens, 0).unwrap();
        assert_eq!(graph.by_index(1).token_range, 1..2);
        assert_eq!(graph.by_index(2).token_range, 2..3);

        let (composition, _) = Composition::from_elements(&[
            literal("move").with_skip(2, Some(3)),
            literal("and"),
        ]);
        assert!(composition.apply(&tokens, 0).is_none());
    }

    #[test]
    fn optional_elements_can_be_skipped() {
        let (composition, _) = Composition::from_elements(&[
            literal("back"),
            literal("really").optional(),
            literal("and"),
        ]);

        assert!(composition.apply(&tokens("back and"), 0).is_some());
        assert!(composition.apply(&tokens("back really and"), 0).is_some());
        assert!(composition.apply(&tokens("back maybe and"), 0).is_none());
    }

    #[test]
    fn negated_elements_match_other_tokens() {
        let (composition, _) = Composition::from_elements(&[literal("back"), literal("and").negated()]);

        assert!(composition.apply(&tokens("back and"), 0).is_none());
        assert!(composition.apply(&tokens("back or"), 0).is_some());
    }

    #[test]
    fn respects_case_sensitivity() {
        let (composition, _) = Composition::from_elements(&[Element::new("Linux", true, false, false).unwrap()]);

        assert!(composition.apply(&tokens("Linux"), 0).is_some());
        assert!(composition.apply(&tokens("linux"), 0).is_none());

        let (composition, _) = Composition::from_elements(&[literal("Linux")]);
        assert!(composition.apply(&tokens("LINUX"), 0).is_some());
    }

    #[test]
    fn backtracks_through_quantifiers() {
        // a greedy `any{0,3}` would swallow the final "and"
        let (composition, _) = Composition::from_elements(&[
            literal("back"),
            Element::any().with_quantifier(Quantifier::new(0, 3)),
            literal("and"),
        ]);

        let graph = composition.apply(&tokens("back and and"), 0).unwrap();
        assert_eq!(graph.by_index(1).token_range, 1..2);
        assert_eq!(graph.by_index(2).token_range, 2..3);
    }

    #[test]
    fn reach_table_is_shared_between_starts() {
        let (composition, _) = Composition::from_elements(&[
            literal("back").with_skip(0, Some(2)),
            literal("and"),
        ]);
        let tokens = tokens("back and back or and back");
        let mut reaches = composition.reaches(&tokens);

        for start in 0..tokens.len() {
            let shared = composition
                .apply_with(&tokens, start, &mut reaches)
                .map(|graph| graph.groups);
            let fresh = composition.apply(&tokens, start).map(|graph| graph.groups);

            assert_eq!(shared, fresh);
        }
        assert!(composition.apply_with(&tokens, 2, &mut reaches).is_some());
        assert!(composition.apply_with(&tokens, 5, &mut reaches).is_none());
    }

    #[test]
    fn exceptions_block_matches() {
        let exception = Constraint {
            text: Some(TextPattern::Literal("forth".into())),
            ..Constraint::default()
        };
        let (composition, _) = Composition::from_elements(&[
            literal("and"),
            Element::any().with_exception(exception),
        ]);

        assert!(composition.apply(&tokens("and fourth"), 0).is_some());
        assert!(composition.apply(&tokens("and forth"), 0).is_none());
    }
}
