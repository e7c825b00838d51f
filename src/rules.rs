//! Sources of pattern rules and lookup of rules by ID.

use crate::{rule::PatternRule, Error};
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use std::iter::FromIterator;

mod xml;

pub use xml::XmlRuleSource;

/// Anything pattern rules can be looked up in.
pub trait RuleSource {
    /// Returns the first rule with exactly this ID.
    ///
    /// # Errors
    /// - [Error::RuleNotFound] if there is no such rule.
    /// - [Error::Unimplemented] if the rule exists but uses constructs which can not be evaluated.
    fn rule_by_id(&self, id: &str) -> Result<PatternRule, Error>;
}

/// Looks up a rule by ID. Lookups are exact and case-sensitive, and do not modify the source.
///
/// # Errors
/// - [Error::RuleNotFound] if no rule has this ID. This is never reported as an empty result.
/// - Any error of the source, e. g. if the rule file can not be read.
pub fn get_rule_by_id<S: RuleSource + ?Sized>(id: &str, source: &S) -> Result<PatternRule, Error> {
    source.rule_by_id(id)
}

/// An in-memory set of rules in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rules {
    rules: IndexMap<String, PatternRule>,
}

impl Rules {
    pub fn new() -> Self {
        Rules::default()
    }

    /// Adds a rule. If a rule with the same ID exists, it is kept and `false` is returned.
    pub fn insert(&mut self, rule: PatternRule) -> bool {
        if self.rules.contains_key(rule.id()) {
            warn!("duplicate rule id {}, keeping the first rule", rule.id());
            return false;
        }

        self.rules.insert(rule.id().to_string(), rule);
        true
    }

    pub fn get(&self, id: &str) -> Option<&PatternRule> {
        self.rules.get(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.values()
    }
}

impl FromIterator<PatternRule> for Rules {
    fn from_iter<I: IntoIterator<Item = PatternRule>>(iter: I) -> Self {
        let mut rules = Rules::new();
        for rule in iter {
            rules.insert(rule);
        }
        rules
    }
}

impl RuleSource for Rules {
    fn rule_by_id(&self, id: &str) -> Result<PatternRule, Error> {
        self.get(id)
            .cloned()
            .ok_or_else(|| Error::RuleNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Element;

    fn rule(id: &str, word: &str) -> PatternRule {
        PatternRule::new(id, "en", vec![Element::new(word, false, false, false).unwrap()], "", "", "").unwrap()
    }

    #[test]
    fn first_rule_with_an_id_wins() {
        let rules: Rules = vec![rule("A", "move"), rule("B", "back"), rule("A", "lid")]
            .into_iter()
            .collect();

        assert_eq!(rules.len(), 2);
        assert_eq!(get_rule_by_id("A", &rules).unwrap(), rule("A", "move"));
        assert_eq!(
            rules.iter().map(|x| x.id()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let rules: Rules = vec![rule("RULE1", "move")].into_iter().collect();

        assert!(matches!(
            get_rule_by_id("rule1", &rules),
            Err(Error::RuleNotFound(id)) if id == "rule1"
        ));
    }
}
