//! Pattern rules from grammar files in the LanguageTool XML format.

use super::{RuleSource, Rules};
use crate::{
    rule::{Constraint, Element, PatternRule, Quantifier, TextPattern},
    utils, Error,
};
use fs_err as fs;
use log::warn;
use roxmltree::{Document, Node};
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone)]
enum Input {
    Path(PathBuf),
    Xml(String),
}

/// A grammar XML file. The file is read and parsed on every lookup.
#[derive(Debug, Clone)]
pub struct XmlRuleSource {
    input: Input,
}

impl XmlRuleSource {
    /// Creates a source reading the file at `path`. The file is not read until a rule is looked up.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        XmlRuleSource {
            input: Input::Path(path.as_ref().to_path_buf()),
        }
    }

    /// Creates a source from XML content.
    pub fn from_xml<S: Into<String>>(xml: S) -> Self {
        XmlRuleSource {
            input: Input::Xml(xml.into()),
        }
    }

    fn read(&self) -> Result<Cow<'_, str>, Error> {
        Ok(match &self.input {
            Input::Path(path) => Cow::Owned(fs::read_to_string(path)?),
            Input::Xml(xml) => Cow::Borrowed(xml.as_str()),
        })
    }

    /// Loads every rule of the file. Rules which can not be evaluated are logged and left out.
    ///
    /// # Errors
    /// - If the file can not be read or is not valid XML.
    pub fn rules(&self) -> Result<Rules, Error> {
        let xml = self.read()?;
        let document = Document::parse(&xml)?;
        let lang_code = lang_code(&document)?;

        let mut rules = Rules::new();

        for (id, node) in rule_nodes(&document) {
            match parse_rule(node, &id, lang_code) {
                Ok(rule) => {
                    rules.insert(rule);
                }
                Err(error) => warn!("skipping rule {}: {}", id, error),
            }
        }

        Ok(rules)
    }
}

impl RuleSource for XmlRuleSource {
    fn rule_by_id(&self, id: &str) -> Result<PatternRule, Error> {
        let xml = self.read()?;
        let document = Document::parse(&xml)?;
        let lang_code = lang_code(&document)?;

        let (id, node) = rule_nodes(&document)
            .find(|(rule_id, _)| rule_id == id)
            .ok_or_else(|| Error::RuleNotFound(id.to_string()))?;

        parse_rule(node, &id, lang_code)
    }
}

fn lang_code<'a>(document: &'a Document) -> Result<&'a str, Error> {
    document
        .root_element()
        .attribute("lang")
        .ok_or_else(|| Error::InvalidRule("the root element has no lang attribute".into()))
}

/// All `<rule>` nodes in document order with their IDs. Rules in a group have the ID of the group.
fn rule_nodes<'a, 'input>(document: &'a Document<'input>) -> impl Iterator<Item = (String, Node<'a, 'input>)> {
    document
        .root()
        .descendants()
        .filter(|x| x.has_tag_name("rule"))
        .filter_map(|x| {
            let id = match x.parent_element() {
                Some(parent) if parent.has_tag_name("rulegroup") => parent.attribute("id"),
                _ => x.attribute("id"),
            };

            id.map(|id| (id.to_string(), x))
        })
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|x| x.is_element())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|x| x.has_tag_name(name))
}

fn is_yes(value: Option<&str>) -> bool {
    value == Some("yes")
}

fn unimplemented(id: &str, what: &str) -> Error {
    Error::Unimplemented(format!("rule {} uses {}", id, what))
}

/// The text of a node. Suggestions are quoted.
fn flatten_text(node: Node) -> String {
    fn collect(node: Node, out: &mut String) {
        for child in node.children() {
            if child.is_text() {
                out.push_str(child.text().unwrap_or_default());
            } else if child.has_tag_name("suggestion") {
                out.push('"');
                collect(child, out);
                out.push('"');
            } else {
                collect(child, out);
            }
        }
    }

    let mut out = String::new();
    collect(node, &mut out);
    utils::normalize_whitespace(&out)
}

/// The direct text of a node, excluding the text of child elements.
fn own_text(node: Node) -> String {
    node.children()
        .filter(|x| x.is_text())
        .filter_map(|x| x.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// The elements of a `<pattern>` or `<antipattern>`.
fn parse_pattern(pattern: Node, id: &str) -> Result<Vec<Element>, Error> {
    let case_sensitive = is_yes(pattern.attribute("case_sensitive"));
    let mut elements_out = Vec::new();

    for child in elements(pattern) {
        match child.tag_name().name() {
            "token" => elements_out.push(parse_token(child, id, case_sensitive)?),
            "marker" => {
                for token in elements(child) {
                    if !token.has_tag_name("token") {
                        return Err(unimplemented(id, &format!("<{}> in a marker", token.tag_name().name())));
                    }
                    elements_out.push(parse_token(token, id, case_sensitive)?.marked(true));
                }
            }
            other => return Err(unimplemented(id, &format!("<{}> in a pattern", other))),
        }
    }

    Ok(elements_out)
}

fn parse_rule(node: Node, id: &str, lang_code: &str) -> Result<PatternRule, Error> {
    let pattern = child(node, "pattern").ok_or_else(|| unimplemented(id, "a non-pattern rule type"))?;
    let elements_out = parse_pattern(pattern, id)?;

    // antipatterns of a rulegroup apply to each of its rules
    let group = node.parent_element().filter(|x| x.has_tag_name("rulegroup"));
    let antipatterns = elements(node)
        .chain(group.into_iter().flat_map(elements))
        .filter(|x| x.has_tag_name("antipattern"))
        .map(|x| parse_pattern(x, id))
        .collect::<Result<Vec<_>, _>>()?;

    let description = node
        .attribute("name")
        .or_else(|| node.parent_element().and_then(|x| x.attribute("name")))
        .unwrap_or_default();
    let message = child(node, "message").map(flatten_text).unwrap_or_default();
    let short_message = child(node, "short").map(flatten_text).unwrap_or_default();

    PatternRule::new(
        id.to_string(),
        lang_code,
        elements_out,
        description.to_string(),
        message,
        short_message,
    )
    .map(|rule| rule.with_antipatterns(antipatterns))
}

fn parse_constraint(node: Node, text: &str, default_case_sensitive: bool) -> Result<Constraint, Error> {
    let case_sensitive = node
        .attribute("case_sensitive")
        .map_or(default_case_sensitive, |x| x == "yes");

    let text = if text.is_empty() {
        None
    } else if is_yes(node.attribute("regexp")) {
        Some(TextPattern::regex(text, case_sensitive)?)
    } else {
        Some(TextPattern::Literal(text.to_string()))
    };

    let pos = match node.attribute("postag") {
        Some(pos) if is_yes(node.attribute("postag_regexp")) => Some(TextPattern::regex(pos, true)?),
        Some(pos) => Some(TextPattern::Literal(pos.to_string())),
        None => None,
    };

    Ok(Constraint {
        text,
        case_sensitive,
        inflected: is_yes(node.attribute("inflected")),
        negate: is_yes(node.attribute("negate")),
        pos,
        negate_pos: is_yes(node.attribute("negate_pos")),
    })
}

/// Parses a count attribute where `-1` means unbounded.
fn parse_count(node: Node, name: &str, id: &str) -> Result<Option<Option<usize>>, Error> {
    node.attribute(name)
        .map(|value| match value.trim() {
            "-1" => Ok(None),
            value => value.parse::<usize>().map(Some).map_err(|_| {
                Error::InvalidRule(format!("rule {}: invalid {} value {:?}", id, name, value))
            }),
        })
        .transpose()
}

fn parse_token(node: Node, id: &str, default_case_sensitive: bool) -> Result<Element, Error> {
    for attribute in &["chunk", "chunk_re", "spacebefore"] {
        if node.attribute(*attribute).is_some() {
            return Err(unimplemented(id, &format!("the {} attribute", attribute)));
        }
    }

    let mut exceptions = Vec::new();

    for child in elements(node) {
        if !child.has_tag_name("exception") {
            return Err(unimplemented(id, &format!("<{}> in a token", child.tag_name().name())));
        }

        match child.attribute("scope") {
            None | Some("current") => {}
            Some(scope) => return Err(unimplemented(id, &format!("exception scope {:?}", scope))),
        }

        exceptions.push(parse_constraint(child, &own_text(child), default_case_sensitive)?);
    }

    let mut element = Element::from_constraint(parse_constraint(node, &own_text(node), default_case_sensitive)?);
    element.exceptions = exceptions;

    let min = parse_count(node, "min", id)?.map_or(1, |x| x.unwrap_or(0));
    let max = match parse_count(node, "max", id)? {
        Some(Some(max)) => max.max(min),
        Some(None) => usize::MAX,
        None => min.max(1),
    };
    element = element.with_quantifier(Quantifier::new(min, max));

    if let Some(skip) = parse_count(node, "skip", id)? {
        element = element.with_skip(0, skip);
    }

    Ok(element)
}
