//! Minimal XPath evaluator for anchor expressions.
//!
//! Supports the subset produced by the exporter and found in annotated
//! documents: absolute location paths built from child (`/`) and
//! descendant (`//`) steps, name tests (`p`, `tei:p`, `*`) and predicates
//! of the form `[@attr="value"]`, `[@attr]` and `[n]`.
//!
//! Unprefixed name tests match elements in no namespace or in the
//! document's default namespace.

use std::collections::HashSet;

use roxmltree::{Document, Node, NodeId};

use crate::config::XML_NS;
use crate::error::{AnnotatorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name { prefix: Option<String>, local: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// 1-based position among the matches of one context node.
    Position(usize),
    Attribute {
        prefix: Option<String>,
        name: String,
        value: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

/// A parsed XPath expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    expression: String,
    steps: Vec<Step>,
}

struct Parser<'a> {
    expression: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expression: &'a str) -> Self {
        Self {
            expression,
            chars: expression.trim().chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> AnnotatorError {
        AnnotatorError::XPath {
            expression: self.expression.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        if self.peek().is_none() {
            return Err(self.error("empty expression"));
        }
        while self.peek().is_some() {
            if !self.eat('/') {
                return Err(self.error(format!("expected '/' at position {}", self.pos)));
            }
            let axis = if self.eat('/') {
                Axis::Descendant
            } else {
                Axis::Child
            };
            let test = self.name_test()?;
            let mut predicates = Vec::new();
            while self.eat('[') {
                predicates.push(self.predicate()?);
            }
            steps.push(Step {
                axis,
                test,
                predicates,
            });
        }
        Ok(steps)
    }

    fn ncname(&mut self) -> Option<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn qname(&mut self) -> Result<(Option<String>, String)> {
        let first = self
            .ncname()
            .ok_or_else(|| self.error(format!("expected a name at position {}", self.pos)))?;
        if self.eat(':') {
            let local = self
                .ncname()
                .ok_or_else(|| self.error(format!("expected a local name at position {}", self.pos)))?;
            Ok((Some(first), local))
        } else {
            Ok((None, first))
        }
    }

    fn name_test(&mut self) -> Result<NameTest> {
        if self.eat('*') {
            return Ok(NameTest::Any);
        }
        let (prefix, local) = self.qname()?;
        Ok(NameTest::Name { prefix, local })
    }

    fn literal(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error(format!("expected a string literal at position {}", self.pos))),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        if !self.eat(quote) {
            return Err(self.error("unterminated string literal"));
        }
        Ok(self.chars[start..self.pos - 1].iter().collect())
    }

    fn predicate(&mut self) -> Result<Predicate> {
        self.skip_whitespace();
        let predicate = if self.eat('@') {
            let (prefix, name) = self.qname()?;
            self.skip_whitespace();
            let value = if self.eat('=') {
                self.skip_whitespace();
                Some(self.literal()?)
            } else {
                None
            };
            Predicate::Attribute {
                prefix,
                name,
                value,
            }
        } else {
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            match digits.parse::<usize>() {
                Ok(position) if position > 0 => Predicate::Position(position),
                _ => return Err(self.error(format!("unsupported predicate at position {start}"))),
            }
        };
        self.skip_whitespace();
        if !self.eat(']') {
            return Err(self.error("unterminated predicate"));
        }
        Ok(predicate)
    }
}

impl XPath {
    /// Parse an expression.
    ///
    /// # Examples
    /// ```
    /// use standoff_annotator::xml::XPath;
    ///
    /// assert!(XPath::parse("//p[@offsetId=\"struct_3\"]").is_ok());
    /// assert!(XPath::parse("p[").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        let steps = Parser::new(expression).parse()?;
        Ok(Self {
            expression: expression.to_string(),
            steps,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    fn namespace_for<'a>(&self, doc: &'a Document<'_>, prefix: &str) -> Result<&'a str> {
        if prefix == "xml" {
            return Ok(XML_NS);
        }
        doc.root_element()
            .lookup_namespace_uri(Some(prefix))
            .ok_or_else(|| AnnotatorError::XPath {
                expression: self.expression.clone(),
                reason: format!("unknown namespace prefix '{prefix}'"),
            })
    }

    fn matches_name(&self, doc: &Document<'_>, node: Node<'_, '_>, test: &NameTest) -> Result<bool> {
        if !node.is_element() {
            return Ok(false);
        }
        match test {
            NameTest::Any => Ok(true),
            NameTest::Name { prefix, local } => {
                if node.tag_name().name() != local {
                    return Ok(false);
                }
                let namespace = node.tag_name().namespace();
                match prefix {
                    Some(prefix) => Ok(namespace == Some(self.namespace_for(doc, prefix)?)),
                    None => {
                        let default = doc.root_element().lookup_namespace_uri(None);
                        Ok(namespace.is_none() || namespace == default)
                    }
                }
            }
        }
    }

    fn matches_attribute(
        &self,
        doc: &Document<'_>,
        node: Node<'_, '_>,
        prefix: Option<&str>,
        name: &str,
        value: Option<&str>,
    ) -> Result<bool> {
        let actual = match prefix {
            Some(prefix) => node.attribute((self.namespace_for(doc, prefix)?, name)),
            None => node.attribute(name),
        };
        Ok(match (actual, value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    /// Select all matching elements in document order.
    pub fn select<'a, 'input>(&self, doc: &'a Document<'input>) -> Result<Vec<Node<'a, 'input>>> {
        let mut context: Vec<Node<'a, 'input>> = vec![doc.root()];
        for step in &self.steps {
            let mut selected: HashSet<NodeId> = HashSet::new();
            for node in &context {
                let bases: Vec<Node<'a, 'input>> = match step.axis {
                    Axis::Child => vec![*node],
                    Axis::Descendant => node.descendants().collect(),
                };
                for base in bases {
                    let mut matched = Vec::new();
                    for child in base.children() {
                        if self.matches_name(doc, child, &step.test)? {
                            matched.push(child);
                        }
                    }
                    for predicate in &step.predicates {
                        matched = match predicate {
                            Predicate::Position(position) => {
                                matched.get(position - 1).copied().into_iter().collect()
                            }
                            Predicate::Attribute {
                                prefix,
                                name,
                                value,
                            } => {
                                let mut kept = Vec::new();
                                for candidate in matched {
                                    if self.matches_attribute(
                                        doc,
                                        candidate,
                                        prefix.as_deref(),
                                        name,
                                        value.as_deref(),
                                    )? {
                                        kept.push(candidate);
                                    }
                                }
                                kept
                            }
                        };
                    }
                    selected.extend(matched.iter().map(|n| n.id()));
                }
            }
            context = doc
                .descendants()
                .filter(|n| selected.contains(&n.id()))
                .collect();
            if context.is_empty() {
                break;
            }
        }
        Ok(context)
    }

    /// Select the first matching element.
    pub fn select_first<'a, 'input>(&self, doc: &'a Document<'input>) -> Result<Option<Node<'a, 'input>>> {
        Ok(self.select(doc)?.into_iter().next())
    }
}

/// Parse and evaluate an expression, returning the first match.
///
/// A syntactically invalid expression is an error; an expression matching
/// nothing yields `Ok(None)`.
pub fn resolve_xpath<'a, 'input>(doc: &'a Document<'input>, expression: &str) -> Result<Option<Node<'a, 'input>>> {
    XPath::parse(expression)?.select_first(doc)
}
