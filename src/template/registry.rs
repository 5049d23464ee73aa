//! Template table: named template strings supplied by the host application

use std::collections::{BTreeMap, HashMap};

use crate::error::TemplateError;
use crate::template::token::Token;
use crate::template::tokenizer::Tokenizer;

/// Named template strings
///
/// The table is read-only while templates are being solved; a solver only
/// ever borrows it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateTable {
    templates: HashMap<String, String>,
}

impl TemplateTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template; names must be unique
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        if self.templates.contains_key(&name) {
            return Err(TemplateError::DuplicateTemplate { name });
        }
        self.templates.insert(name, pattern.into());
        Ok(())
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(|s| s.as_str())
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All template names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates
            .iter()
            .map(|(name, pattern)| (name.as_str(), pattern.as_str()))
    }

    /// Names referenced by `<...>` tokens in a template, in order of first use
    pub fn references(&self, name: &str) -> Result<Vec<String>, TemplateError> {
        let pattern = self.get(name).ok_or_else(|| TemplateError::TemplateNotFound {
            name: name.to_string(),
        })?;
        let tokenized = Tokenizer::default()
            .tokenize(pattern)
            .map_err(|e| e.in_template(name))?;

        let mut refs: Vec<String> = Vec::new();
        for token in tokenized.tokens() {
            if let Token::External(ext) = token {
                if !refs.iter().any(|r| r == ext.resolve()) {
                    refs.push(ext.resolve().to_string());
                }
            }
        }
        Ok(refs)
    }

    /// Check the whole table without a context
    ///
    /// Reports every template that fails to tokenize, every reference to a
    /// missing template and every reference cycle.
    pub fn validate(&self) -> Result<(), Vec<TemplateError>> {
        let mut errors = Vec::new();
        let mut graph: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for name in self.names() {
            match self.references(name) {
                Ok(refs) => {
                    for reference in &refs {
                        if !self.contains(reference) {
                            errors.push(TemplateError::TemplateNotFound {
                                name: reference.clone(),
                            });
                        }
                    }
                    graph.insert(name, refs);
                }
                Err(err) => errors.push(err),
            }
        }

        errors.extend(
            find_cycles(&graph)
                .into_iter()
                .map(|chain| TemplateError::CyclicReference { chain }),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateTable {
    /// Later entries replace earlier ones with the same name
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            templates: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search over the reference graph; each cycle is reported once
/// as `a -> b -> a`.
fn find_cycles(graph: &BTreeMap<&str, Vec<String>>) -> Vec<String> {
    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();
    for &node in graph.keys() {
        visit(node, graph, &mut marks, &mut stack, &mut cycles);
    }
    cycles
}

fn visit<'g>(
    node: &'g str,
    graph: &'g BTreeMap<&str, Vec<String>>,
    marks: &mut HashMap<&'g str, Mark>,
    stack: &mut Vec<&'g str>,
    cycles: &mut Vec<String>,
) {
    match marks.get(node) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|n| *n == node).unwrap_or(0);
            let mut chain = stack[start..].to_vec();
            chain.push(node);
            cycles.push(chain.join(" -> "));
            return;
        }
        None => {}
    }

    marks.insert(node, Mark::Visiting);
    stack.push(node);
    if let Some(edges) = graph.get(node) {
        for next in edges {
            if graph.contains_key(next.as_str()) {
                visit(next.as_str(), graph, marks, stack, cycles);
            }
        }
    }
    stack.pop();
    marks.insert(node, Mark::Done);
}
