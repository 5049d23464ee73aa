//! Syntax tree for variable tokens

use std::fmt;

use crate::value::format::Pipeline;

/// Trailing `[...]` accessor on a name chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// `['key']` - the text is used verbatim as the last segment
    Literal(String),
    /// `[other.name]` - the resolved value of the chain is the last segment
    Chain(Vec<String>),
}

/// A dotted name chain with an optional trailing attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    pub chain: Vec<String>,
    pub attribute: Option<Attribute>,
}

impl VariableRef {
    pub fn new(chain: Vec<String>) -> Self {
        Self {
            chain,
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attribute = Some(attribute);
        self
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chain.join("."))?;
        match &self.attribute {
            Some(Attribute::Literal(key)) => write!(f, "['{}']", key),
            Some(Attribute::Chain(chain)) => write!(f, "[{}]", chain.join(".")),
            None => Ok(()),
        }
    }
}

/// Parsed body of a `{...}` token
#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpr {
    pub reference: VariableRef,
    pub pipeline: Pipeline,
}

impl VariableExpr {
    pub fn new(reference: VariableRef) -> Self {
        Self {
            reference,
            pipeline: Pipeline::default(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain_chain() {
        let var = VariableRef::new(vec!["project".into(), "name".into()]);
        assert_eq!(var.to_string(), "project.name");
    }

    #[test]
    fn test_display_attributes() {
        let literal = VariableRef::new(vec!["entity".into()])
            .with_attribute(Attribute::Literal("name".into()));
        assert_eq!(literal.to_string(), "entity['name']");

        let dynamic = VariableRef::new(vec!["steps".into()])
            .with_attribute(Attribute::Chain(vec!["step_name".into()]));
        assert_eq!(dynamic.to_string(), "steps[step_name]");
    }
}
