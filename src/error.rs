//! Error types for template parsing and resolution

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Syntax error inside a single variable body (`name.chain[attr]`)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Message with the expected alternatives appended
    pub fn describe(&self) -> String {
        match self {
            ParseError::Syntax {
                message, expected, ..
            } => {
                if expected.is_empty() {
                    message.clone()
                } else {
                    format!("{} (expected {})", message, expected.join(", "))
                }
            }
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of variable".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of variable".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Ident(s) => format!("name '{}'", s),
        Token::Quoted(s) => format!("quoted key '{}'", s),
        Token::Dot => "'.'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
    }
}

/// Errors that can occur while resolving a template
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// Requested or referenced template is absent from the table
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// Same template name registered twice
    #[error("duplicate template definition: {name}")]
    DuplicateTemplate { name: String },

    /// A name chain segment or attribute is missing from the context
    #[error("variable not found: {name}")]
    VariableNotFound { name: String },

    /// The variable resolved, but to an empty/falsy value
    #[error("variable '{name}' is empty")]
    EmptyValue { name: String },

    /// Token text does not follow the template grammar
    #[error("malformed token {token:?}{}: {message}", in_template(.template))]
    Malformed {
        template: String,
        token: String,
        span: Span,
        message: String,
    },

    /// A generic format specifier cannot be applied to the value
    #[error("cannot format {value:?} with '{spec}': {message}")]
    Format {
        spec: String,
        value: String,
        message: String,
    },

    /// External references loop back on themselves
    #[error("circular template reference detected: {chain}")]
    CyclicReference { chain: String },

    /// Tokenization did not settle within the round ceiling
    #[error("template {template:?} is too complex: more than {limit} tokens")]
    TooComplex { template: String, limit: usize },
}

fn in_template(template: &str) -> String {
    if template.is_empty() {
        String::new()
    } else {
        format!(" in template '{}'", template)
    }
}

impl TemplateError {
    /// Attach the owning template name to a malformed-token error that has none yet
    pub fn in_template(self, name: &str) -> Self {
        match self {
            TemplateError::Malformed {
                template,
                token,
                span,
                message,
            } if template.is_empty() => TemplateError::Malformed {
                template: name.to_string(),
                token,
                span,
                message,
            },
            other => other,
        }
    }

    /// Name of the template a malformed token belongs to, if known
    pub fn template(&self) -> Option<&str> {
        match self {
            TemplateError::Malformed { template, .. } if !template.is_empty() => {
                Some(template.as_str())
            }
            _ => None,
        }
    }

    /// Format the error with source context using ariadne
    ///
    /// Only malformed tokens carry a span; every other variant falls back to
    /// its plain message.
    pub fn report(&self, source: &str) -> String {
        match self {
            TemplateError::Malformed {
                template,
                span,
                message,
                ..
            } => {
                let filename = if template.is_empty() {
                    "<template>"
                } else {
                    template.as_str()
                };
                let mut buf = Vec::new();
                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message("malformed template token")
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(message)
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                match written {
                    Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
                    Err(_) => self.to_string(),
                }
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_template_fills_missing_name() {
        let err = TemplateError::Malformed {
            template: String::new(),
            token: "{a b}".to_string(),
            span: 0..5,
            message: "Unexpected character ' '".to_string(),
        };
        let err = err.in_template("publish");
        assert_eq!(err.template(), Some("publish"));

        // The innermost template wins
        let err = err.in_template("outer");
        assert_eq!(err.template(), Some("publish"));
    }

    #[test]
    fn test_in_template_ignores_other_variants() {
        let err = TemplateError::EmptyValue {
            name: "entity.mod".to_string(),
        };
        assert_eq!(err.clone().in_template("publish"), err);
    }

    #[test]
    fn test_display_messages() {
        let err = TemplateError::CyclicReference {
            chain: "a -> b -> a".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "circular template reference detected: a -> b -> a"
        );

        let err = TemplateError::Malformed {
            template: "root".to_string(),
            token: "<a b>".to_string(),
            span: 0..5,
            message: "invalid template name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed token \"<a b>\" in template 'root': invalid template name"
        );
    }

    #[test]
    fn test_report_points_at_span() {
        let source = "/mnt/{a b}/x";
        let err = TemplateError::Malformed {
            template: "root".to_string(),
            token: "{a b}".to_string(),
            span: 5..10,
            message: "Unexpected character ' '".to_string(),
        };
        let report = err.report(source);
        assert!(report.contains("malformed template token"));
        assert!(report.contains("root"));
        assert!(report.contains("Unexpected character"));
    }

    #[test]
    fn test_report_plain_for_other_errors() {
        let err = TemplateError::TemplateNotFound {
            name: "missing".to_string(),
        };
        assert_eq!(err.report("anything"), "template not found: missing");
    }
}
