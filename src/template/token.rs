//! Token kinds of the path template grammar
//!
//! ```text
//! <name>              External  - another template from the table
//! {name:fmt}          Variable  - a context value with a format pipeline
//! (text{name}text)    Optional  - dropped when the variable is missing or empty
//! (!text{name}text)   Optional, strong - an empty value is an error
//! ```

use std::ops::Range;

use crate::error::{Span, TemplateError};
use crate::parser::{self, VariableExpr};
use crate::template::tokenizer::substitute;
use crate::value::{accessor, Value};

/// Which of the three patterns a token was matched by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    External,
    Optional,
    Variable,
}

impl TokenKind {
    /// Order in which patterns are tried on each scan round
    pub const PRECEDENCE: [TokenKind; 3] =
        [TokenKind::External, TokenKind::Optional, TokenKind::Variable];

    /// Leftmost match of this kind's pattern in `text`
    ///
    /// All delimiters are ASCII, so scanning bytes keeps every returned
    /// range on a char boundary.
    pub fn find(self, text: &str) -> Option<Range<usize>> {
        let bytes = text.as_bytes();
        match self {
            TokenKind::External => find_external(bytes),
            TokenKind::Optional => find_optional(bytes),
            TokenKind::Variable => find_variable(bytes),
        }
    }
}

/// `<[^<>]+>`
fn find_external(bytes: &[u8]) -> Option<Range<usize>> {
    let mut open = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => open = Some(i),
            b'>' => {
                if let Some(start) = open.take() {
                    if i > start + 1 {
                        return Some(start..i + 1);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// `\{[^}]+}`
fn find_variable(bytes: &[u8]) -> Option<Range<usize>> {
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'{' {
            continue;
        }
        match bytes[i + 1..].iter().position(|&c| c == b'}') {
            Some(0) => continue,
            Some(len) => return Some(i..i + len + 2),
            None => return None,
        }
    }
    None
}

fn is_segment_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'{' | b'}')
}

/// `\(!?[^(){}]*\{[^}]+}[^(){}]*\)`
fn find_optional(bytes: &[u8]) -> Option<Range<usize>> {
    let skip_text = |mut k: usize| {
        while k < bytes.len() && !is_segment_delimiter(bytes[k]) {
            k += 1;
        }
        k
    };

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'(' {
            continue;
        }
        let brace = skip_text(i + 1);
        if bytes.get(brace) != Some(&b'{') {
            continue;
        }
        let close = match bytes[brace + 1..].iter().position(|&c| c == b'}') {
            Some(0) | None => continue,
            Some(len) => brace + 1 + len,
        };
        let end = skip_text(close + 1);
        if bytes.get(end) == Some(&b')') {
            return Some(i..end + 1);
        }
    }
    None
}

/// Reference to another template: `<name>`
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalToken {
    pub source: String,
    pub span: Span,
    pub name: String,
}

impl ExternalToken {
    fn parse(raw: &str, source: String, span: Span) -> Result<Self, TemplateError> {
        let name = &raw[1..raw.len() - 1];
        if let Some((offset, c)) = name
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        {
            return Err(malformed(
                &source,
                span.clone(),
                format!("invalid character {:?} at offset {} in template name", c, offset + 1),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            source,
            span,
        })
    }

    /// The referenced template name; the solver performs the lookup
    pub fn resolve(&self) -> &str {
        &self.name
    }
}

/// Context lookup: `{name[attr]:fmt}`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableToken {
    pub source: String,
    pub span: Span,
    pub expr: VariableExpr,
}

impl VariableToken {
    fn parse(raw: &str, source: String, span: Span) -> Result<Self, TemplateError> {
        let body = &raw[1..raw.len() - 1];
        let expr = parser::parse_variable(body).map_err(|err| {
            let inner = err.span();
            let start = (span.start + 1 + inner.start).min(span.end);
            let end = (span.start + 1 + inner.end).clamp(start, span.end);
            malformed(&source, start..end, err.describe())
        })?;
        Ok(Self { source, span, expr })
    }

    /// Look the value up and run it through the format pipeline
    ///
    /// Fails with `VariableNotFound` when the chain does not resolve and with
    /// `EmptyValue` when it resolves to a falsy value.
    pub fn resolve(&self, context: &Value) -> Result<String, TemplateError> {
        let value = accessor::resolve(context, &self.expr.reference)?;
        if value.is_empty() {
            return Err(TemplateError::EmptyValue {
                name: self.expr.reference.to_string(),
            });
        }
        self.expr.pipeline.apply(&value)
    }
}

/// Optional segment: `(prefix{var}suffix)` or `(!prefix{var}suffix)`
#[derive(Debug, Clone, PartialEq)]
pub struct OptionalToken {
    pub source: String,
    pub span: Span,
    pub strong: bool,
    /// Literal text before the variable; may hold placeholders of earlier tokens
    pub prefix: String,
    pub suffix: String,
    pub variable: VariableToken,
}

impl OptionalToken {
    fn parse(raw: &str, source: String, span: Span) -> Result<Self, TemplateError> {
        let inner = &raw[1..raw.len() - 1];
        let strong = inner.starts_with('!');
        let inner = if strong { &inner[1..] } else { inner };

        let (open, close) = match (inner.find('{'), inner.find('}')) {
            (Some(open), Some(close)) if open < close => (open, close),
            _ => {
                return Err(malformed(
                    &source,
                    span.clone(),
                    "optional segment needs exactly one {variable}".to_string(),
                ))
            }
        };

        // Earlier tokens in the prefix are expanded in `source`; the variable
        // is the first brace there as well.
        let var_start = span.start + source.find('{').unwrap_or(0);
        let var_raw = &inner[open..=close];
        let var_source = var_raw.to_string();
        let var_span = var_start..var_start + var_source.len();
        let variable = VariableToken::parse(var_raw, var_source, var_span)?;

        Ok(Self {
            prefix: inner[..open].to_string(),
            suffix: inner[close + 1..].to_string(),
            strong,
            variable,
            source,
            span,
        })
    }

    /// Resolve to `prefix + value + suffix`, or to nothing
    ///
    /// A missing variable always drops the segment. An empty value drops it
    /// unless the segment is strong, in which case the error propagates.
    /// `earlier` holds the resolved text of the tokens before this one, used
    /// to fill placeholders inside the prefix and suffix.
    pub fn resolve(&self, context: &Value, earlier: &[String]) -> Result<String, TemplateError> {
        match self.variable.resolve(context) {
            Ok(value) => Ok(format!(
                "{}{}{}",
                substitute(&self.prefix, earlier),
                value,
                substitute(&self.suffix, earlier)
            )),
            Err(TemplateError::VariableNotFound { .. }) => Ok(String::new()),
            Err(TemplateError::EmptyValue { .. }) if !self.strong => Ok(String::new()),
            Err(err) => Err(err),
        }
    }
}

/// A parsed template token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    External(ExternalToken),
    Variable(VariableToken),
    Optional(OptionalToken),
}

impl Token {
    /// Build a token from its matched text
    ///
    /// `raw` is the match in the working string (placeholders included),
    /// `source` the same text with placeholders expanded back, `span` its
    /// byte range in the original template.
    pub fn parse(
        kind: TokenKind,
        raw: &str,
        source: String,
        span: Span,
    ) -> Result<Token, TemplateError> {
        match kind {
            TokenKind::External => ExternalToken::parse(raw, source, span).map(Token::External),
            TokenKind::Variable => VariableToken::parse(raw, source, span).map(Token::Variable),
            TokenKind::Optional => OptionalToken::parse(raw, source, span).map(Token::Optional),
        }
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Token::External(_) => TokenKind::External,
            Token::Variable(_) => TokenKind::Variable,
            Token::Optional(_) => TokenKind::Optional,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Token::External(t) => &t.source,
            Token::Variable(t) => &t.source,
            Token::Optional(t) => &t.source,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Token::External(t) => &t.span,
            Token::Variable(t) => &t.span,
            Token::Optional(t) => &t.span,
        }
    }
}

fn malformed(source: &str, span: Span, message: String) -> TemplateError {
    TemplateError::Malformed {
        template: String::new(),
        token: source.to_string(),
        span,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(kind: TokenKind, raw: &str) -> Result<Token, TemplateError> {
        Token::parse(kind, raw, raw.to_string(), 0..raw.len())
    }

    fn variable(raw: &str) -> VariableToken {
        match parse(TokenKind::Variable, raw).expect("Should parse") {
            Token::Variable(v) => v,
            other => panic!("Expected Variable, got {:?}", other),
        }
    }

    fn optional(raw: &str) -> OptionalToken {
        match parse(TokenKind::Optional, raw).expect("Should parse") {
            Token::Optional(o) => o,
            other => panic!("Expected Optional, got {:?}", other),
        }
    }

    #[test]
    fn test_find_external() {
        assert_eq!(TokenKind::External.find("<root>/x"), Some(0..6));
        assert_eq!(TokenKind::External.find("a/<<b>"), Some(3..6));
        assert_eq!(TokenKind::External.find("<>x<y>"), Some(3..6));
        assert_eq!(TokenKind::External.find("a > b < c"), None);
        assert_eq!(TokenKind::External.find("{x}"), None);
    }

    #[test]
    fn test_find_variable() {
        assert_eq!(TokenKind::Variable.find("/mnt/{a.b}/c"), Some(5..10));
        assert_eq!(TokenKind::Variable.find("{}{x}"), Some(2..5));
        assert_eq!(TokenKind::Variable.find("{{x}"), Some(0..4));
        assert_eq!(TokenKind::Variable.find("{x"), None);
        assert_eq!(TokenKind::Variable.find("plain"), None);
    }

    #[test]
    fn test_find_optional() {
        assert_eq!(TokenKind::Optional.find("a/(_{v}_)/b"), Some(2..9));
        assert_eq!(TokenKind::Optional.find("(!{v})"), Some(0..6));
        assert_eq!(TokenKind::Optional.find("(x)({v})"), Some(3..8));
        assert_eq!(TokenKind::Optional.find("((v{a}))"), Some(1..7));
        assert_eq!(TokenKind::Optional.find("(a{b}c"), None);
        assert_eq!(TokenKind::Optional.find("(no var)"), None);
        assert_eq!(TokenKind::Optional.find("({a}{b})"), None);
    }

    #[test]
    fn test_precedence_order() {
        assert_eq!(
            TokenKind::PRECEDENCE,
            [TokenKind::External, TokenKind::Optional, TokenKind::Variable]
        );
    }

    #[test]
    fn test_parse_external() {
        match parse(TokenKind::External, "<project_root>").unwrap() {
            Token::External(t) => assert_eq!(t.resolve(), "project_root"),
            other => panic!("Expected External, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_external_rejects_bad_names() {
        let err = parse(TokenKind::External, "<roots.main>").unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { .. }));
        assert!(parse(TokenKind::External, "<a b>").is_err());
    }

    #[test]
    fn test_parse_external_unicode_name() {
        match parse(TokenKind::External, "<корень_1>").unwrap() {
            Token::External(t) => assert_eq!(t.resolve(), "корень_1"),
            other => panic!("Expected External, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_variable_error_span() {
        let raw = "{a b}";
        let err = Token::parse(TokenKind::Variable, raw, raw.to_string(), 10..15).unwrap_err();
        match err {
            TemplateError::Malformed { span, token, .. } => {
                assert_eq!(span, 12..13);
                assert_eq!(token, "{a b}");
            }
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_optional_parts() {
        let opt = optional("(!_v{version:03d}_)");
        assert!(opt.strong);
        assert_eq!(opt.prefix, "_v");
        assert_eq!(opt.suffix, "_");
        assert_eq!(opt.variable.source, "{version:03d}");
        assert_eq!(opt.variable.span, 4..17);

        let opt = optional("({entity.variant})");
        assert!(!opt.strong);
        assert_eq!(opt.prefix, "");
        assert_eq!(opt.suffix, "");
    }

    #[test]
    fn test_variable_resolve() {
        let ctx: Value = json!({"project": {"name": " TEST "}, "version": 25}).into();
        assert_eq!(variable("{project.name:lower:strip}").resolve(&ctx).unwrap(), "test");
        assert_eq!(variable("{version:04d}").resolve(&ctx).unwrap(), "0025");
        assert_eq!(variable("{version}").resolve(&ctx).unwrap(), "25");
    }

    #[test]
    fn test_variable_not_found_vs_empty() {
        let ctx: Value = json!({"entity": {"mod": ""}}).into();
        assert_eq!(
            variable("{entity.name}").resolve(&ctx).unwrap_err(),
            TemplateError::VariableNotFound {
                name: "entity.name".to_string()
            }
        );
        assert_eq!(
            variable("{entity.mod:upper}").resolve(&ctx).unwrap_err(),
            TemplateError::EmptyValue {
                name: "entity.mod".to_string()
            }
        );
    }

    #[test]
    fn test_optional_outcomes() {
        let ctx: Value = json!({"full": "x", "empty": ""}).into();

        assert_eq!(optional("(_{full}_)").resolve(&ctx, &[]).unwrap(), "_x_");
        assert_eq!(optional("(!_{full}_)").resolve(&ctx, &[]).unwrap(), "_x_");

        assert_eq!(optional("(_{missing}_)").resolve(&ctx, &[]).unwrap(), "");
        assert_eq!(optional("(!_{missing}_)").resolve(&ctx, &[]).unwrap(), "");

        assert_eq!(optional("(_{empty}_)").resolve(&ctx, &[]).unwrap(), "");
        assert_eq!(
            optional("(!_{empty}_)").resolve(&ctx, &[]).unwrap_err(),
            TemplateError::EmptyValue {
                name: "empty".to_string()
            }
        );
    }

    #[test]
    fn test_optional_does_not_swallow_format_errors() {
        let ctx: Value = json!({"name": "abc"}).into();
        let err = optional("({name:04d})").resolve(&ctx, &[]).unwrap_err();
        assert!(matches!(err, TemplateError::Format { .. }));
    }
}
