//! Splits a raw template into tokens and a placeholder skeleton

use tracing::trace;

use crate::error::TemplateError;
use crate::template::token::{Token, TokenKind};

/// Default ceiling on tokenization rounds (one token per round)
pub const DEFAULT_MAX_ROUNDS: usize = 100;

// Placeholders are built from private-use characters, which templates may not
// contain, so authors cannot produce one by accident.
const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

/// Placeholder for the token at `index`
pub fn placeholder(index: usize) -> String {
    format!("{}{}{}", OPEN, index, CLOSE)
}

/// Replace every placeholder in `text` with the matching entry of `values`
///
/// Placeholders without a matching entry are left untouched.
pub fn substitute(text: &str, values: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len_utf8()..];
        let entry = after.find(CLOSE).and_then(|end| {
            after[..end]
                .parse::<usize>()
                .ok()
                .and_then(|index| values.get(index))
                .map(|value| (value, end))
        });
        match entry {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + CLOSE.len_utf8()..];
            }
            None => {
                out.push(OPEN);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Result of tokenizing one template
#[derive(Debug, Clone, PartialEq)]
pub struct Tokenized {
    skeleton: String,
    tokens: Vec<Token>,
}

impl Tokenized {
    /// Template text with every token replaced by its placeholder
    pub fn skeleton(&self) -> &str {
        &self.skeleton
    }

    /// Tokens in extraction order; token `i` owns placeholder `i`
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// True when the template has no tokens at all
    pub fn is_literal(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Fill the skeleton with the resolved text of each token
    pub fn render(&self, resolved: &[String]) -> String {
        substitute(&self.skeleton, resolved)
    }
}

/// Precedence-ordered template scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    max_rounds: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROUNDS)
    }
}

impl Tokenizer {
    pub fn new(max_rounds: usize) -> Self {
        Self { max_rounds }
    }

    /// Extract tokens until no pattern matches
    ///
    /// Each round takes the leftmost match of the first pattern (External,
    /// then Optional, then Variable) that matches anywhere, and swaps it for
    /// a placeholder. Running out of rounds while something still matches is
    /// a `TooComplex` error.
    pub fn tokenize(&self, template: &str) -> Result<Tokenized, TemplateError> {
        if let Some((pos, c)) = template
            .char_indices()
            .find(|(_, c)| *c == OPEN || *c == CLOSE)
        {
            return Err(TemplateError::Malformed {
                template: String::new(),
                token: c.to_string(),
                span: pos..pos + c.len_utf8(),
                message: "reserved character in template".to_string(),
            });
        }

        let mut working = template.to_string();
        let mut tokens: Vec<Token> = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        while let Some((kind, range)) = next_match(&working) {
            if tokens.len() >= self.max_rounds {
                return Err(TemplateError::TooComplex {
                    template: template.to_string(),
                    limit: self.max_rounds,
                });
            }

            let raw = &working[range.clone()];
            let source = substitute(raw, &sources);
            let start = substitute(&working[..range.start], &sources).len();
            let span = start..start + source.len();
            trace!(kind = ?kind, token = %source, ?span, "extracted token");

            let token = Token::parse(kind, raw, source.clone(), span)?;
            working.replace_range(range, &placeholder(tokens.len()));
            tokens.push(token);
            sources.push(source);
        }

        Ok(Tokenized {
            skeleton: working,
            tokens,
        })
    }
}

fn next_match(text: &str) -> Option<(TokenKind, std::ops::Range<usize>)> {
    TokenKind::PRECEDENCE
        .iter()
        .find_map(|kind| kind.find(text).map(|range| (*kind, range)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(tokenized: &Tokenized) -> Vec<TokenKind> {
        tokenized.tokens().iter().map(|t| t.kind()).collect()
    }

    #[test]
    fn test_literal_template() {
        let tokenized = Tokenizer::default().tokenize("/mnt/projects").unwrap();
        assert!(tokenized.is_literal());
        assert_eq!(tokenized.skeleton(), "/mnt/projects");
        assert_eq!(tokenized.render(&[]), "/mnt/projects");
    }

    #[test]
    fn test_externals_come_first() {
        let tokenized = Tokenizer::default()
            .tokenize("{a}/<root>/(_{b})")
            .unwrap();
        assert_eq!(
            kinds(&tokenized),
            vec![TokenKind::External, TokenKind::Optional, TokenKind::Variable]
        );
        assert_eq!(
            tokenized.skeleton(),
            format!("{}/{}/{}", placeholder(2), placeholder(0), placeholder(1))
        );
    }

    #[test]
    fn test_optional_is_one_unit() {
        let tokenized = Tokenizer::default().tokenize("(v{version:03d})").unwrap();
        assert_eq!(kinds(&tokenized), vec![TokenKind::Optional]);
    }

    #[test]
    fn test_spans_point_into_original() {
        let template = "<root>/{entity.name:lower}/(!{entity.mod})";
        let tokenized = Tokenizer::default().tokenize(template).unwrap();
        for token in tokenized.tokens() {
            assert_eq!(&template[token.span().clone()], token.source());
        }
    }

    #[test]
    fn test_spans_after_earlier_replacement() {
        // The variable is extracted last, after both externals were replaced
        let template = "<a>/<bb>/{x}";
        let tokenized = Tokenizer::default().tokenize(template).unwrap();
        let var = &tokenized.tokens()[2];
        assert_eq!(var.source(), "{x}");
        assert_eq!(var.span(), &(9..12));
    }

    #[test]
    fn test_render_substitutes() {
        let tokenized = Tokenizer::default().tokenize("{a}-{b}").unwrap();
        assert_eq!(
            tokenized.render(&["x".to_string(), "y".to_string()]),
            "x-y"
        );
    }

    #[test]
    fn test_external_inside_optional_prefix() {
        let tokenized = Tokenizer::default().tokenize("(<root>/{v})").unwrap();
        assert_eq!(
            kinds(&tokenized),
            vec![TokenKind::External, TokenKind::Optional]
        );
        assert_eq!(tokenized.tokens()[1].source(), "(<root>/{v})");
        assert_eq!(tokenized.tokens()[1].span(), &(0..12));
    }

    #[test]
    fn test_round_ceiling_is_an_error() {
        let template = "{a}".repeat(5);
        let err = Tokenizer::new(4).tokenize(&template).unwrap_err();
        assert_eq!(
            err,
            TemplateError::TooComplex {
                template,
                limit: 4
            }
        );
        assert!(Tokenizer::new(5).tokenize(&"{a}".repeat(5)).is_ok());
    }

    #[test]
    fn test_reserved_characters_rejected() {
        let err = Tokenizer::default().tokenize("a\u{E000}0\u{E001}").unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { span, .. } if span == (1..4)));
    }

    #[test]
    fn test_malformed_token_aborts() {
        let err = Tokenizer::default().tokenize("/x/{a b}").unwrap_err();
        match err {
            TemplateError::Malformed { token, span, .. } => {
                assert_eq!(token, "{a b}");
                assert_eq!(span, 5..6);
            }
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_substitute_ignores_unknown_placeholders() {
        let text = format!("a{}b", placeholder(3));
        assert_eq!(substitute(&text, &["x".to_string()]), text);
    }

    #[test]
    fn test_stray_parens_and_brackets_stay_literal() {
        let tokenized = Tokenizer::default().tokenize("a(b)c > d").unwrap();
        assert!(tokenized.is_literal());
    }
}
