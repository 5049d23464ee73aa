//! Lexer for variable bodies using logos
//!
//! Only the head of a variable (`name.chain[attr]`) is lexed; the format
//! pipeline after the first colon is free text and split separately.

use logos::Logos;

use crate::error::{ParseError, Span};

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[token(".")]
    Dot,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,

    #[regex(r"\w+", |lex| lex.slice().to_string())]
    Ident(String),

    // Literal attribute keys, used verbatim: ['name'] or ["name"]
    #[regex(r#""[^"]*""#, |lex| unquote(lex.slice()))]
    #[regex(r"'[^']*'", |lex| unquote(lex.slice()))]
    Quoted(String),
}

fn unquote(s: &str) -> String {
    s[1..s.len() - 1].to_string()
}

/// Lex a variable head into tokens with spans
///
/// Unlike free-form DSL input, a variable head has no skippable text: any
/// character the lexer does not recognise is a syntax error.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(t) => Ok((t, span)),
            Err(()) => Err(ParseError::Syntax {
                message: format!("Unexpected character {:?}", &input[span.clone()]),
                span,
                expected: vec![],
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_dotted_chain() {
        assert_eq!(
            kinds("project.name"),
            vec![
                Token::Ident("project".to_string()),
                Token::Dot,
                Token::Ident("name".to_string())
            ]
        );
    }

    #[test]
    fn test_quoted_attribute() {
        assert_eq!(
            kinds("entity['name']"),
            vec![
                Token::Ident("entity".to_string()),
                Token::BracketOpen,
                Token::Quoted("name".to_string()),
                Token::BracketClose
            ]
        );
        assert_eq!(
            kinds(r#"entity["name"]"#),
            vec![
                Token::Ident("entity".to_string()),
                Token::BracketOpen,
                Token::Quoted("name".to_string()),
                Token::BracketClose
            ]
        );
    }

    #[test]
    fn test_digits_are_word_characters() {
        assert_eq!(kinds("v2"), vec![Token::Ident("v2".to_string())]);
        assert_eq!(kinds("0"), vec![Token::Ident("0".to_string())]);
    }

    #[test]
    fn test_unicode_word_characters() {
        assert_eq!(
            kinds("проект.имя_2"),
            vec![
                Token::Ident("проект".to_string()),
                Token::Dot,
                Token::Ident("имя_2".to_string())
            ]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = lex("a.bc").unwrap();
        let spans: Vec<_> = tokens.into_iter().map(|(_, s)| s).collect();
        assert_eq!(spans, vec![0..1, 1..2, 2..4]);
    }

    #[test]
    fn test_whitespace_is_an_error() {
        let err = lex("a b").unwrap_err();
        assert_eq!(err.span(), &(1..2));
        assert!(err.describe().contains("Unexpected character"));
    }
}
