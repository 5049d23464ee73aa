//! Variable head parser using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::parser::ast::{Attribute, VariableRef};
use crate::parser::lexer::Token;

/// Parse `name.chain` or `name.chain[attr]` into a [`VariableRef`]
pub fn parse_reference(input: &str) -> Result<VariableRef, Vec<ParseError>> {
    let len = input.len();

    let tokens = crate::parser::lexer::lex(input).map_err(|e| vec![e])?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    reference_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn reference_parser<'a, I>() -> impl Parser<'a, I, VariableRef, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let name = select! {
        Token::Ident(s) => s,
    }
    .labelled("name");

    // chain: name { "." name }
    let chain = name
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<_>>();

    let quoted = select! {
        Token::Quoted(s) => s,
    }
    .labelled("quoted key");

    let attribute = choice((
        quoted.map(Attribute::Literal),
        chain.clone().map(Attribute::Chain),
    ))
    .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    chain
        .then(attribute.or_not())
        .then_ignore(end())
        .map(|(chain, attribute)| VariableRef { chain, attribute })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_name() {
        let var = parse_reference("version").expect("Should parse");
        assert_eq!(var.chain, chain(&["version"]));
        assert!(var.attribute.is_none());
    }

    #[test]
    fn test_dotted_chain() {
        let var = parse_reference("roots.main.path").expect("Should parse");
        assert_eq!(var.chain, chain(&["roots", "main", "path"]));
    }

    #[test]
    fn test_literal_attribute() {
        let var = parse_reference("entity['name']").expect("Should parse");
        assert_eq!(var.chain, chain(&["entity"]));
        assert_eq!(var.attribute, Some(Attribute::Literal("name".to_string())));
    }

    #[test]
    fn test_dynamic_attribute() {
        let var = parse_reference("steps[context.step_name]").expect("Should parse");
        assert_eq!(var.chain, chain(&["steps"]));
        assert_eq!(
            var.attribute,
            Some(Attribute::Chain(chain(&["context", "step_name"])))
        );
    }

    #[test]
    fn test_empty_segment_rejected() {
        assert!(parse_reference("a..b").is_err());
        assert!(parse_reference(".a").is_err());
        assert!(parse_reference("a.").is_err());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let errs = parse_reference("a[b]c").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].span(), &(4..5));
    }

    #[test]
    fn test_unclosed_attribute_rejected() {
        assert!(parse_reference("a[b").is_err());
        assert!(parse_reference("a[]").is_err());
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(parse_reference("").is_err());
    }
}
