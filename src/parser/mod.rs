//! Parser for the body of `{...}` variable tokens
//!
//! A body is a name chain, an optional `[attr]` and an optional
//! colon-delimited format pipeline:
//!
//! ```text
//! project.name
//! steps[step_name]
//! entity['name']:lower
//! version:04d
//! current_date:%Y-%m-%d
//! ```

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::parse_reference;

use crate::error::ParseError;
use crate::value::format::Pipeline;

/// Parse a full variable body (without the surrounding braces)
pub fn parse_variable(body: &str) -> Result<VariableExpr, ParseError> {
    let (head, formats) = match body.split_once(':') {
        Some((head, formats)) => (head, Some(formats)),
        None => (body, None),
    };

    let reference = parse_reference(head).map_err(first_error)?;

    let pipeline = match formats {
        Some(formats) => {
            let offset = head.len() + 1;
            Pipeline::parse(formats).map_err(|(span, message)| ParseError::Syntax {
                span: span.start + offset..span.end + offset,
                message,
                expected: vec![],
            })?
        }
        None => Pipeline::default(),
    };

    Ok(VariableExpr::new(reference).with_pipeline(pipeline))
}

fn first_error(mut errors: Vec<ParseError>) -> ParseError {
    if errors.is_empty() {
        ParseError::Syntax {
            span: 0..0,
            message: "invalid variable".to_string(),
            expected: vec![],
        }
    } else {
        errors.swap_remove(0)
    }
}
