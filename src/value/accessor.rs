//! Walks name chains through a context tree

use std::borrow::Cow;

use crate::error::TemplateError;
use crate::parser::ast::{Attribute, VariableRef};
use crate::value::Value;

/// Follow `chain` from `root`, one segment at a time
///
/// Returns `None` as soon as a segment is missing or the current value has
/// no named children.
pub fn lookup<'v, S: AsRef<str>>(root: &'v Value, chain: &[S]) -> Option<Cow<'v, Value>> {
    let mut current = Cow::Borrowed(root);
    for segment in chain {
        current = match current {
            Cow::Borrowed(value) => value.get(segment.as_ref())?,
            Cow::Owned(value) => Cow::Owned(value.get(segment.as_ref())?.into_owned()),
        };
    }
    Some(current)
}

/// Resolve a variable reference to its raw value
///
/// A dynamic attribute (`steps[step_name]`) is itself resolved first and must
/// be present and non-empty; its string form becomes the last segment.
pub fn resolve<'v>(root: &'v Value, var: &VariableRef) -> Result<Cow<'v, Value>, TemplateError> {
    let not_found = || TemplateError::VariableNotFound {
        name: var.to_string(),
    };

    let key = match &var.attribute {
        None => None,
        Some(Attribute::Literal(key)) => Some(key.clone()),
        Some(Attribute::Chain(chain)) => {
            let inner = VariableRef::new(chain.clone());
            let value = resolve(root, &inner)?;
            if value.is_empty() {
                return Err(TemplateError::EmptyValue {
                    name: inner.to_string(),
                });
            }
            Some(value.to_string())
        }
    };

    let base = lookup(root, &var.chain).ok_or_else(not_found)?;
    match key {
        None => Ok(base),
        Some(key) => match base {
            Cow::Borrowed(value) => value.get(&key).ok_or_else(not_found),
            Cow::Owned(value) => value
                .get(&key)
                .map(|v| Cow::Owned(v.into_owned()))
                .ok_or_else(not_found),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn context() -> Value {
        json!({
            "project": {"name": " TEST "},
            "entity": {"name": "Asset1", "variant": ""},
            "step_name": "model",
            "empty_key": "",
            "steps": {"model": "MODELING", "txd": "TEXTURING"},
            "shots": ["sh010", "sh020"]
        })
        .into()
    }

    fn var(chain: &[&str]) -> VariableRef {
        VariableRef::new(chain.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_lookup_nested() {
        let ctx = context();
        let value = lookup(&ctx, &["project", "name"]).unwrap();
        assert_eq!(value.as_str(), Some(" TEST "));
    }

    #[test]
    fn test_lookup_sequence_index() {
        let ctx = context();
        assert_eq!(lookup(&ctx, &["shots", "1"]).unwrap().as_str(), Some("sh020"));
        assert!(lookup(&ctx, &["shots", "5"]).is_none());
    }

    #[test]
    fn test_lookup_missing() {
        let ctx = context();
        assert!(lookup(&ctx, &["project", "code"]).is_none());
        assert!(lookup(&ctx, &["project", "name", "deeper"]).is_none());
    }

    #[test]
    fn test_lookup_empty_chain_is_root() {
        let ctx = context();
        let chain: [&str; 0] = [];
        assert_eq!(lookup(&ctx, &chain).unwrap().into_owned(), ctx);
    }

    #[test]
    fn test_resolve_literal_attribute() {
        let ctx = context();
        let v = var(&["entity"]).with_attribute(Attribute::Literal("name".into()));
        assert_eq!(resolve(&ctx, &v).unwrap().as_str(), Some("Asset1"));
    }

    #[test]
    fn test_resolve_dynamic_attribute() {
        let ctx = context();
        let v = var(&["steps"]).with_attribute(Attribute::Chain(vec!["step_name".into()]));
        assert_eq!(resolve(&ctx, &v).unwrap().as_str(), Some("MODELING"));
    }

    #[test]
    fn test_resolve_found_but_empty_is_ok() {
        // Emptiness of the final value is the caller's concern
        let ctx = context();
        let value = resolve(&ctx, &var(&["entity", "variant"])).unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_resolve_not_found_names_variable() {
        let ctx = context();
        let err = resolve(&ctx, &var(&["entity", "mod"])).unwrap_err();
        assert_eq!(
            err,
            TemplateError::VariableNotFound {
                name: "entity.mod".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_dynamic_attribute_missing_key() {
        let ctx = context();
        let v = var(&["steps"]).with_attribute(Attribute::Chain(vec!["nope".into()]));
        assert_eq!(
            resolve(&ctx, &v).unwrap_err(),
            TemplateError::VariableNotFound {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_dynamic_attribute_empty_key() {
        let ctx = context();
        let v = var(&["steps"]).with_attribute(Attribute::Chain(vec!["empty_key".into()]));
        assert_eq!(
            resolve(&ctx, &v).unwrap_err(),
            TemplateError::EmptyValue {
                name: "empty_key".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_attribute_value_missing_in_target() {
        let ctx: Value = json!({"step_name": "light", "steps": {"model": "M"}}).into();
        let v = var(&["steps"]).with_attribute(Attribute::Chain(vec!["step_name".into()]));
        assert_eq!(
            resolve(&ctx, &v).unwrap_err(),
            TemplateError::VariableNotFound {
                name: "steps[step_name]".to_string()
            }
        );
    }
}
