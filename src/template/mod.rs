//! Path templates
//!
//! A template is plain text interleaved with tokens:
//!
//! ```text
//! <project_root>/{entity.name:lower}/(_v{version:03d})/(!{entity.mod})
//! ```
//!
//! Templates live in a [`TemplateTable`]. A [`TemplateSolver`] resolves one by
//! name against a context [`Value`](crate::Value): the template is tokenized,
//! each token resolved in extraction order (`<name>` recursing into the
//! table), the results substituted back into the skeleton and the separators
//! normalized.
//!
//! # Example
//!
//! ```rust
//! use path_solver::{TemplateSolver, TemplateTable, Value};
//!
//! let mut table = TemplateTable::new();
//! table.insert("root", "{base}").unwrap();
//! table.insert("asset", "<root>/{entity.name:lower}/(!{entity.mod})").unwrap();
//!
//! let context: Value = serde_json::json!({
//!     "base": "/mnt",
//!     "entity": {"name": "Asset1", "mod": "mod1"}
//! })
//! .into();
//!
//! let solver = TemplateSolver::new(table);
//! assert_eq!(solver.solve("asset", &context).unwrap(), "/mnt/asset1/mod1");
//! ```

mod registry;
mod resolver;
pub mod token;
pub mod tokenizer;

pub use registry::TemplateTable;
pub use resolver::{normalize_separators, SolveOptions, TemplateSolver};
pub use token::{ExternalToken, OptionalToken, Token, TokenKind, VariableToken};
pub use tokenizer::{Tokenized, Tokenizer, DEFAULT_MAX_ROUNDS};
