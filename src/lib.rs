//! Path Solver - resolves path templates for a media-production pipeline
//!
//! Storage locations (project roots, publish paths, review paths) are written
//! as small templates and resolved against a runtime context of named values.
//!
//! # Example
//!
//! ```rust
//! use path_solver::{TemplateSolver, TemplateTable, Value};
//!
//! let table: TemplateTable = [
//!     ("root", "/mnt/projects"),
//!     ("publish", "<root>/{project.name:lower}//v{version:03d}"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let context: Value = serde_json::json!({
//!     "project": {"name": "Demo"},
//!     "version": 3
//! })
//! .into();
//!
//! let path = TemplateSolver::new(table).solve("publish", &context).unwrap();
//! assert_eq!(path, "/mnt/projects/demo/v003");
//! ```

pub mod config;
pub mod error;
pub mod parser;
pub mod template;
pub mod value;

pub use config::{load_context, ConfigError, WorkspaceConfig};
pub use error::{ParseError, TemplateError};
pub use template::{normalize_separators, SolveOptions, TemplateSolver, TemplateTable, Tokenizer};
pub use value::{FieldObject, Value};

/// Resolve a single template string against a context with default options
///
/// The string may not reference other templates; use [`TemplateSolver`] with a
/// [`TemplateTable`] for that.
///
/// # Example
///
/// ```rust
/// use path_solver::{solve_str, Value};
///
/// let context: Value = [("name", " Hero ")].into_iter().collect();
/// assert_eq!(solve_str("/assets/{name:strip:lower}", &context).unwrap(), "/assets/hero");
/// ```
pub fn solve_str(template: &str, context: &Value) -> Result<String, TemplateError> {
    TemplateSolver::default().solve_str(template, context)
}
