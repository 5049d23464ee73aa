//! Workspace configuration: template table, constants and solve options
//!
//! Workspaces are described in TOML:
//!
//! ```toml
//! [options]
//! normalize_separators = true
//! max_rounds = 100
//!
//! [constants]
//! root_path = "/mnt/projects"
//!
//! [templates]
//! project_root = "{root_path}/{project.name:lower:strip}"
//!
//! [[template]]
//! name = "publish"
//! pattern = "<project_root>/publish/{entity.name}(_v{version:03d})"
//! ```
//!
//! Both template forms may be used in one file; a name defined twice is an
//! error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::error::TemplateError;
use crate::template::{SolveOptions, TemplateSolver, TemplateTable};
use crate::value::Value;

/// Errors that can occur when loading workspace or context files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid template table: {0}")]
    Template(#[from] TemplateError),
    #[error("Unsupported context file '{path}': expected .json or .toml")]
    UnsupportedFormat { path: String },
}

/// A loaded workspace
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfig {
    templates: TemplateTable,
    /// Base layer of every context resolved in this workspace
    constants: Value,
    options: SolveOptions,
}

/// TOML structure for deserializing workspaces
#[derive(Deserialize)]
struct TomlWorkspace {
    #[serde(default)]
    options: TomlOptions,
    #[serde(default)]
    constants: toml::Table,
    #[serde(default)]
    templates: BTreeMap<String, String>,
    #[serde(default, rename = "template")]
    template_list: Vec<TomlTemplate>,
}

#[derive(Deserialize, Default)]
struct TomlOptions {
    normalize_separators: Option<bool>,
    max_rounds: Option<usize>,
}

#[derive(Deserialize)]
struct TomlTemplate {
    name: String,
    pattern: String,
}

impl WorkspaceConfig {
    /// Load a workspace from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a workspace from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlWorkspace = toml::from_str(content)?;

        let mut templates = TemplateTable::new();
        for (name, pattern) in parsed.templates {
            templates.insert(name, pattern)?;
        }
        for template in parsed.template_list {
            templates.insert(template.name, template.pattern)?;
        }

        let defaults = SolveOptions::default();
        let options = SolveOptions {
            normalize_separators: parsed
                .options
                .normalize_separators
                .unwrap_or(defaults.normalize_separators),
            max_rounds: parsed.options.max_rounds.unwrap_or(defaults.max_rounds),
        };

        Ok(WorkspaceConfig {
            templates,
            constants: toml::Value::Table(parsed.constants).into(),
            options,
        })
    }

    pub fn table(&self) -> &TemplateTable {
        &self.templates
    }

    pub fn constants(&self) -> &Value {
        &self.constants
    }

    pub fn solve_options(&self) -> &SolveOptions {
        &self.options
    }

    /// A solver over this workspace's templates and options
    pub fn solver(&self) -> TemplateSolver {
        TemplateSolver::new(self.templates.clone()).with_options(self.options)
    }

    /// Layer `overlay` over the workspace constants
    pub fn context(&self, overlay: Value) -> Value {
        let mut context = self.constants.clone();
        context.merge(overlay);
        context
    }
}

/// Load a context tree from a `.json` or `.toml` file
pub fn load_context(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            let value: serde_json::Value = serde_json::from_str(&content)?;
            Ok(value.into())
        }
        Some("toml") => {
            let table: toml::Table = toml::from_str(&content)?;
            Ok(toml::Value::Table(table).into())
        }
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}
