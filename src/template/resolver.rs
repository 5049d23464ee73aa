//! Template resolution - expands a named template against a context

use tracing::{debug, trace};

use crate::error::TemplateError;
use crate::template::registry::TemplateTable;
use crate::template::token::Token;
use crate::template::tokenizer::{Tokenizer, DEFAULT_MAX_ROUNDS};
use crate::value::Value;

/// Per-call resolution settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOptions {
    /// Collapse runs of `/` and of `\` in the final string
    pub normalize_separators: bool,
    /// Tokenizer round ceiling for every template in the call tree
    pub max_rounds: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            normalize_separators: true,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl SolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalize_separators(mut self, enabled: bool) -> Self {
        self.normalize_separators = enabled;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }
}

/// Resolves templates from a table against caller-supplied contexts
///
/// The solver never mutates its table, so one instance can serve any number
/// of concurrent `solve` calls.
#[derive(Debug, Clone, Default)]
pub struct TemplateSolver {
    templates: TemplateTable,
    options: SolveOptions,
}

impl TemplateSolver {
    pub fn new(templates: TemplateTable) -> Self {
        Self {
            templates,
            options: SolveOptions::default(),
        }
    }

    /// Set the options used by [`TemplateSolver::solve`]
    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    /// Resolve the template `name` with the solver's default options
    pub fn solve(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        self.solve_with(name, context, &self.options)
    }

    /// Resolve the template `name` with explicit options
    ///
    /// Any failure aborts the whole call; there are no partial results.
    pub fn solve_with(
        &self,
        name: &str,
        context: &Value,
        options: &SolveOptions,
    ) -> Result<String, TemplateError> {
        debug!(template = name, "solving template");
        let mut ctx = ResolutionContext::new(&self.templates, context, options);
        let resolved = ctx.resolve_named(name)?;
        Ok(finish(resolved, options))
    }

    /// Resolve a template string that is not in the table
    ///
    /// External references inside it are still looked up in the table.
    pub fn solve_str(&self, template: &str, context: &Value) -> Result<String, TemplateError> {
        self.solve_str_with(template, context, &self.options)
    }

    pub fn solve_str_with(
        &self,
        template: &str,
        context: &Value,
        options: &SolveOptions,
    ) -> Result<String, TemplateError> {
        debug!(template, "solving inline template");
        let mut ctx = ResolutionContext::new(&self.templates, context, options);
        let resolved = ctx.resolve_text(template)?;
        Ok(finish(resolved, options))
    }
}

fn finish(resolved: String, options: &SolveOptions) -> String {
    if options.normalize_separators {
        normalize_separators(&resolved)
    } else {
        resolved
    }
}

/// Collapse runs of `/` into one `/` and runs of `\` into one `\`
pub fn normalize_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev = None;
    for c in path.chars() {
        if (c == '/' || c == '\\') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// State of one top-level `solve` call
struct ResolutionContext<'a> {
    templates: &'a TemplateTable,
    context: &'a Value,
    tokenizer: Tokenizer,
    /// Templates currently being resolved, outermost first (cycle detection)
    active: Vec<String>,
}

impl<'a> ResolutionContext<'a> {
    fn new(templates: &'a TemplateTable, context: &'a Value, options: &SolveOptions) -> Self {
        Self {
            templates,
            context,
            tokenizer: Tokenizer::new(options.max_rounds),
            active: Vec::new(),
        }
    }

    fn resolve_named(&mut self, name: &str) -> Result<String, TemplateError> {
        if let Some(pos) = self.active.iter().position(|n| n == name) {
            let mut chain = self.active[pos..].to_vec();
            chain.push(name.to_string());
            return Err(TemplateError::CyclicReference {
                chain: chain.join(" -> "),
            });
        }

        let templates = self.templates;
        let pattern = templates
            .get(name)
            .filter(|pattern| !pattern.is_empty())
            .ok_or_else(|| TemplateError::TemplateNotFound {
                name: name.to_string(),
            })?;

        self.active.push(name.to_string());
        let result = self
            .resolve_text(pattern)
            .map_err(|err| err.in_template(name));
        self.active.pop();
        result
    }

    fn resolve_text(&mut self, template: &str) -> Result<String, TemplateError> {
        let tokenized = self.tokenizer.tokenize(template)?;
        if tokenized.is_literal() {
            return Ok(tokenized.skeleton().to_string());
        }
        let mut resolved: Vec<String> = Vec::with_capacity(tokenized.tokens().len());

        for token in tokenized.tokens() {
            let text = match token {
                // Nested templates are always normalized; the option only
                // governs the outermost string
                Token::External(ext) => normalize_separators(&self.resolve_named(ext.resolve())?),
                Token::Variable(var) => var.resolve(self.context)?,
                Token::Optional(opt) => opt.resolve(self.context, &resolved)?,
            };
            trace!(token = token.source(), resolved = %text, "resolved token");
            resolved.push(text);
        }

        Ok(tokenized.render(&resolved))
    }
}
