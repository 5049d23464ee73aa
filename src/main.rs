//! Path Solver CLI
//!
//! Usage:
//!   path-solver [OPTIONS] <TEMPLATE>
//!
//! Options:
//!   -c, --config <FILE>     Workspace file with templates, constants and options (TOML)
//!   -x, --context <FILE>    Context file (.json or .toml)
//!   -s, --set <KEY=VALUE>   Context override with a dotted key, repeatable
//!   -i, --inline            Treat TEMPLATE as a template string instead of a name
//!   --no-fix-slashes        Keep repeated path separators
//!   --list                  List template names and exit
//!   --check                 Validate the template table and exit
//!   -v, --verbose           Debug logging
//!   -h, --help              Print help

use std::path::PathBuf;

use clap::Parser;

use path_solver::{load_context, TemplateError, Value, WorkspaceConfig};

#[derive(Parser)]
#[command(name = "path-solver")]
#[command(about = "Resolve pipeline path templates against a context")]
struct Cli {
    /// Template name, or a template string with --inline
    #[arg(required_unless_present_any = ["list", "check"])]
    template: Option<String>,

    /// Workspace file with templates, constants and options (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Context file (.json or .toml)
    #[arg(short = 'x', long)]
    context: Option<PathBuf>,

    /// Context override, e.g. `entity.name=hero` (repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Treat TEMPLATE as a template string instead of a name
    #[arg(short, long)]
    inline: bool,

    /// Keep repeated path separators
    #[arg(long)]
    no_fix_slashes: bool,

    /// List template names and exit
    #[arg(long)]
    list: bool,

    /// Validate the template table and exit
    #[arg(long)]
    check: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    // Load workspace
    let workspace = match &cli.config {
        Some(path) => match WorkspaceConfig::from_file(path) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("Error loading workspace '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => WorkspaceConfig::default(),
    };

    if cli.list {
        for name in workspace.table().names() {
            println!("{}", name);
        }
        return;
    }

    if cli.check {
        match workspace.table().validate() {
            Ok(()) => println!("{} templates OK", workspace.table().len()),
            Err(errors) => {
                for err in &errors {
                    print_error(err, &workspace, None);
                }
                std::process::exit(1);
            }
        }
        return;
    }

    let Some(template) = cli.template.as_deref() else {
        eprintln!("Error: no template given");
        std::process::exit(1);
    };

    // Build context: workspace constants, then context file, then overrides
    let mut overlay = match &cli.context {
        Some(path) => match load_context(path) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error loading context '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Value::mapping(),
    };
    for assignment in &cli.set {
        match parse_assignment(assignment) {
            Some((key, value)) => overlay.set_path(key, value),
            None => {
                eprintln!("Error: invalid --set '{}', expected KEY=VALUE", assignment);
                std::process::exit(1);
            }
        }
    }
    let context = workspace.context(overlay);

    let options = workspace
        .solve_options()
        .with_normalize_separators(!cli.no_fix_slashes && workspace.solve_options().normalize_separators);
    let solver = workspace.solver();
    let result = if cli.inline {
        solver.solve_str_with(template, &context, &options)
    } else {
        solver.solve_with(template, &context, &options)
    };

    match result {
        Ok(path) => println!("{}", path),
        Err(e) => {
            let inline = cli.inline.then_some(template);
            print_error(&e, &workspace, inline);
            std::process::exit(1);
        }
    }
}

/// `key.path=value`; the value is read as JSON when it parses, else as a string
fn parse_assignment(assignment: &str) -> Option<(&str, Value)> {
    let (key, raw) = assignment.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => json.into(),
        Err(_) => Value::from(raw),
    };
    Some((key, value))
}

fn print_error(err: &TemplateError, workspace: &WorkspaceConfig, inline: Option<&str>) {
    let source = match err.template() {
        Some(name) => workspace.table().get(name),
        None => inline,
    };
    match (err, source) {
        (TemplateError::Malformed { .. }, Some(source)) => eprint!("{}", err.report(source)),
        _ => eprintln!("Error: {}", err),
    }
}
