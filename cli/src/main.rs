use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use generator_form_core::{FormModel, OptionValue, Snapshot, parse_invocation, serialize_args};
use generator_form_session::{FormConfig, FormEvent, FormSession};
use serde::Serialize;
use tracing::debug;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "generator-form")]
#[command(about = "Normalize generator schemas, fill in option forms and assemble invocations")]
struct Cli {
    /// Raise the default log level to debug.
    #[arg(long, short, global = true)]
    verbose: bool,
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize a schema document and print the resulting descriptors.
    Normalize(NormalizeArgs),
    /// Seed a form, apply edits and print every field's state.
    Form(FormArgs),
    /// Seed a form, apply edits and print the resulting command line.
    Serialize(SerializeArgs),
    /// Parse a command line against a schema and print the option values.
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Schema document (JSON or YAML, by extension).
    #[arg(long)]
    schema: PathBuf,
}

#[derive(Debug, Args)]
struct EditArgs {
    /// Set a field, as `name=value`. Arrays take a comma-separated list.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    sets: Vec<String>,
    /// Reset a field to its default after all `--set` edits.
    #[arg(long = "reset", value_name = "NAME")]
    resets: Vec<String>,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct FormArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    edits: EditArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct SerializeArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    edits: EditArgs,
    /// Print the unquoted argument vector as JSON instead of a command line.
    #[arg(long)]
    args: bool,
    /// Print the invocation even if some fields fail validation.
    #[arg(long)]
    allow_invalid: bool,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    schema: SchemaArgs,
    /// Command line to parse.
    line: String,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

/// Output of the `form` subcommand.
#[derive(Serialize)]
struct FormOutput<'a> {
    generator: &'a str,
    valid: bool,
    dirty: bool,
    command_line: String,
    fields: Snapshot<'a>,
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let result = load_config(cli.config).and_then(|config| match cli.command {
        Command::Normalize(args) => run_normalize(args, &config),
        Command::Form(args) => run_form(args, &config),
        Command::Serialize(args) => run_serialize(args, &config),
        Command::Parse(args) => run_parse(args, &config),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("generator_form=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<FormConfig, String> {
    match path {
        Some(path) => FormConfig::load(&path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display())),
        None => Ok(FormConfig::default()),
    }
}

fn open_session(args: &SchemaArgs, config: &FormConfig) -> Result<FormSession, String> {
    FormSession::open(&args.schema, config)
        .map_err(|err| format!("Failed to load schema '{}': {err}", args.schema.display()))
}

fn run_normalize(args: NormalizeArgs, config: &FormConfig) -> Result<(), String> {
    let session = open_session(&args.schema, config)?;
    println!("{}", format_output(session.form().schema(), args.format)?);
    Ok(())
}

fn run_form(args: FormArgs, config: &FormConfig) -> Result<(), String> {
    let mut session = open_session(&args.schema, config)?;
    apply_edits(&mut session, &args.edits)?;

    let form = session.form();
    let output = FormOutput {
        generator: &form.schema().name,
        valid: !form.has_errors(),
        dirty: form.is_dirty(),
        command_line: session.command_line(),
        fields: form.snapshot(),
    };
    println!("{}", format_output(&output, args.format)?);
    Ok(())
}

fn run_serialize(args: SerializeArgs, config: &FormConfig) -> Result<(), String> {
    let mut session = open_session(&args.schema, config)?;
    apply_edits(&mut session, &args.edits)?;

    let form = session.form();
    if !args.allow_invalid && form.has_errors() {
        return Err(format!("form is invalid: {}", describe_errors(form)));
    }

    if args.args {
        let raw = serde_json::to_string(&serialize_args(form))
            .map_err(|err| format!("JSON serialization failed: {err}"))?;
        println!("{raw}");
    } else {
        println!("{}", session.command_line());
    }
    Ok(())
}

fn run_parse(args: ParseArgs, config: &FormConfig) -> Result<(), String> {
    let session = open_session(&args.schema, config)?;
    let values = parse_invocation(session.form().schema(), &args.line)
        .map_err(|err| err.to_string())?;
    println!("{}", format_output(&values, args.format)?);
    Ok(())
}

/// Queues `--set` edits in order, then `--reset` edits, and applies them.
fn apply_edits(session: &mut FormSession, edits: &EditArgs) -> Result<(), String> {
    for assignment in &edits.sets {
        let (name, text) = assignment
            .split_once('=')
            .ok_or_else(|| format!("Invalid --set '{assignment}': expected NAME=VALUE"))?;
        let value = parse_field_value(session.form(), name, text)?;
        session.submit(FormEvent::SetValue {
            name: name.to_string(),
            value,
        });
    }
    for name in &edits.resets {
        session.submit(FormEvent::Reset { name: name.clone() });
    }

    debug!(edits = session.pending(), "Applying edits");
    for outcome in session.drain() {
        outcome.map_err(|err| err.to_string())?;
    }
    Ok(())
}

fn parse_field_value(form: &FormModel, name: &str, text: &str) -> Result<OptionValue, String> {
    let descriptor = form
        .schema()
        .option(name)
        .ok_or_else(|| format!("unknown field: {name}"))?;
    descriptor
        .kind
        .parse_literal(text)
        .ok_or_else(|| format!("Invalid value '{text}' for {name}: expected {}", descriptor.kind))
}

fn describe_errors(form: &FormModel) -> String {
    form.snapshot()
        .errors()
        .map(|(field, err)| format!("{field}: {err}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_output<T: Serialize + ?Sized>(
    value: &T,
    format: CliOutputFormat,
) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}
