//! fieldmatch CLI - Command-line interface
//!
//! Commands:
//!   fill     - Fill a form document from a profile
//!   list     - List controls with their guessed profile keys
//!   schema   - Print JSON schemas of the input and output types

use fieldmatch::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "fill" => cmd_fill(&args[2..]),
        "list" => cmd_list(&args[2..]),
        "schema" => cmd_schema(&args[2..]),
        "version" | "--version" | "-v" => {
            println!("fieldmatch {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default `warn` level
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!(
        r#"
fieldmatch - match form fields to a personal-data profile

USAGE:
    fieldmatch <COMMAND> [OPTIONS]

COMMANDS:
    fill <form.yaml> <profile.json>   Fill the form and report per-field outcomes
    list <form.yaml>                  List controls with their guessed profile keys
    schema [name]                     Print JSON schema (form, report, config, listing, profile)
    version                           Print version

OPTIONS:
    --config <file>                   Matcher config (default: fieldmatch.yaml if present)
    --profile <file>                  Profile for `list` (enables similarity matching)
    --output <file>                   Output file (default: stdout)
    --json                            JSON output format

ENVIRONMENT:
    RUST_LOG                          Log filter, e.g. RUST_LOG=fieldmatch=debug

EXAMPLES:
    fieldmatch fill signup.yaml me.json
    fieldmatch fill signup.yaml me.json --json --output filled.json
    fieldmatch list signup.yaml --profile me.json
"#
    );
}

fn cmd_fill(args: &[String]) -> Result<()> {
    let positional = positional_args(args);
    if positional.len() < 2 {
        return Err("Usage: fieldmatch fill <form.yaml> <profile.json>".into());
    }

    let json_output = args.contains(&"--json".to_string());
    let output = parse_output_arg(args);
    let config = load_config(args)?;

    let mut form = FormDocument::load(Path::new(positional[0]))?;
    let store = JsonFileStore::new(positional[1]);

    let mut engine = build_engine(config);
    let report = engine.fill_from_store(&mut form, &store)?;

    let content = if json_output {
        serde_json::to_string_pretty(&report)?
    } else {
        report.to_report()
    };
    write_output(&output, &content)
}

fn cmd_list(args: &[String]) -> Result<()> {
    let positional = positional_args(args);
    let Some(form_path) = positional.first() else {
        return Err("Usage: fieldmatch list <form.yaml> [--profile <profile.json>]".into());
    };

    let json_output = args.contains(&"--json".to_string());
    let output = parse_output_arg(args);
    let config = load_config(args)?;

    let form = FormDocument::load(Path::new(form_path))?;
    let profile = match parse_value_arg(args, "--profile") {
        Some(path) => JsonFileStore::new(path).load_profile()?,
        None => None,
    };

    let mut engine = build_engine(config);
    let fields: Vec<ListedField> = engine.list_fields(&form, profile.as_ref()).collect();

    let content = if json_output {
        serde_json::to_string_pretty(&fields)?
    } else {
        listing_report(&fields)
    };
    write_output(&output, &content)
}

fn listing_report(fields: &[ListedField]) -> String {
    let mut out = String::new();

    out.push_str("FIELD LISTING\n");
    out.push_str("═══════════════════════════════════════════════════════════════\n\n");

    for field in fields {
        out.push_str(&format!(
            "{} <{} type={}>{}\n",
            field.handle,
            field.tag,
            field.input_type,
            if field.fillable { "" } else { " (not fillable)" }
        ));
        if !field.context.label.is_empty() {
            out.push_str(&format!("  label: {:?}\n", field.context.label));
        }
        if !field.context.name.is_empty() {
            out.push_str(&format!("  name: {:?}\n", field.context.name));
        }
        match field.guessed_key {
            Some(key) => out.push_str(&format!(
                "  guess: {} via {} ({:.2})\n",
                key, field.method, field.confidence
            )),
            None => out.push_str("  guess: -\n"),
        }
    }

    out
}

fn cmd_schema(args: &[String]) -> Result<()> {
    let schema_name = args.first().map(|s| s.as_str()).unwrap_or("list");

    match schema_name {
        "list" => {
            println!("Available schemas: form, report, config, listing, profile");
            Ok(())
        }
        "form" => print_schema::<FormSource>(),
        "report" => print_schema::<FillReport>(),
        "config" => print_schema::<MatcherConfig>(),
        "listing" => print_schema::<Vec<ListedField>>(),
        "profile" => print_schema::<std::collections::BTreeMap<ProfileKey, String>>(),
        _ => Err(format!("Unknown schema: {}", schema_name).into()),
    }
}

fn print_schema<T: schemars::JsonSchema>() -> Result<()> {
    let schema = schemars::schema_for!(T);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(feature = "remote")]
fn build_engine(config: MatcherConfig) -> FillEngine {
    match config.remote_endpoint.clone() {
        Some(endpoint) => {
            let classifier = HttpClassifier::new(endpoint, config.remote_api_key.clone());
            FillEngine::with_remote(config, Box::new(classifier))
        }
        None => FillEngine::new(config),
    }
}

#[cfg(not(feature = "remote"))]
fn build_engine(config: MatcherConfig) -> FillEngine {
    if config.remote_endpoint.is_some() {
        tracing::warn!("remote_endpoint is set but fieldmatch was built without the `remote` feature");
    }
    FillEngine::new(config)
}

fn load_config(args: &[String]) -> Result<MatcherConfig> {
    match parse_value_arg(args, "--config") {
        Some(path) => {
            let content = fs::read_to_string(&path).map_err(Error::Io)?;
            MatcherConfig::from_yaml(&content)
        }
        None => MatcherConfig::load(Path::new("fieldmatch.yaml")),
    }
}

const VALUE_FLAGS: [&str; 4] = ["--config", "--profile", "--output", "-o"];

/// Arguments that are neither flags nor flag values
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
        } else if !arg.starts_with('-') {
            positional.push(arg.as_str());
        }
    }
    positional
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if arg == flag {
            if let Some(path) = args.get(i + 1) {
                return Some(PathBuf::from(path));
            }
        }
    }
    None
}

fn parse_output_arg(args: &[String]) -> Option<PathBuf> {
    parse_value_arg(args, "--output").or_else(|| parse_value_arg(args, "-o"))
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).map_err(Error::Io)?;
            eprintln!("Written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
