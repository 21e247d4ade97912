//! Command-line interface for the 4GL / PER grammars
//!
//! Usage:
//!   fglg build [--config `<file>`] [--format plist|json] [--output-dir `<dir>`]
//!   fglg resolve `<path>` [--kind source|form] [--format yaml|json]
//!   fglg check [--config `<file>`] [--deny-unresolved]

use clap::{Arg, ArgAction, ArgMatches, Command};
use fgl_grammars::grammar::{build_grammars, unresolved_placeholders, GrammarKind, GrammarLoader};
use fgl_grammars::logging;
use fgl_grammars::settings::{Loader, Settings};
use std::process::ExitCode;

const DEFAULT_CONFIG: &str = "fglg.toml";

fn cli() -> Command {
    let config = Arg::new("config")
        .long("config")
        .short('c')
        .help("Configuration file layered over the defaults (default: ./fglg.toml if present)");

    Command::new("fglg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build and inspect the 4GL and PER syntax grammars")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log debug output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("build")
                .about("Resolve both grammars and write them to their output files")
                .arg(config.clone())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["plist", "json"]),
                )
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .short('o')
                        .help("Directory the grammars are written to"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Print one grammar with its variables resolved")
                .arg(
                    Arg::new("path")
                        .help("Path to a YAML grammar")
                        .required(true)
                        .index(1),
                )
                .arg(config.clone())
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .short('k')
                        .help("Apply the configured variable overrides of this grammar (source or form)"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["yaml", "json"])
                        .default_value("yaml"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("List placeholders the configured grammars leave unresolved")
                .arg(config)
                .arg(
                    Arg::new("deny-unresolved")
                        .long("deny-unresolved")
                        .help("Exit with an error if any placeholder is unresolved")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let (name, sub) = match matches.subcommand() {
        Some(found) => found,
        None => return ExitCode::FAILURE,
    };

    let settings = match load_settings(name, sub) {
        Ok(settings) => settings,
        Err(message) => {
            eprintln!("Configuration error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let level = if verbose { "debug" } else { settings.logging.level.as_str() };
    if let Err(err) = logging::init(level) {
        eprintln!("{err}");
    }

    match name {
        "build" => handle_build_command(&settings),
        "resolve" => handle_resolve_command(&settings, sub),
        "check" => handle_check_command(&settings, sub.get_flag("deny-unresolved")),
        _ => ExitCode::FAILURE,
    }
}

/// Defaults, then the config file, then command-line overrides
fn load_settings(command: &str, sub: &ArgMatches) -> Result<Settings, String> {
    let mut loader = match sub.get_one::<String>("config") {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file(DEFAULT_CONFIG),
    };
    if command == "build" {
        if let Some(format) = sub.get_one::<String>("format") {
            loader = loader
                .set_override("build.format", format.as_str())
                .map_err(|e| e.to_string())?;
        }
        if let Some(dir) = sub.get_one::<String>("output-dir") {
            loader = loader
                .set_override("build.output_dir", dir.as_str())
                .map_err(|e| e.to_string())?;
        }
    }
    loader.build().map_err(|e| e.to_string())
}

fn handle_build_command(settings: &Settings) -> ExitCode {
    let mut failed = false;
    for outcome in build_grammars(settings) {
        match outcome.result {
            Ok(built) => {
                println!("{}: wrote {}", outcome.kind, built.output.display());
                if !built.unresolved.is_empty() {
                    println!(
                        "{}: {} placeholder(s) left unresolved",
                        outcome.kind,
                        built.unresolved.len()
                    );
                }
            }
            Err(err) => {
                eprintln!("{}: {err}", outcome.kind);
                failed = true;
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn handle_resolve_command(settings: &Settings, sub: &ArgMatches) -> ExitCode {
    let Some(path) = sub.get_one::<String>("path") else {
        return ExitCode::FAILURE;
    };
    let loader = match sub.get_one::<String>("kind") {
        Some(kind) => match kind.parse::<GrammarKind>() {
            Ok(kind) => settings.grammars.get(kind).loader(),
            Err(message) => {
                eprintln!("{message}");
                return ExitCode::FAILURE;
            }
        },
        None => GrammarLoader::new(),
    };

    let grammar = match loader.load_file(path) {
        Ok(grammar) => grammar,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let rendered = match sub.get_one::<String>("format").map(String::as_str) {
        Some("json") => grammar.to_json_string(),
        _ => grammar.to_yaml_string(),
    };
    match rendered {
        Ok(text) => {
            println!("{}", text.trim_end());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn handle_check_command(settings: &Settings, deny_unresolved: bool) -> ExitCode {
    let mut failed = false;
    let mut unresolved_total = 0;
    for kind in GrammarKind::ALL {
        let entry = settings.grammars.get(kind);
        let grammar = match entry.loader().load_file(&entry.source) {
            Ok(grammar) => grammar,
            Err(err) => {
                eprintln!("{kind}: {err}");
                failed = true;
                continue;
            }
        };
        let unresolved = unresolved_placeholders(&grammar);
        for placeholder in &unresolved {
            println!(
                "{kind}: {} {}: {{{{{}}}}}",
                placeholder.path, placeholder.field, placeholder.name
            );
        }
        if unresolved.is_empty() {
            println!("{kind}: all placeholders resolved");
        }
        unresolved_total += unresolved.len();
    }

    if failed || (deny_unresolved && unresolved_total > 0) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
