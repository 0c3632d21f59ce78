//! Command-line interface for algorithmic
//! Renders Python reference implementations as LaTeX `algorithmic` pseudocode.
//!
//! Usage:
//!   algorithmic render `<files...>` [--preamble] [--new-style] [--output `<file>`] [--config `<file>`]
//!   algorithmic stats `<files...>`                - Which rules fired in which files
//!   algorithmic ast `<file>`                      - Dump the syntax tree as JSON

use algorithmic::config::{AlgorithmicConfig, Loader};
use algorithmic::document::{pattern_usage, Session};
use algorithmic::error::Error;
use algorithmic::parser::parse_module;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let files = Arg::new("files")
        .help("Python source files")
        .required(true)
        .num_args(1..)
        .index(1);

    let matches = Command::new("algorithmic")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render algorithm implementations as algorithmic pseudocode")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("render")
                .about("Render files to LaTeX")
                .arg(files.clone())
                .arg(
                    Arg::new("preamble")
                        .long("preamble")
                        .short('p')
                        .help("Wrap the output in a complete LaTeX document")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("new-style")
                        .long("new-style")
                        .short('3')
                        .help("Typeset `==`, `=`, `and` and `or` the way Python writes them")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Write to this file instead of stdout"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .help("TOML file layered over the built-in defaults"),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Report the files in which each rule fired")
                .arg(files),
        )
        .subcommand(
            Command::new("ast")
                .about("Dump the syntax tree of a file as JSON")
                .arg(Arg::new("file").help("Python source file").required(true).index(1)),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("render", args)) => handle_render_command(args),
        Some(("stats", args)) => handle_stats_command(args),
        Some(("ast", args)) => handle_ast_command(args),
        _ => unreachable!("a subcommand is required"),
    }
}

/// Handle the render command
///
/// Every file is rendered even when an earlier one fails; the exit status reports whether
/// any of them did.
fn handle_render_command(args: &ArgMatches) {
    let config = load_config(args);
    let mut output = String::new();
    let mut failed = false;

    for path in file_args(args) {
        let source = read_source(path);
        let mut session = new_session(&config);
        let result = session.render(&source);
        output.push_str(session.output());
        if let Err(error) = result {
            report(path, &source, &error);
            failed = true;
        }
    }

    match args.get_one::<String>("output") {
        Some(target) => fs::write(target, &output).unwrap_or_else(|e| {
            eprintln!("Cannot write {}: {}", target, e);
            std::process::exit(1);
        }),
        None => print!("{}", output),
    }
    if failed {
        std::process::exit(1);
    }
}

/// Handle the stats command
fn handle_stats_command(args: &ArgMatches) {
    let config = load_config(args);
    let mut sessions = Vec::new();
    let mut failed = false;

    for path in file_args(args) {
        let source = read_source(path);
        let mut session = new_session(&config);
        match session.render(&source) {
            Ok(()) => {}
            // The rest of the document was rendered, so its rule hits still count
            Err(error @ Error::Incomplete(_)) => {
                report(path, &source, &error);
                failed = true;
            }
            Err(error) => {
                report(path, &source, &error);
                std::process::exit(1);
            }
        }
        sessions.push((path.as_str(), session));
    }

    let runs = sessions.iter().map(|(path, session)| (*path, session));
    for usage in pattern_usage(runs) {
        println!("{}\t{}", usage.files.join(" "), usage.pattern);
    }
    if failed {
        std::process::exit(1);
    }
}

/// Handle the ast command
fn handle_ast_command(args: &ArgMatches) {
    let path = args
        .get_one::<String>("file")
        .expect("file is a required argument");
    let source = read_source(path);
    let module = parse_module(&source).unwrap_or_else(|e| {
        report(path, &source, &Error::from(e));
        std::process::exit(1);
    });
    let json = serde_json::to_string_pretty(&module).unwrap_or_else(|e| {
        eprintln!("Error formatting syntax tree: {}", e);
        std::process::exit(1);
    });
    println!("{}", json);
}

fn load_config(args: &ArgMatches) -> AlgorithmicConfig {
    let mut loader = Loader::new();
    if let Ok(Some(path)) = args.try_get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    let flags = [("preamble", "render.preamble"), ("new-style", "render.new_style")];
    for (flag, key) in flags {
        if matches!(args.try_get_one::<bool>(flag), Ok(Some(true))) {
            loader = loader.set_override(key, true).unwrap_or_else(|e| config_error(e));
        }
    }
    loader.build().unwrap_or_else(|e| config_error(e))
}

fn config_error(error: config::ConfigError) -> ! {
    eprintln!("Configuration error: {}", error);
    std::process::exit(1);
}

fn new_session(config: &AlgorithmicConfig) -> Session {
    Session::from_config(config).unwrap_or_else(|e| {
        eprintln!("Invalid rule in configuration: {}", e);
        std::process::exit(1);
    })
}

fn file_args(args: &ArgMatches) -> impl Iterator<Item = &String> {
    args.get_many::<String>("files")
        .expect("files is a required argument")
}

fn read_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Cannot read {}: {}", path, e);
        std::process::exit(1);
    })
}

fn report(path: &str, source: &str, error: &Error) {
    match error {
        Error::Parse(parse) => {
            let position = parse.position(source);
            eprintln!("{}:{}: {}", path, position, parse);
        }
        Error::Incomplete(failures) => {
            for diagnostic in failures {
                eprintln!("{}: {}", path, diagnostic);
            }
        }
        other => eprintln!("{}: {}", path, other),
    }
}
