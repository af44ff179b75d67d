//! Command-line interface for trig
//! Compiles a program source and its catalog into the trigger tree and both string tables.
//!
//! Usage:
//!   trig `<program>` `<catalog>` [-o `<dir>`] [-c `<config>`] [--no-cache]   - Compile and write outputs
//!   trig `<program>` `<catalog>` --emit ast-json                          - Print the allocated program tree
//!   trig `<program>` `<catalog>` --emit tokens-json                       - Print the program tokens

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use trig_config::{Loader, TrigConfig};
use trig_parser::trig::formats::XmlFormat;
use trig_parser::trig::pipeline::{Compiler, CompilerOptions, OutputPaths, PipelineError};

/// Optional configuration file picked up from the working directory
const LOCAL_CONFIG: &str = "trig.toml";

fn command() -> Command {
    Command::new("trig")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile trig programs and catalogs into trigger data")
        .arg_required_else_help(true)
        .arg(
            Arg::new("program")
                .help("Path to the program source")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("catalog")
                .help("Path to the catalog source")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .index(2),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Output directory (overrides output.directory)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over trig.toml")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("no-cache")
                .long("no-cache")
                .help("Neither read nor write the program cache")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("emit")
                .long("emit")
                .help("What to produce")
                .value_parser(["xml", "ast-json", "tokens-json"])
                .default_value("xml"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (-v info, -vv debug); RUST_LOG takes precedence")
                .action(ArgAction::Count),
        )
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<TrigConfig, String> {
    let mut loader = Loader::new().with_optional_file(LOCAL_CONFIG);
    if let Some(path) = matches.get_one::<PathBuf>("config") {
        loader = loader.with_file(path);
    }
    if let Some(directory) = matches.get_one::<String>("output") {
        loader = loader
            .set_override("output.directory", directory.as_str())
            .map_err(|e| e.to_string())?;
    }
    if matches.get_flag("no-cache") {
        loader = loader
            .set_override("cache.enabled", false)
            .map_err(|e| e.to_string())?;
    }
    loader
        .build()
        .map_err(|e| format!("Configuration error: {}", e))
}

fn compiler_for(config: &TrigConfig) -> Compiler {
    Compiler::new(CompilerOptions {
        cache_extension: config.cache.extension().map(str::to_string),
        value_preamble: config
            .strings
            .value_preamble
            .iter()
            .map(|row| (row.key.clone(), row.value.clone()))
            .collect(),
    })
}

fn output_paths(config: &TrigConfig) -> OutputPaths {
    OutputPaths {
        directory: PathBuf::from(&config.output.directory),
        tree: config.output.tree.clone(),
        labels: config.output.label_strings.clone(),
        values: config.output.value_strings.clone(),
    }
}

/// Handle the default emit: compile and write the three output files
async fn handle_compile(
    compiler: &Compiler,
    config: &TrigConfig,
    program: &Path,
    catalog: &Path,
) -> Result<(), PipelineError> {
    let output = compiler.compile_files(program, catalog).await?;
    let paths = output_paths(config);
    let format = XmlFormat::new(config.output.xml_declaration);
    compiler.write_outputs(&output, &paths, &format).await?;
    tracing::info!(directory = %paths.directory.display(), "compiled");
    Ok(())
}

/// Handle the JSON emits, printing to stdout
async fn handle_emit(compiler: &Compiler, emit: &str, program: &Path) -> Result<String, String> {
    let json = match emit {
        "ast-json" => {
            let tree = compiler
                .allocate_file(program)
                .await
                .map_err(|e| e.report())?;
            serde_json::to_string_pretty(&tree)
        }
        "tokens-json" => {
            let tokens = compiler
                .tokenize_file(program)
                .await
                .map_err(|e| e.report())?;
            serde_json::to_string_pretty(&tokens)
        }
        other => return Err(format!("Unknown emit: {}", other)),
    };
    json.map_err(|e| format!("JSON serialization failed: {}", e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = command().get_matches();
    init_tracing(matches.get_count("verbose"));

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let program = matches
        .get_one::<PathBuf>("program")
        .expect("program is a required argument");
    let catalog = matches
        .get_one::<PathBuf>("catalog")
        .expect("catalog is a required argument");
    let emit = matches
        .get_one::<String>("emit")
        .map(String::as_str)
        .unwrap_or("xml");
    let compiler = compiler_for(&config);

    if emit == "xml" {
        if let Err(err) = handle_compile(&compiler, &config, program, catalog).await {
            eprintln!("{}", err.report());
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    match handle_emit(&compiler, emit, program).await {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn verbosity_counts_flags() {
        let matches = command()
            .try_get_matches_from(["trig", "a.trig", "a.cat", "-vv", "--no-cache"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        assert!(matches.get_flag("no-cache"));
        assert_eq!(matches.get_one::<String>("emit").unwrap(), "xml");
    }

    #[test]
    fn unknown_emit_is_rejected() {
        let result = command().try_get_matches_from(["trig", "a.trig", "a.cat", "--emit", "yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn config_maps_onto_compiler_options() {
        let config = Loader::new()
            .set_override("output.directory", "build")
            .unwrap()
            .set_override("cache.enabled", false)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(compiler_for(&config).options().cache_extension, None);
        let paths = output_paths(&config);
        assert_eq!(paths.tree_path(), PathBuf::from("build/Triggers"));
        assert_eq!(paths.values_path(), PathBuf::from("build/GameStrings.txt"));
    }
}
