//! Command-line front end for the graph compiler.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;

use oas_graph::{compile, CompileError, Config, Graph};

#[derive(Parser)]
#[command(
    name = "oas-graph",
    version,
    about = "Compile an entity-relationship graph into an OpenAPI document"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a graph and emit the OpenAPI document as JSON.
    Compile {
        /// Path to the graph description (JSON).
        graph: PathBuf,
        /// Path to a compiler configuration file (JSON).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the document to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the emitted JSON.
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a graph and report what compilation would produce.
    Check {
        /// Path to the graph description (JSON).
        graph: PathBuf,
        /// Path to a compiler configuration file (JSON).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize document: {0}")]
    Render(#[from] serde_json::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Io { .. } => 3,
            CliError::Parse { .. } | CliError::Render(_) => 2,
            CliError::Compile(err) => err.exit_code() as u8,
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Compile {
            graph,
            config,
            output,
            pretty,
        } => {
            let graph = load_graph(&graph)?;
            let config = load_config(config.as_deref())?;
            let doc = compile(&graph, &config)?;
            let json = if pretty {
                serde_json::to_string_pretty(&doc)?
            } else {
                serde_json::to_string(&doc)?
            };
            match output {
                Some(path) => {
                    fs::write(&path, json).map_err(|source| CliError::Io {
                        path: path.clone(),
                        source,
                    })?;
                }
                None => println!("{json}"),
            }
        }
        Command::Check { graph, config } => {
            let graph = load_graph(&graph)?;
            let config = load_config(config.as_deref())?;
            let doc = compile(&graph, &config)?;
            println!(
                "ok: {} entities, {} paths, {} schemas",
                graph.entities.len(),
                doc.paths.len(),
                doc.components.schemas.len()
            );
        }
    }
    Ok(())
}

fn load_graph(path: &Path) -> Result<Graph, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
