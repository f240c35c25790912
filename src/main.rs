//! Tern Compiler
//!
//! Checks Tern sources: parsing, name resolution and type checking.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;

use tern::feedback::{CheckFeedback, CheckStats, DiagnosticReport};
use tern::frontend::ast::Forest;
use tern::frontend::module::SourceLoader;
use tern::Error;

/// Tern Compiler
#[derive(Parser, Debug)]
#[command(name = "ternc")]
#[command(author = "Z1529")]
#[command(version = "0.1.0")]
#[command(about = "Tern compiler - semantic checks for package-based sources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check source files for errors
    Check {
        /// Input source files, analyzed together
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Print a JSON feedback document instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let code = match &cli.command {
        Commands::Check { files, json } => match check_files(files, *json) {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(e) => {
                eprintln!("error: {:#}", e);
                2
            }
        },
        Commands::Version => {
            println!("ternc 0.1.0");
            println!("Tern Compiler");
            println!("License: Apache-2.0");
            0
        }
    };
    process::exit(code);
}

/// Check all files as one program; returns whether it is error-free
fn check_files(files: &[PathBuf], json: bool) -> Result<bool> {
    let total = Instant::now();
    let mut loader = SourceLoader::new();
    let mut forest = Forest::new();
    let mut paths: Vec<String> = Vec::new();
    let mut stats = CheckStats::default();

    let mut outcome: std::result::Result<(), Error> = Ok(());
    for path in files {
        if loader.is_loaded(path) {
            continue;
        }
        paths.push(path.display().to_string());
        match loader.load_file(&mut forest, path) {
            Ok(id) => info!("loaded {} as file {}", path.display(), id),
            Err(Error::Io(message)) => return Err(anyhow!(message)),
            Err(err) => {
                outcome = Err(err);
                break;
            }
        }
    }
    stats.parse_time_ms = total.elapsed().as_millis() as u64;
    stats.loc = (0..paths.len())
        .filter_map(|id| loader.source(id))
        .map(|source| source.lines().count())
        .sum();

    let semantic = Instant::now();
    let analysis = outcome.and_then(|()| tern::analyze(&forest));
    stats.semantic_time_ms = semantic.elapsed().as_millis() as u64;
    stats.total_time_ms = total.elapsed().as_millis() as u64;
    stats.function_count = forest.function_ids().count();

    match analysis {
        Ok(analysis) => {
            stats.type_count = analysis.types.len();
            let entrypoints = analysis
                .entrypoints(&forest)
                .into_iter()
                .map(|id| format!("{}.{}", forest.file(id.file).package, forest.function(id).name.name))
                .collect();
            if json {
                println!("{}", CheckFeedback::success(paths, stats, entrypoints).to_json());
            } else {
                println!("Checked {} file(s): no errors found", paths.len());
            }
            Ok(true)
        }
        Err(err) => {
            let report = DiagnosticReport::from_error(&err, &paths);
            if json {
                println!("{}", CheckFeedback::failure(paths, vec![report], stats).to_json());
            } else {
                let source = err.span().and_then(|span| loader.source(span.file_id));
                eprintln!("{}", report.render(source));
            }
            Ok(false)
        }
    }
}
