//! Command-line interface for cfbridge.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::analyzer::Analyzer;
use crate::config::{self, BridgeConfig, DEFAULT_CONFIG_NAMES};
use crate::process::{CancellationToken, SubprocessRunner};
use crate::report::{self, FileReport};
use crate::reproducer::ReproducerWriter;
use crate::request::{AnalysisOptions, CFamilyRequestFactory, Language, RequestFactoryRegistry};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Run a native C/C++ analyzer out of process and report its issues.
#[derive(Parser)]
#[command(name = "cfbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a file or directory
    Analyze(AnalyzeArgs),
    /// Create a starter configuration file
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Path to analyze (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Capture a reproducer bundle instead of collecting issues
    #[arg(long)]
    pub reproducer: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "cfbridge.yaml")]
    pub output: PathBuf,
}

/// Discover a config file in the current directory.
fn discover_config() -> anyhow::Result<PathBuf> {
    for name in DEFAULT_CONFIG_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Ok(path);
        }
    }
    anyhow::bail!(
        "no config file found (looked for {})",
        DEFAULT_CONFIG_NAMES.join(", ")
    )
}

/// Collect analyzable files under `root`.
pub fn collect_files(root: &Path, config: &BridgeConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories, but not the root itself
            !(e.depth() > 0 && e.file_type().is_dir() && name.starts_with('.'))
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if Language::from_path(path).is_some() && !config.is_path_excluded(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let config_path = match &args.config {
        Some(p) => p.clone(),
        None => match discover_config() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Run 'cfbridge init' to create a config file");
                return Ok(EXIT_ERROR);
            }
        },
    };

    let config = match BridgeConfig::parse_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error parsing config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Err(e) = config::validate(&config) {
        eprintln!("Error: invalid config: {}", e);
        return Ok(EXIT_ERROR);
    }

    // The analyzer is given absolute paths
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let files = if abs_path.is_dir() {
        collect_files(&abs_path, &config)?
    } else {
        vec![abs_path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no files to analyze");
        return Ok(EXIT_SUCCESS);
    }

    let registry = RequestFactoryRegistry::new().with(Box::new(CFamilyRequestFactory::new(
        Arc::new(config.rules_provider()),
        Arc::new(config.environment.clone()),
    )));

    let mut analyzer = Analyzer::new(&config.analyzer, SubprocessRunner::new());
    if let Some(dir) = &config.working_directory {
        analyzer = analyzer.working_directory(dir);
    }
    if let Some(dir) = &config.reproducer_directory {
        analyzer = analyzer.reproducer_writer(ReproducerWriter::new(dir));
    }

    let options = AnalysisOptions {
        create_reproducer: args.reproducer,
    };
    // Reproducer files have fixed names, so captures must not overlap.
    if options.create_reproducer && files.len() > 1 {
        eprintln!("Error: --reproducer needs a single file, got {}", files.len());
        return Ok(EXIT_ERROR);
    }

    let progress = if args.format == "pretty" && files.len() > 1 {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let results: Vec<anyhow::Result<Option<FileReport>>> = files
        .par_iter()
        .map(|file| {
            let report = analyze_file(&registry, &analyzer, file, &options, &cancel);
            if let Some(bar) = &progress {
                bar.inc(1);
            }
            report
        })
        .collect();

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let mut reports = Vec::with_capacity(results.len());
    for result in results {
        if let Some(report) = result? {
            reports.push(report);
        }
    }

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, reports.clone())?,
        _ => report::write_pretty(&path_str, &reports),
    }

    if reports.iter().any(|r| r.error.is_some()) {
        Ok(EXIT_ERROR)
    } else if report::issue_count(&reports) > 0 {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Analyze one file. `Ok(None)` means no factory handles it.
fn analyze_file(
    registry: &RequestFactoryRegistry,
    analyzer: &Analyzer<SubprocessRunner>,
    file: &Path,
    options: &AnalysisOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<Option<FileReport>> {
    let Some(request) = registry.try_get(file, options)? else {
        return Ok(None);
    };

    let mut messages = Vec::new();
    let outcome = analyzer.analyze(&request, cancel, |m| messages.push(m));
    let (measures, error) = match outcome {
        Ok(outcome) => (outcome.measures, None),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };

    Ok(Some(FileReport {
        file: file.to_string_lossy().to_string(),
        language: request.language().to_string(),
        messages,
        measures,
        error,
    }))
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, config::TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Set 'analyzer' in {} to the native analyzer path", args.output.display());
    println!("  2. Run: cfbridge analyze <path> --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
