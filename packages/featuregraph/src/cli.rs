//! Command-line interface for featuregraph.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use url::Url;

use crate::config::ExportConfig;
use crate::envelope::EnvelopeCalculator;
use crate::error::{FeatureError, Result};
use crate::exporter::{Exporter, HttpResolver};
use crate::geometry::GmlGeometryAdapter;
use crate::parser::{parse_document, ParsedDocument, ParserOptions};
use crate::schema::FeatureTypeRegistry;
use crate::validator::{ValidationReport, Validator};

/// featuregraph - Parse, validate and export GML/WFS feature documents.
#[derive(Parser)]
#[command(name = "featuregraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a document and print a summary of its features.
    Inspect {
        /// GML or WFS document
        file: PathBuf,

        /// YAML schema with declared feature types
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Guess integer and float kinds for undeclared properties
        #[arg(long)]
        guess_types: bool,
    },

    /// Validate every feature of a document against a schema.
    Validate {
        /// GML or WFS document
        file: PathBuf,

        /// YAML schema with declared feature types
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Parse a document and write it back as WFS 2.0 / GML 3.2.
    Export {
        /// GML or WFS document
        file: PathBuf,

        /// YAML schema with declared feature types
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// YAML export settings (default: FEATUREGRAPH_* environment variables)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Nesting levels to inline, or '*' for unbounded
        #[arg(short, long)]
        depth: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave external references as links
        #[arg(long)]
        no_dereference: bool,

        /// Validate against the schema before exporting
        #[arg(long, requires = "schema")]
        validate: bool,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            file,
            schema,
            guess_types,
        } => inspect_command(&file, schema.as_deref(), guess_types),
        Commands::Validate { file, schema } => validate_command(&file, &schema),
        Commands::Export {
            file,
            schema,
            config,
            depth,
            output,
            no_dereference,
            validate,
        } => export_command(
            &file,
            schema.as_deref(),
            config.as_deref(),
            depth.as_deref(),
            output.as_deref(),
            ExportFlags {
                no_dereference,
                validate,
            },
        ),
    }
}

/// Boolean switches of the export command.
struct ExportFlags {
    no_dereference: bool,
    validate: bool,
}

/// Parse a resolve depth argument: a number or `*`.
fn parse_depth(value: &str) -> Result<Option<u32>> {
    if value == "*" {
        return Ok(None);
    }
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| FeatureError::Config(format!("Depth must be a number or '*': {value}")))
}

fn load_registry(schema: Option<&Path>) -> Result<FeatureTypeRegistry> {
    match schema {
        Some(path) => FeatureTypeRegistry::from_yaml_file(path),
        None => Ok(FeatureTypeRegistry::new()),
    }
}

/// Read, parse and resolve a document, using its location as base URL.
fn load_document(
    path: &Path,
    registry: &FeatureTypeRegistry,
    guess_types: bool,
) -> Result<ParsedDocument> {
    let xml = std::fs::read_to_string(path)?;
    let absolute = std::fs::canonicalize(path)?;
    let base_url = Url::from_file_path(&absolute).map_err(|()| {
        FeatureError::Config(format!("Cannot build a URL for {}", absolute.display()))
    })?;
    let options = ParserOptions::new()
        .with_base_url(base_url)
        .with_guess_simple_types(guess_types);
    parse_document(&xml, registry, &GmlGeometryAdapter, options)
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Execute the inspect command.
fn inspect_command(file: &Path, schema: Option<&Path>, guess_types: bool) -> Result<()> {
    let registry = load_registry(schema)?;
    let document = load_document(file, &registry, guess_types)?;
    let graph = &document.graph;
    let root = graph.feature(document.root);

    println!(
        "{} {}",
        style("Document").bold(),
        style(file.display()).cyan()
    );
    println!("  Root: {}", style(root.name()).green());
    println!("  Features: {}", graph.len());
    println!("  Identified: {}", document.id_count());
    if root.is_collection() {
        println!("  Members: {}", graph.contents(document.root).len());
    }

    let bounds = EnvelopeCalculator::new(&GmlGeometryAdapter).bounds(graph, document.root)?;
    match bounds {
        Some(envelope) => println!(
            "  Bounds: {} {} .. {} {}{}",
            envelope.min.x,
            envelope.min.y,
            envelope.max.x,
            envelope.max.y,
            envelope
                .srs_name
                .map(|s| format!(" ({s})"))
                .unwrap_or_default()
        ),
        None => println!("  Bounds: {}", style("none").dim()),
    }

    Ok(())
}

/// Execute the validate command.
fn validate_command(file: &Path, schema: &Path) -> Result<()> {
    let registry = FeatureTypeRegistry::from_yaml_file(schema)?;
    let mut document = load_document(file, &registry, false)?;
    let validator = Validator::new(&registry, &GmlGeometryAdapter);

    println!(
        "{} {} against {} type(s)",
        style("Validating").bold(),
        style(file.display()).cyan(),
        registry.len()
    );
    println!();

    let root = document.root;
    let outcomes: Vec<(String, Result<ValidationReport>)> =
        if document.graph.feature(root).is_collection() {
            validator
                .validate_members(&mut document.graph, root)
                .into_iter()
                .map(|outcome| (outcome.id, outcome.result))
                .collect()
        } else {
            let id = document.graph.feature_id(root);
            vec![(id, validator.validate(&mut document.graph, root))]
        };

    let total = outcomes.len();
    let mut first_error = None;
    let mut failed = 0;
    for (id, result) in outcomes {
        match result {
            Ok(report) => {
                println!("  {} {}", style("ok").green(), id);
                for defect in &report.defects {
                    println!("      {} {}", style("warning:").yellow(), defect);
                }
                for (feature, property) in &report.dropped {
                    println!(
                        "      {} dropped {} from '{}'",
                        style("note:").dim(),
                        property,
                        feature
                    );
                }
            }
            Err(e) => {
                println!("  {} {}: {}", style("FAIL").red().bold(), id, e);
                failed += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    println!();
    match first_error {
        None => {
            println!(
                "{} {} feature(s) valid",
                style("Done:").green().bold(),
                total
            );
            Ok(())
        }
        Some(e) => {
            println!(
                "{} {} of {} feature(s) invalid",
                style("Failed:").red().bold(),
                failed,
                total
            );
            Err(e)
        }
    }
}

/// Execute the export command.
fn export_command(
    file: &Path,
    schema: Option<&Path>,
    config: Option<&Path>,
    depth: Option<&str>,
    output: Option<&Path>,
    flags: ExportFlags,
) -> Result<()> {
    let mut settings = match config {
        Some(path) => ExportConfig::from_yaml_file(path)?,
        None => ExportConfig::from_env()?,
    };
    if let Some(depth) = depth {
        settings = settings.with_resolve_depth(parse_depth(depth)?);
    }
    if flags.no_dereference {
        settings = settings.with_dereference_external(false);
    }

    let registry = load_registry(schema)?;
    let mut document = load_document(file, &registry, false)?;
    if flags.validate {
        let report = Validator::new(&registry, &GmlGeometryAdapter)
            .validate(&mut document.graph, document.root)?;
        for defect in &report.defects {
            eprintln!("{} {}", style("warning:").yellow(), defect);
        }
    }

    let resolver = if settings.dereference_external {
        Some(HttpResolver::new(&settings)?)
    } else {
        None
    };
    let mut exporter = Exporter::new(&registry, &GmlGeometryAdapter).with_config(settings);
    if let Some(resolver) = &resolver {
        exporter = exporter.with_resolver(resolver);
    }

    let pb = spinner("Exporting features...");
    let result = match output {
        Some(path) => File::create(path).map_err(FeatureError::from).and_then(|f| {
            let mut out = BufWriter::new(f);
            exporter.export(&document.graph, document.root, &mut out)
        }),
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            exporter
                .export(&document.graph, document.root, &mut out)
                .and_then(|report| {
                    out.write_all(b"\n")?;
                    Ok(report)
                })
        }
    };
    pb.finish_and_clear();
    let report = result?;

    for error in &report.reference_errors {
        eprintln!("{} {}", style("warning:").yellow(), error);
    }
    if let Some(path) = output {
        println!(
            "{} {} feature(s) to {}",
            style("Exported").green().bold(),
            report.number_of_features,
            path.display()
        );
        if !report.out_of_band.is_empty() {
            println!("  Appended: {}", report.out_of_band.join(", "));
        }
    }

    Ok(())
}
