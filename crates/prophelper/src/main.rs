use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use prophelper_core::config::{HelperConfig, load_config, resolve_config_path};
use prophelper_core::fetch::{FetchOptions, fetch_raw};
use prophelper_core::proposal::{inspect_document, process_document};
use prophelper_core::{ScriptMode, SectionReport};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "prophelper=warn,prophelper_core=warn";
const VERBOSE_LOG_FILTER: &str = "prophelper=debug,prophelper_core=debug";
const MISSING_EXAMPLE_INPUT: &str = "Property proposal URL or id are missing";

#[derive(Debug, Parser)]
#[command(
    name = "prophelper",
    version,
    about = "Turn Wikidata property proposals into QuickStatements import scripts",
    long_about = "Turn Wikidata property proposals into QuickStatements import scripts.\n\nScript lines go to stdout. Section headers, reminders and logs go to stderr."
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Log pipeline details to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Print the script that creates each proposed property")]
    Create(CreateArgs),
    #[command(about = "Print the script that adds proposal examples to a created property")]
    Examples(ExamplesArgs),
    #[command(about = "Print parsed proposal sections as JSON")]
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    #[arg(value_name = "PROPOSAL_URL")]
    url: Option<String>,
    #[arg(long, value_name = "PATH", help = "Read wikitext from a file instead of fetching")]
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, help = "Print section reports as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct ExamplesArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, value_name = "PID", help = "Id of the created property, e.g. P1234")]
    property: Option<String>,
    #[arg(long, help = "Print section reports as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        let mut command = Cli::command();
        command.print_help()?;
        println!();
        return Ok(());
    };

    let config = load_runtime_config(cli.config.as_deref())?;
    match command {
        Commands::Create(args) => run_create(&config, args),
        Commands::Examples(args) => run_examples(&config, args),
        Commands::Inspect(args) => run_inspect(&config, args),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_runtime_config(flag: Option<&Path>) -> Result<HelperConfig> {
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let path = resolve_config_path(flag, &cwd);
    debug!(path = %path.display(), "loading config");
    load_config(&path)
}

fn run_create(config: &HelperConfig, args: CreateArgs) -> Result<()> {
    let source_url = non_blank(args.source.url.as_deref()).map(str::to_string);
    if source_url.is_none() && args.source.file.is_none() {
        bail!("Property proposal URL is missing");
    }
    let document = load_document(config, &args.source)?;
    let mode = ScriptMode::Create { source_url };
    let reports = process_document(&document, &mode, config.description_language())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }
    print_reports(&reports);
    eprintln!("# Reminders");
    eprintln!("# - add {{{{Property documentation}}}} to the talk page of each new property");
    eprintln!("# - update the proposal with the id of each new property");
    Ok(())
}

fn run_examples(config: &HelperConfig, args: ExamplesArgs) -> Result<()> {
    let property_id = non_blank(args.property.as_deref());
    let has_source = non_blank(args.source.url.as_deref()).is_some() || args.source.file.is_some();
    let Some(property_id) = property_id.filter(|_| has_source) else {
        bail!(MISSING_EXAMPLE_INPUT);
    };

    let document = load_document(config, &args.source)?;
    let mode = ScriptMode::Examples {
        property_id: property_id.to_string(),
    };
    let reports = process_document(&document, &mode, config.description_language())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports);
    }
    Ok(())
}

fn run_inspect(config: &HelperConfig, args: InspectArgs) -> Result<()> {
    if non_blank(args.source.url.as_deref()).is_none() && args.source.file.is_none() {
        bail!("Property proposal URL is missing");
    }
    let document = load_document(config, &args.source)?;
    let sections = inspect_document(&document, config.description_language())?;
    println!("{}", serde_json::to_string_pretty(&sections)?);
    Ok(())
}

fn load_document(config: &HelperConfig, source: &SourceArgs) -> Result<String> {
    if let Some(path) = &source.file {
        return fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let Some(url) = non_blank(source.url.as_deref()) else {
        bail!("Property proposal URL is missing");
    };
    fetch_raw(url, &FetchOptions::from_config(config))
}

/// Script text on stdout; the header naming each section on stderr, so
/// stdout can be pasted into the import tool as is.
fn print_reports(reports: &[SectionReport]) {
    for report in reports {
        eprintln!("{}", section_header(report));
        let body = report.outcome.render();
        if !body.is_empty() {
            println!("{body}");
        }
    }
}

fn section_header(report: &SectionReport) -> String {
    format!("# Proposal {}: {}", report.index + 1, report.heading)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
