//! Command-line front end.
//!
//! Reads one EAD record, resolves its candidate headings against the
//! authority services, and writes the enriched record to a file or stdout.
//!
//! Exit status codes: 0 OK; 1 the input file or output directory does not
//! exist; 9 something else went wrong.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use authlink::{
    open_cache, process_document, AuthorityConfig, DocumentError, EadDocument, LinkError,
    NameAuthority, ProcessOptions, Resolver, SelectionRules, SubjectAuthority,
};

const EXIT_MISSING_PATH: u8 = 1;
const EXIT_FAILURE: u8 = 9;

/// Adds authority-control URIs to headings when established forms can be
/// found.
#[derive(Debug, Parser)]
#[command(name = "authlink", version, about)]
struct Cli {
    /// Path to the EAD record to process.
    record: PathBuf,

    /// Path to the output file. Writes to stdout if no option is supplied.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding the resolution cache.
    #[arg(long, default_value = "authority-cache")]
    cache: PathBuf,

    /// Annotate ambiguous headings with the full candidate list.
    #[arg(long)]
    annotate_ambiguous: bool,

    /// Label-resolution endpoint for subject headings.
    #[arg(long)]
    subject_endpoint: Option<String>,

    /// Search endpoint for name headings.
    #[arg(long)]
    name_endpoint: Option<String>,

    /// Source restriction for name searches.
    #[arg(long)]
    name_source: Option<String>,

    /// Courtesy delay between service calls, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    courtesy_delay_ms: u64,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn authority_config(&self) -> AuthorityConfig {
        let mut config = AuthorityConfig {
            courtesy_delay: Duration::from_millis(self.courtesy_delay_ms),
            ..AuthorityConfig::default()
        };
        if let Some(endpoint) = &self.subject_endpoint {
            config.subject_endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &self.name_endpoint {
            config.name_endpoint = endpoint.clone();
        }
        if let Some(source) = &self.name_source {
            config.name_source = source.clone();
        }
        config
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn run(cli: &Cli) -> Result<(), LinkError> {
    let config = cli.authority_config().validate()?;
    let subjects = SubjectAuthority::new(&config)?;
    let names = NameAuthority::new(&config)?;

    let cache = open_cache(&cli.cache, None)?;
    let resolver = Resolver::new(&cache, &subjects, &names);

    let mut doc = EadDocument::from_path(&cli.record, SelectionRules::default())?;

    let record_id = doc
        .first_element_text("eadid")
        .unwrap_or_else(|| cli.record.display().to_string());
    log::info!("processing {record_id}");

    let options = ProcessOptions {
        annotate_ambiguous: cli.annotate_ambiguous,
    };
    let report = process_document(&resolver, &mut doc, &options)?;

    for failure in &report.failures {
        log::warn!(
            "{record_id}: {} heading {:?}: {}",
            failure.kind,
            failure.text,
            failure.detail
        );
    }
    log::info!("{record_id}: {report}");

    match &cli.output {
        Some(path) => doc.write_to_path(path)?,
        None => {
            let xml = doc.to_xml()?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(xml.as_bytes())
                .and_then(|()| stdout.write_all(b"\n"))
                .map_err(|e| DocumentError::io("stdout", &e))?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !cli.record.exists() {
        eprintln!("File {} does not exist", cli.record.display());
        return ExitCode::from(EXIT_MISSING_PATH);
    }

    if let Some(output) = &cli.output {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            eprintln!("Directory {} does not exist", dir.display());
            return ExitCode::from(EXIT_MISSING_PATH);
        }
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
