// src/main.rs
mod dataset;
mod edgar;
mod extractors;
mod storage;
mod utils;

use clap::{Args, Parser, Subcommand};
use dataset::DatasetBuilder;
use edgar::EdgarClient;
use extractors::section::DEFAULT_MIN_SECTION_CHARS;
use extractors::{BodyPolicy, Occurrence, PatternTable, ProcessedDocument, SectionExtractor};
use std::path::{Path, PathBuf};
use storage::{FilingId, StorageManager};
use utils::AppError;

/// Builds a 10-K narrative-section dataset: fetch filings, extract and clean
/// Items 1, 1A and 7, assemble the results.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download full 10-K submissions from EDGAR into the raw directory
    Fetch(FetchArgs),
    /// Extract and clean sections from every raw filing
    Preprocess(PreprocessArgs),
    /// Collect processed filings into a single JSON dataset
    Assemble(AssembleArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Ticker symbols to fetch
    #[arg(required = true, num_args = 1..)]
    tickers: Vec<String>,

    /// First fiscal year to include
    #[arg(long)]
    start_year: Option<u32>,

    /// Last fiscal year to include
    #[arg(long)]
    end_year: Option<u32>,

    /// Keep at most this many of the newest filings per ticker
    #[arg(long)]
    count: Option<usize>,

    #[arg(long, default_value = "./data/raw")]
    raw_dir: PathBuf,

    /// Contact string EDGAR requires in the User-Agent header
    #[arg(long, env = "EDGAR_USER_AGENT", default_value = edgar::client::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Pause before every EDGAR request, in milliseconds
    #[arg(long, default_value_t = edgar::client::DEFAULT_REQUEST_DELAY_MS)]
    delay_ms: u64,
}

#[derive(Args, Debug)]
struct PreprocessArgs {
    #[arg(long, default_value = "./data/raw")]
    raw_dir: PathBuf,

    #[arg(long, default_value = "./data/processed")]
    processed_dir: PathBuf,

    /// Minimum cleaned length (chars) for a section to count as present
    #[arg(long, env = "MIN_SECTION_CHARS", default_value_t = DEFAULT_MIN_SECTION_CHARS)]
    min_section_chars: usize,

    /// Which <TEXT> block to use: first, largest or last
    #[arg(long, default_value = "first")]
    body_policy: BodyPolicy,

    /// JSON pattern table replacing the built-in section patterns
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Header occurrence to use for every section: 'last' or an ordinal (1, 2, ...)
    #[arg(long)]
    occurrence: Option<Occurrence>,

    /// Debug mode - save annotated HTML with header matches highlighted
    #[arg(short, long)]
    debug: bool,
}

#[derive(Args, Debug)]
struct AssembleArgs {
    #[arg(long, default_value = "./data/processed")]
    processed_dir: PathBuf,

    /// Output file (defaults to <processed-dir>/reports.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct BatchSummary {
    succeeded: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    utils::logging::setup_logging(&cli.log_level);
    tracing::debug!("Parsed arguments: {:?}", cli);

    match cli.command {
        Command::Fetch(args) => run_fetch(args).await,
        Command::Preprocess(args) => run_preprocess(args),
        Command::Assemble(args) => run_assemble(args),
    }
}

async fn run_fetch(args: FetchArgs) -> Result<(), AppError> {
    let storage = StorageManager::new(&args.raw_dir)?;
    let client = EdgarClient::new(&args.user_agent, args.delay_ms)?;

    let mut summary = BatchSummary::default();
    for ticker in &args.tickers {
        let mut filings = match client.find_10k_filings(ticker, args.start_year, args.end_year).await {
            Ok(filings) => filings,
            Err(e) => {
                tracing::error!("Failed to list 10-K filings for {}: {}", ticker, e);
                summary.failed += 1;
                continue;
            }
        };
        if let Some(count) = args.count {
            filings.truncate(count);
        }
        tracing::info!("Found {} 10-K filings for {}", filings.len(), ticker.to_uppercase());

        for filing in filings {
            let id = FilingId::new(&filing.ticker, filing.year);
            tracing::info!("Fetching {} 10-K for {} filed {}", filing.company_name, filing.year, filing.filing_date);
            match client.download_filing(&filing).await {
                Ok(content) => {
                    storage.save_raw(&id, &content)?;
                    summary.succeeded += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to download {} ({}): {}", id, filing.accession_number, e);
                    summary.failed += 1;
                }
            }
        }
    }

    tracing::info!("Fetch finished. Success: {}, Failures: {}", summary.succeeded, summary.failed);
    if summary.succeeded == 0 && summary.failed > 0 {
        return Err(AppError::Processing(format!("Failed to download any of {} filings", summary.failed)));
    }
    Ok(())
}

fn build_extractor(args: &PreprocessArgs) -> Result<SectionExtractor, AppError> {
    let mut table = match &args.patterns {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let table = PatternTable::from_json(&json)
                .map_err(|e| AppError::Config(format!("Invalid pattern table {}: {}", path.display(), e)))?;
            tracing::info!("Using pattern table version {} from {}", table.version, path.display());
            table
        }
        None => PatternTable::default(),
    };
    if let Some(occurrence) = args.occurrence {
        tracing::info!("Overriding header selection with {}", occurrence);
        table = table.with_occurrence(occurrence);
    }
    Ok(SectionExtractor::from_table(&table)?
        .with_body_policy(args.body_policy)
        .with_min_section_chars(args.min_section_chars))
}

fn run_preprocess(args: PreprocessArgs) -> Result<(), AppError> {
    if args.raw_dir == args.processed_dir {
        return Err(AppError::Config("Raw and processed directories must differ".to_string()));
    }
    let extractor = build_extractor(&args)?;
    let raw = StorageManager::new(&args.raw_dir)?;
    let processed = StorageManager::new(&args.processed_dir)?;

    let summary = preprocess_batch(&extractor, &raw, &processed, args.debug)?;
    tracing::info!("Preprocessing finished. Success: {}, Failures: {}", summary.succeeded, summary.failed);

    if summary.succeeded == 0 && summary.failed > 0 {
        return Err(AppError::Processing(format!("Failed to preprocess any of {} filings", summary.failed)));
    }
    Ok(())
}

/// Runs every raw filing through the extractor. A failing filing is logged
/// and skipped; only a directory listing error stops the batch.
fn preprocess_batch(
    extractor: &SectionExtractor,
    raw: &StorageManager,
    processed: &StorageManager,
    debug: bool,
) -> Result<BatchSummary, AppError> {
    let mut summary = BatchSummary::default();

    for path in raw.list_filings()? {
        let span = tracing::info_span!("filing", file = %path.display());
        let _enter = span.enter();

        match preprocess_file(extractor, processed, &path, debug) {
            Ok(doc) => {
                tracing::info!("Preprocessed with {}/3 sections", doc.present_count());
                summary.succeeded += 1;
            }
            Err(e) => {
                tracing::error!("Failed to preprocess {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

fn preprocess_file(
    extractor: &SectionExtractor,
    processed: &StorageManager,
    path: &Path,
    debug: bool,
) -> Result<ProcessedDocument, AppError> {
    let id = FilingId::from_path(path)?;
    let raw = StorageManager::read_filing(path)?;

    if debug {
        let debug_path = processed.base_dir().join("debug").join(format!("{}.html", id.stem()));
        if let Err(e) = utils::html_debug::write_annotated_filing(&raw, &debug_path, extractor.rules()) {
            tracing::warn!("Failed to create debug HTML: {}", e);
        }
    }

    let doc = extractor.extract(&raw)?;
    processed.save_processed(&id, &doc)?;
    processed.save_processed_metadata(&id, &doc, extractor)?;
    Ok(doc)
}

fn run_assemble(args: AssembleArgs) -> Result<(), AppError> {
    let output = args
        .output
        .unwrap_or_else(|| args.processed_dir.join("reports.json"));
    let processed = StorageManager::new(&args.processed_dir)?;
    let (path, count) = DatasetBuilder::new(processed).save(&output)?;
    tracing::info!("Assembled {} filings into {}", count, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn good_filing() -> String {
        let prose = "The company designs, manufactures and markets devices worldwide. ".repeat(5);
        format!(
            "<DOCUMENT><TYPE>10-K<TEXT><html><body>\
             <p>Item 1. Business</p><p>{prose}</p>\
             <p>Item 1A. Risk Factors</p><p>{prose}</p>\
             <p>Item 7. Management's Discussion</p><p>{prose}</p>\
             <p>Item 8. Financial Statements</p></body></html></TEXT></DOCUMENT>"
        )
    }

    #[test]
    fn batch_skips_bad_filings_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let raw = StorageManager::new(dir.path().join("raw")).unwrap();
        let processed = StorageManager::new(dir.path().join("processed")).unwrap();

        fs::write(raw.base_dir().join("AAPL_10K_2023.txt"), good_filing()).unwrap();
        fs::write(raw.base_dir().join("GME_10K_2021.txt"), "<html>no text body</html>").unwrap();
        fs::write(raw.base_dir().join("unnamed.txt"), good_filing()).unwrap();

        let extractor = SectionExtractor::new();
        let summary = preprocess_batch(&extractor, &raw, &processed, true).unwrap();
        assert_eq!(summary, BatchSummary { succeeded: 1, failed: 2 });

        let out = processed.base_dir().join("AAPL_10K_2023.txt");
        let doc = StorageManager::load_processed(&out).unwrap();
        assert_eq!(doc.present_count(), 3);
        assert!(processed.base_dir().join("AAPL_10K_2023_meta.json").exists());
        assert!(processed.base_dir().join("debug").join("AAPL_10K_2023.html").exists());
        assert!(!processed.base_dir().join("GME_10K_2021.txt").exists());
    }

    #[test]
    fn pattern_file_overrides_builtin_table() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("patterns.json");
        let table = PatternTable {
            version: "test-1".to_string(),
            ..PatternTable::default()
        };
        fs::write(&table_path, serde_json::to_string(&table).unwrap()).unwrap();

        let args = PreprocessArgs {
            raw_dir: dir.path().join("raw"),
            processed_dir: dir.path().join("processed"),
            min_section_chars: 50,
            body_policy: BodyPolicy::Largest,
            patterns: Some(table_path),
            occurrence: Some(Occurrence::Nth(2)),
            debug: false,
        };
        let extractor = build_extractor(&args).unwrap();
        assert_eq!(extractor.table_version(), "test-1");
        assert_eq!(extractor.body_policy(), BodyPolicy::Largest);
        assert!(extractor.rules().iter().all(|r| r.occurrence == Occurrence::Nth(2)));
    }

    #[test]
    fn cli_parses_preprocess_flags() {
        let cli = Cli::try_parse_from([
            "tenk_sections",
            "preprocess",
            "--raw-dir",
            "in",
            "--processed-dir",
            "out",
            "--body-policy",
            "last",
            "--occurrence",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::Preprocess(args) => {
                assert_eq!(args.body_policy, BodyPolicy::Last);
                assert_eq!(args.raw_dir, PathBuf::from("in"));
                assert_eq!(args.occurrence, Some(Occurrence::Nth(2)));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
