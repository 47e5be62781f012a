mod config;
mod db;
mod errors;
mod export;
mod filtering;
mod history;
mod llm_client;
mod models;
mod render;
mod search;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{redact, Config};
use crate::errors::AppError;
use crate::export::{export_csv, export_filtered_csv, read_candidates};
use crate::filtering::criteria::FilterSpec;
use crate::filtering::engine::{
    classify_all, FilterOptions, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_CONFIDENCE_THRESHOLD,
    STRICT_CONFIDENCE_THRESHOLD,
};
use crate::filtering::worker::RetryPolicy;
use crate::search::{ExaClient, SearchRequest, SearchType, MAX_NUM_RESULTS};

#[derive(Parser)]
#[command(name = "recruit")]
#[command(about = "Search for candidate profiles using Exa people search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for people and save results
    Search(SearchArgs),

    /// Re-filter an existing CSV file using LLM classification
    Filter(RefilterArgs),

    /// View past searches from the local history
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: u32,

        /// Only show searches whose query contains this text
        #[arg(short, long)]
        query: Option<String>,

        /// Print the stored candidates of one search
        #[arg(long, value_name = "ID")]
        show: Option<i64>,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show version
    Version,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration (API keys redacted)
    Show,
    /// Test Exa API connectivity
    Test,
}

#[derive(Args)]
struct SearchArgs {
    /// Natural language search query
    query: String,

    /// Number of results (1-100)
    #[arg(short = 'n', long, default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=MAX_NUM_RESULTS as i64))]
    num_results: u32,

    /// Directory for CSV files
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Search type: auto, neural, fast, deep, instant
    #[arg(short = 't', long, default_value = "auto")]
    search_type: SearchType,

    /// ISO country code for result biasing
    #[arg(short, long)]
    location: Option<String>,

    /// Skip CSV export
    #[arg(long)]
    no_csv: bool,

    /// Output JSON (for agent consumption)
    #[arg(long)]
    json: bool,

    /// Include full profile text
    #[arg(long)]
    include_text: bool,

    /// Disable LLM filtering
    #[arg(long)]
    no_filter: bool,

    #[command(flatten)]
    filter: FilterFlags,
}

#[derive(Args)]
struct RefilterArgs {
    /// Path to CSV file to filter
    csv_file: PathBuf,

    /// Search criteria for filtering (defaults to the CSV's query column)
    #[arg(short, long)]
    query: Option<String>,

    /// Output directory (default: same as input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    filter: FilterFlags,
}

#[derive(Args)]
struct FilterFlags {
    /// Strict filtering (0.8 confidence threshold)
    #[arg(long)]
    strict: bool,

    /// Path to JSON filter config file
    #[arg(long, value_name = "FILE")]
    filter_config: Option<PathBuf>,

    /// Maximum classification requests in flight
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY_LIMIT,
          value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    concurrency: usize,

    /// Give up on unfinished candidates after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline_secs: Option<u64>,

    /// Re-ask the model when its answer is not valid JSON
    #[arg(long)]
    retry_parse_failures: bool,
}

impl FilterFlags {
    fn threshold(&self) -> f64 {
        if self.strict {
            STRICT_CONFIDENCE_THRESHOLD
        } else {
            DEFAULT_CONFIDENCE_THRESHOLD
        }
    }

    fn options(&self, config: &Config) -> FilterOptions {
        FilterOptions {
            confidence_threshold: self.threshold(),
            concurrency_limit: self.concurrency,
            max_profile_chars: config.max_profile_chars,
            retry: RetryPolicy {
                retry_parse_failures: self.retry_parse_failures,
                ..RetryPolicy::default()
            },
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }

    fn load_spec(&self) -> Result<Option<FilterSpec>, AppError> {
        self.filter_config
            .as_deref()
            .map(FilterSpec::load)
            .transpose()
    }
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Search(args) => args.json,
            Commands::Filter(args) => args.json,
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e:#}", "Configuration error:".red());
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr so --json output on stdout stays parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let json = cli.command.wants_json();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match json_error_document(&e, json) {
                Some(doc) => println!("{doc}"),
                None => match &e {
                    AppError::NoResults(_) => eprintln!("{}", e.to_string().yellow()),
                    _ => eprintln!("{}", format!("Error: {e}").red()),
                },
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// The `{"error": ...}` document printed on stdout in `--json` mode.
///
/// "No results" is reported by the command itself (an empty result document
/// for `search`) so only a human-readable notice goes to stderr.
fn json_error_document(err: &AppError, json: bool) -> Option<String> {
    if !json || matches!(err, AppError::NoResults(_)) {
        return None;
    }
    Some(serde_json::json!({ "error": err.to_string() }).to_string())
}

async fn run(command: Commands, config: &Config) -> Result<(), AppError> {
    match command {
        Commands::Search(args) => run_search(config, args).await,
        Commands::Filter(args) => run_refilter(config, args).await,
        Commands::History { limit, query, show } => {
            run_history(config, limit, query.as_deref(), show).await
        }
        Commands::Config(ConfigCommand::Show) => {
            config_show(config);
            Ok(())
        }
        Commands::Config(ConfigCommand::Test) => config_test(config).await,
        Commands::Version => {
            println!("recruit v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_search(config: &Config, args: SearchArgs) -> Result<(), AppError> {
    let filtering = !args.no_filter;

    // Resolve every credential and the filter config before spending on search
    let exa = ExaClient::new(config.require_exa_key()?, config.request_timeout)?;
    if filtering {
        config.require_openrouter_key()?;
    }
    let spec = args.filter.load_spec()?;

    let request = SearchRequest {
        query: args.query.clone(),
        num_results: args.num_results,
        search_type: args.search_type,
        location: args.location.clone(),
        // the classifier needs profile text to judge current employment
        include_text: args.include_text || filtering,
    };

    if !args.json {
        println!("{} {}", "Searching for:".dimmed(), args.query);
    }

    let response = exa.search(&request).await?;

    if response.results.is_empty() {
        if args.json {
            println!("{}", render::empty_search_json(&args.query)?);
        }
        return Err(AppError::NoResults(format!(
            "No results found for '{}'.",
            args.query
        )));
    }

    match db::create_pool(&config.history_db_path).await {
        Ok(pool) => match history::save_search(&pool, &response).await {
            Ok(id) => info!("Saved search #{id} to history"),
            Err(e) => warn!("Failed to save search history: {e}"),
        },
        Err(e) => warn!("History database unavailable: {e:#}"),
    }

    if !filtering {
        let csv_path = if args.no_csv {
            None
        } else {
            Some(export_csv(&response, &args.output_dir)?)
        };

        if args.json {
            println!("{}", render::search_json(&response, csv_path.as_deref())?);
            return Ok(());
        }

        render::print_search_table(&response);
        if let Some(path) = csv_path {
            println!(
                "\n{} {} results saved to {}",
                "✓".green(),
                response.results.len(),
                path.display()
            );
        }
        print_cost("Cost", response.cost_dollars);
        return Ok(());
    }

    let threshold = args.filter.threshold();
    if !args.json {
        println!(
            "{}",
            format!("Filtering {} candidates with LLM...", response.results.len()).dimmed()
        );
    }

    let result = classify_all(
        config,
        response.results.clone(),
        &args.query,
        spec.as_ref(),
        &args.filter.options(config),
    )
    .await?;

    if !args.json {
        println!("{}", render::filter_summary(&result, args.filter.strict).dimmed());
    }

    let export = if args.no_csv {
        None
    } else {
        Some(export_filtered_csv(
            &result.matched,
            &result.rejected,
            &args.query,
            &args.output_dir,
        )?)
    };

    if args.json {
        println!(
            "{}",
            render::filtered_search_json(&response, &result, threshold, export.as_ref())?
        );
        return Ok(());
    }

    render::print_filtered_table(&args.query, &result.matched);
    if let Some(export) = &export {
        println!(
            "\n{} {} matched saved to {}",
            "✓".green(),
            result.matched.len(),
            export.matched_path.display()
        );
        if let Some(rejected_path) = &export.rejected_path {
            println!(
                "{}",
                format!(
                    "{} rejected saved to {}",
                    result.rejected.len(),
                    rejected_path.display()
                )
                .dimmed()
            );
        }
    }
    print_cost("Exa cost", response.cost_dollars);
    Ok(())
}

async fn run_refilter(config: &Config, args: RefilterArgs) -> Result<(), AppError> {
    if !args.csv_file.exists() {
        return Err(AppError::Validation(format!(
            "File not found: {}",
            args.csv_file.display()
        )));
    }

    config.require_openrouter_key()?;
    let spec = args.filter.load_spec()?;

    let imported = read_candidates(&args.csv_file)?;
    if imported.candidates.is_empty() {
        return Err(AppError::NoResults("No candidates found in CSV.".to_string()));
    }

    let query = args
        .query
        .clone()
        .filter(|q| !q.is_empty())
        .or(imported.query)
        .ok_or_else(|| {
            AppError::Validation("No --query provided and no query column in CSV.".to_string())
        })?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| parent_dir(&args.csv_file));
    let threshold = args.filter.threshold();

    if !args.json {
        let file_name = args
            .csv_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!(
            "{}",
            format!(
                "Filtering {} candidates from {}...",
                imported.candidates.len(),
                file_name
            )
            .dimmed()
        );
    }

    let result = classify_all(
        config,
        imported.candidates,
        &query,
        spec.as_ref(),
        &args.filter.options(config),
    )
    .await?;

    let export = export_filtered_csv(&result.matched, &result.rejected, &query, &output_dir)?;

    if args.json {
        println!(
            "{}",
            render::refilter_json(&args.csv_file, &query, &result, threshold, &export)?
        );
        return Ok(());
    }

    println!(
        "\n{} {}",
        "✓".green(),
        render::filter_summary(&result, args.filter.strict)
    );
    println!("  Matched: {}", export.matched_path.display());
    if let Some(rejected_path) = &export.rejected_path {
        println!("  Rejected: {}", rejected_path.display());
    }
    Ok(())
}

async fn run_history(
    config: &Config,
    limit: u32,
    query: Option<&str>,
    show: Option<i64>,
) -> Result<(), AppError> {
    let pool = db::create_pool(&config.history_db_path).await?;

    if let Some(id) = show {
        for stored in history::get_results(&pool, id).await? {
            println!(
                "{}  {}  {}",
                stored.name.cyan().bold(),
                stored.title.as_deref().unwrap_or_default(),
                stored.linkedin_url.blue()
            );
        }
        return Ok(());
    }

    let rows = history::get_history(&pool, limit, query).await?;
    if rows.is_empty() {
        println!("{}", "No search history found.".yellow());
        return Ok(());
    }

    render::print_history_table(&rows);
    Ok(())
}

fn config_show(config: &Config) {
    match config.exa_api_key.as_deref() {
        Some(key) => println!("EXA_API_KEY: {}", redact(key)),
        None => println!("{}", "EXA_API_KEY: not set".red()),
    }
    match config.openrouter_api_key.as_deref() {
        Some(key) => println!("OPENROUTER_API_KEY: {}", redact(key)),
        None => println!(
            "{}",
            "OPENROUTER_API_KEY: not set (required for filtering)".red()
        ),
    }
    println!("Filter model: {}", config.filter_model);
    println!("History database: {}", config.history_db_path.display());
}

async fn config_test(config: &Config) -> Result<(), AppError> {
    println!("{}", "Testing Exa API connection...".dimmed());

    let exa = ExaClient::new(config.require_exa_key()?, config.request_timeout)?;
    let request = SearchRequest {
        num_results: 1,
        search_type: SearchType::Instant,
        ..SearchRequest::new("software engineer")
    };
    let response = exa.search(&request).await?;

    println!(
        "{} Exa API connected: got {} result(s)",
        "✓".green(),
        response.results.len()
    );
    print_cost("Test cost", response.cost_dollars);
    Ok(())
}

fn print_cost(label: &str, cost_dollars: f64) {
    if cost_dollars > 0.0 {
        println!("{}", format!("{label}: ${cost_dollars:.4}").dimmed());
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search_with_filter_flags() {
        let cli = Cli::try_parse_from([
            "recruit",
            "search",
            "staff engineers at Acme",
            "-n",
            "25",
            "-t",
            "deep",
            "--strict",
            "--concurrency",
            "8",
            "--deadline-secs",
            "120",
        ])
        .unwrap();

        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.num_results, 25);
        assert_eq!(args.search_type, SearchType::Deep);
        assert_eq!(args.filter.threshold(), STRICT_CONFIDENCE_THRESHOLD);
        assert_eq!(args.filter.concurrency, 8);
        assert_eq!(args.filter.deadline_secs, Some(120));
        assert!(!args.no_filter);
    }

    #[test]
    fn test_cli_rejects_out_of_range_num_results() {
        assert!(Cli::try_parse_from(["recruit", "search", "q", "-n", "101"]).is_err());
        assert!(Cli::try_parse_from(["recruit", "search", "q", "-n", "0"]).is_err());
    }

    #[test]
    fn test_cli_rejects_zero_concurrency() {
        assert!(Cli::try_parse_from(["recruit", "search", "q", "--concurrency", "0"]).is_err());
    }

    #[test]
    fn test_cli_parses_filter_command_defaults() {
        let cli = Cli::try_parse_from(["recruit", "filter", "out/results.csv", "--json"]).unwrap();
        assert!(cli.command.wants_json());
        let Commands::Filter(args) = cli.command else {
            panic!("expected filter command");
        };
        assert_eq!(args.csv_file, PathBuf::from("out/results.csv"));
        assert!(args.query.is_none());
        assert_eq!(args.filter.threshold(), DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(args.filter.concurrency, DEFAULT_CONCURRENCY_LIMIT);
    }

    #[test]
    fn test_json_errors_skip_no_results() {
        let missing = AppError::MissingCredential("EXA_API_KEY");
        let doc: serde_json::Value =
            serde_json::from_str(&json_error_document(&missing, true).unwrap()).unwrap();
        assert!(doc["error"].as_str().unwrap().contains("EXA_API_KEY"));

        assert!(json_error_document(&missing, false).is_none());
        assert!(json_error_document(&AppError::NoResults("none".to_string()), true).is_none());
    }

    #[test]
    fn test_parent_dir_of_bare_file_is_cwd() {
        assert_eq!(parent_dir(Path::new("results.csv")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("out/results.csv")), PathBuf::from("out"));
    }
}
