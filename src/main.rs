//! CLI entrypoint for `keyscore`.
//!
//! Parses command-line arguments, builds the HTTP executor and engine from
//! flags/environment, runs the requested search or count, prints the report,
//! and optionally saves it to `<term>-<type>-output.txt`.
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use keyscore::{
    aggregate::{AggregateResult, SourceOutcome},
    catalog::{DEFAULT_SOURCE, SourceCatalog},
    client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, HttpExecutor},
    engine::{DEFAULT_CONCURRENCY, Engine, EngineConfig},
    export::save_results_txt,
    query::{DEFAULT_PAGE_SIZE, Operator, Pages, SearchQuery},
    report::{write_api_info, write_count_report, write_results},
};
use log::{LevelFilter, error};

#[derive(Parser, Debug)]
#[command(
    name = "keyscore",
    version,
    about = "Multi-source breach database search (Keyscore API)"
)]
struct Args {
    /// API key sent as a bearer token
    #[arg(long = "api-key", env = "KEYSCORE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Base URL of the search service
    #[arg(long = "base-url", env = "KEYSCORE_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// Maximum number of sources queried at once (1 = sequential)
    #[arg(long = "concurrency", default_value_t = DEFAULT_CONCURRENCY, global = true)]
    concurrency: usize,

    /// Comma-separated source list replacing the built-in catalog
    #[arg(long = "sources", value_delimiter = ',', global = true)]
    sources: Vec<String>,

    /// Save the report to <term>-<type>-output.txt
    #[arg(short = 's', long = "save", global = true)]
    save: bool,

    /// Directory the report is saved into
    #[arg(short = 'o', long = "output-dir", default_value = ".", global = true)]
    output_dir: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Suppress the printed report (still saves with --save)
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look a domain up across all sources
    Domain { domain: String },
    /// Search an email address across all sources
    Email { email: String },
    /// Search a username across all sources
    Username { username: String },
    /// Wildcard URL search against one source (e.g. *.target.com)
    Wildcard {
        pattern: String,
        #[arg(long = "source", default_value = DEFAULT_SOURCE)]
        source: String,
    },
    /// Single-source search with every query parameter
    Search(SearchArgs),
    /// Count matches before running a full search
    Count {
        term: String,
        #[arg(short = 't', long = "type", value_enum, default_value_t = CountType::Url)]
        kind: CountType,
        /// Count a single source instead of every source
        #[arg(long = "source")]
        source: Option<String>,
    },
    /// Show credit rules, sources and search types
    Info,
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Search terms
    #[arg(required = true)]
    terms: Vec<String>,
    /// Query types matching the terms (url, email, username, password, phone, name)
    #[arg(short = 't', long = "type", required = true)]
    types: Vec<String>,
    #[arg(long = "source", default_value = DEFAULT_SOURCE)]
    source: String,
    #[arg(long = "operator", value_enum, default_value_t = OperatorArg::Or)]
    operator: OperatorArg,
    #[arg(long = "wildcard")]
    wildcard: bool,
    #[arg(long = "regex")]
    regex: bool,
    /// Earliest breach date (YYYY-MM-DD)
    #[arg(long = "date-from")]
    date_from: Option<String>,
    /// Latest breach date (YYYY-MM-DD)
    #[arg(long = "date-to")]
    date_to: Option<String>,
    #[arg(long = "page", default_value_t = 1)]
    page: u32,
    /// Pages to fetch: a number or "all"
    #[arg(long = "pages")]
    pages: Option<Pages>,
    #[arg(long = "pagesize", default_value_t = DEFAULT_PAGE_SIZE)]
    pagesize: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OperatorArg {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CountType {
    Url,
    Email,
    Username,
}

impl CountType {
    fn as_str(self) -> &'static str {
        match self {
            CountType::Url => "url",
            CountType::Email => "email",
            CountType::Username => "username",
        }
    }
}

const BANNER: &str = "KEYSCORE BREACH DATABASE SEARCH TOOL";

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn parse_date(label: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .with_context(|| format!("invalid {label} {v:?} (expected YYYY-MM-DD)"))
        })
        .transpose()
}

fn build_engine(args: &Args) -> Result<Engine> {
    let Some(key) = args.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        bail!("no API key provided (--api-key or KEYSCORE_API_KEY)");
    };
    let config = ClientConfig::new(key.trim())
        .with_base_url(&args.base_url)
        .with_timeout(Duration::from_secs(args.timeout.max(1)));
    let executor = HttpExecutor::new(&config).context("failed to set up HTTP client")?;
    let catalog = selected_catalog(args);
    if catalog.is_empty() {
        bail!("--sources did not name any source");
    }
    Ok(Engine::new(
        Box::new(executor),
        catalog,
        EngineConfig {
            concurrency: args.concurrency.max(1),
        },
    ))
}

fn print_outcomes(result: &AggregateResult, total_sources: usize) {
    for (i, (source, outcome)) in result.outcomes.iter().enumerate() {
        let line = match outcome {
            SourceOutcome::Found(n) => format!("{} results", n).green().to_string(),
            SourceOutcome::Empty => "No results".dimmed().to_string(),
            SourceOutcome::Failed(e) => format!("Error: {}", e).yellow().to_string(),
        };
        println!("   [{}/{}] {}: {}", i + 1, total_sources, source, line);
    }
    println!(
        "\n{}",
        format!(
            "Search completed! Found data in {}/{} sources",
            result.successful_sources, total_sources
        )
        .bold()
    );
    let failures: Vec<_> = result.failures().collect();
    if !failures.is_empty() && failures.iter().all(|(_, e)| e.is_account_level()) {
        println!(
            "   {}",
            "Every failure was an account error; check the API key and credit balance.".yellow()
        );
    }
}

/// Print and optionally save. Returns false when saving failed.
fn present(args: &Args, result: &AggregateResult, term: &str, save_type: &str) -> bool {
    if !args.quiet {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = writeln!(out);
        if let Err(e) = write_results(&mut out, result) {
            error!("failed to print results: {}", e);
        }
    }
    if !args.save {
        return true;
    }
    if result.is_empty() {
        println!("Nothing to save.");
        return true;
    }
    println!("Preparing to save {} records...", result.size());
    match save_results_txt(result, term, save_type, &args.output_dir) {
        Ok(saved) => {
            println!("{}", "Results saved successfully!".green().bold());
            println!("   File: {}", saved.path.display());
            println!("   Records: {}", saved.records);
            println!("   Size: {}", saved.human_size());
            true
        }
        Err(e) => {
            eprintln!("{} {}", "Save failed:".red().bold(), e);
            eprintln!("   {}", e.hint());
            false
        }
    }
}

fn selected_catalog(args: &Args) -> SourceCatalog {
    if args.sources.is_empty() {
        SourceCatalog::default()
    } else {
        SourceCatalog::from_sources(&args.sources)
    }
}

fn run(args: &Args) -> Result<bool> {
    if let Command::Info = args.command {
        let stdout = io::stdout();
        write_api_info(&mut stdout.lock(), &selected_catalog(args))?;
        return Ok(true);
    }

    let engine = build_engine(args)?;
    if !args.quiet {
        println!("{}", BANNER.bold().green());
    }

    let (term, save_type, result) = match &args.command {
        Command::Domain { domain } => {
            println!("Searching {} sources for domain: {}", engine.catalog().len(), domain);
            let r = engine.search_domain_all_sources(domain);
            print_outcomes(&r, engine.catalog().len());
            (domain.clone(), "domain", r)
        }
        Command::Email { email } => {
            println!("Searching {} sources for email: {}", engine.catalog().len(), email);
            let r = engine.search_email_all_sources(email);
            print_outcomes(&r, engine.catalog().len());
            (email.clone(), "email", r)
        }
        Command::Username { username } => {
            println!(
                "Searching {} sources for username: {}",
                engine.catalog().len(),
                username
            );
            let r = engine.search_username_all_sources(username);
            print_outcomes(&r, engine.catalog().len());
            (username.clone(), "username", r)
        }
        Command::Wildcard { pattern, source } => {
            println!("Wildcard search on {}: {}", source, pattern);
            let q = SearchQuery::single(pattern, "url").with_wildcard(true);
            let r = engine
                .search(&q, source)
                .with_context(|| format!("search against {source} failed"))?;
            (pattern.clone(), "wildcard", r)
        }
        Command::Search(s) => {
            let q = SearchQuery::new(s.terms.clone(), s.types.clone())
                .with_operator(match s.operator {
                    OperatorArg::And => Operator::And,
                    OperatorArg::Or => Operator::Or,
                })
                .with_wildcard(s.wildcard)
                .with_regex(s.regex)
                .with_date_range(
                    parse_date("--date-from", s.date_from.as_deref())?,
                    parse_date("--date-to", s.date_to.as_deref())?,
                )
                .with_paging(s.page, s.pages, s.pagesize);
            let r = engine
                .search(&q, &s.source)
                .with_context(|| format!("search against {} failed", s.source))?;
            let kind = s.types.first().map(String::as_str).unwrap_or("search");
            (s.terms.join(" "), kind, r)
        }
        Command::Count { term, kind, source } => {
            let q = SearchQuery::single(term, kind.as_str());
            let counts = match source {
                Some(src) => engine
                    .count(&q, src)
                    .with_context(|| format!("count against {src} failed"))?,
                None => {
                    println!("Getting counts from {} sources...", engine.catalog().len());
                    engine.count_across_sources(&q)
                }
            };
            let stdout = io::stdout();
            write_count_report(&mut stdout.lock(), &counts, &q.terms, kind.as_str())?;
            return Ok(true);
        }
        Command::Info => return Ok(true),
    };

    Ok(present(args, &result, &term, save_type))
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    match args.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(4),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}
