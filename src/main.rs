use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use litsearch::config::{find_config_file, SearchConfig, SearchParams};
use litsearch::models::{DatabaseId, Record, TermModel};
use litsearch::normalize::normalize_batch;
use litsearch::query::{compose_for_databases, SyntaxRegistry};
use litsearch::reconcile::{compare_searches, reconcile, ComparedRecord, ComparisonNote};
use litsearch::sources::SourceRegistry;
use litsearch::utils::{read_records, write_json, write_records};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SEARCH_CONFIG: &str = "search_config.xml";
const DEFAULT_PARAMS_FILE: &str = "litsearch.toml";

/// litsearch - Compose boolean literature-search queries and reconcile the results
#[derive(Parser, Debug)]
#[command(name = "litsearch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compose boolean literature-search queries and reconcile the results", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Search parameter file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search-query document (XML) with syntax rules and term categories
    #[arg(long, global = true, default_value = DEFAULT_SEARCH_CONFIG)]
    search_config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the composed query for each database
    #[command(alias = "q")]
    Query {
        /// Databases to compose for (default: the configured databases)
        #[arg(long, short)]
        database: Vec<String>,
    },

    /// Run the queries, normalize and reconcile the results, write the record file
    #[command(alias = "s")]
    Search {
        /// Output directory for the record file
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Reconcile previously written record files into one record set
    Reconcile {
        /// Record files, in merge order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory for the record file
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Compare a new result file against an older one
    Compare {
        /// Records from the new search
        new: PathBuf,

        /// Records from the previous search
        old: PathBuf,

        /// Write the comparison to this JSON file instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a starter search parameter file
    Init {
        /// Path of the new file
        #[arg(default_value = DEFAULT_PARAMS_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Inspect or edit the term categories of the search-query document
    #[command(subcommand)]
    Terms(TermsCommand),
}

#[derive(Subcommand, Debug)]
enum TermsCommand {
    /// List categories and their terms
    List,
    /// Add an empty category
    AddCategory { name: String },
    /// Remove a category and its terms
    RemoveCategory { name: String },
    /// Add a term to a category
    AddTerm { category: String, term: String },
    /// Remove a term from a category
    RemoveTerm { category: String, term: String },
}

/// `litsearch=<level>` filter for the given flags; `-q` wins over `-v`
fn log_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    };
    format!("litsearch={}", level)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let params = match &cli.command {
        Commands::Init { .. } | Commands::Terms(_) => None,
        _ => Some(
            SearchParams::load(config_path.as_deref())
                .context("Failed to load search parameters")?,
        ),
    };

    let configured_level = params
        .as_ref()
        .map(|p| p.logging.level.as_str())
        .unwrap_or("info");

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| log_filter(cli.verbose, cli.quiet, configured_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let (Some(path), Some(_)) = (&config_path, &params) {
        tracing::info!("Using config file: {}", path.display());
    }

    let params = params.unwrap_or_default();

    match cli.command {
        Commands::Query { database } => {
            let search_config = load_search_config(&cli.search_config)?;
            let databases = if database.is_empty() {
                params.databases()
            } else {
                database.iter().map(|d| DatabaseId::parse(d)).collect()
            };
            let queries = composed_queries(&params, &search_config, &databases)?;
            output_queries(&queries, cli.output)?;
        }

        Commands::Search { out } => {
            let search_config = load_search_config(&cli.search_config)?;
            let queries = composed_queries(&params, &search_config, &params.databases())?;
            let sources = SourceRegistry::with_defaults(params.search.ieee_export.clone())?;

            tracing::info!("Searching {} database(s)", queries.len());
            let results = sources
                .search_all(&queries, params.search.max_results)
                .await?;

            let batches = results
                .into_iter()
                .map(|(database, raw)| {
                    let batch = normalize_batch(raw);
                    tracing::info!(
                        "{}: {} records ({} skipped)",
                        database,
                        batch.records.len(),
                        batch.skipped
                    );
                    batch.records
                })
                .collect();

            let mut rng = params.screening_rng();
            let records = reconcile(batches, &params.filters(), &params.screening(), &mut rng)?;
            write_records(&out, &records)?;
            output_records(&records, cli.output)?;
        }

        Commands::Reconcile { inputs, out } => {
            let batches = inputs
                .iter()
                .map(|path| {
                    read_records(path).with_context(|| format!("Failed to read {}", path.display()))
                })
                .collect::<Result<Vec<_>>>()?;

            let mut rng = params.screening_rng();
            let records = reconcile(batches, &params.filters(), &params.screening(), &mut rng)?;
            write_records(&out, &records)?;
            output_records(&records, cli.output)?;
        }

        Commands::Compare { new, old, out } => {
            let new_records = read_records(&new)
                .with_context(|| format!("Failed to read {}", new.display()))?;
            let old_records = read_records(&old)
                .with_context(|| format!("Failed to read {}", old.display()))?;

            let compared = compare_searches(&new_records, &old_records);
            let count = |note: ComparisonNote| compared.iter().filter(|c| c.note == note).count();
            tracing::info!(
                "{} added, {} removed, {} unchanged",
                count(ComparisonNote::Add),
                count(ComparisonNote::Remove),
                count(ComparisonNote::Unchanged)
            );

            match out {
                Some(path) => {
                    write_json(&path, &compared)?;
                    tracing::info!("Wrote comparison to {}", path.display());
                }
                None => output_comparison(&compared, cli.output)?,
            }
        }

        Commands::Init { path, force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            SearchParams::starter().save(&path)?;
            println!("Wrote starter parameters to {}", path.display());
        }

        Commands::Terms(command) => run_terms(command, &cli.search_config, cli.output)?,
    }

    Ok(())
}

fn load_search_config(path: &Path) -> Result<SearchConfig> {
    SearchConfig::load(path)
        .with_context(|| format!("Failed to load search-query document {}", path.display()))
}

/// Bind the term model once and compose its query for each database
fn composed_queries(
    params: &SearchParams,
    search_config: &SearchConfig,
    databases: &[DatabaseId],
) -> Result<Vec<(DatabaseId, String)>> {
    let Some(first) = databases.first() else {
        return Ok(Vec::new());
    };

    let spec = params.query_spec(first.clone(), &search_config.terms)?;
    Ok(compose_for_databases(
        &spec,
        &search_config.registry,
        databases,
    )?)
}

fn run_terms(command: TermsCommand, path: &Path, format: OutputFormat) -> Result<()> {
    if let TermsCommand::List = command {
        let search_config = load_search_config(path)?;
        return output_terms(&search_config.terms, format);
    }

    let mut search_config = if path.exists() {
        load_search_config(path)?
    } else {
        tracing::info!("Creating new search-query document {}", path.display());
        SearchConfig {
            registry: SyntaxRegistry::builtin(),
            terms: TermModel::default(),
        }
    };

    let terms = &mut search_config.terms;
    match command {
        TermsCommand::List => {}
        TermsCommand::AddCategory { name } => terms.add_category(&name)?,
        TermsCommand::RemoveCategory { name } => {
            let removed = terms.remove_category(&name)?;
            tracing::info!(
                "Removed category '{}' with {} term(s)",
                removed.name,
                removed.terms.len()
            );
        }
        TermsCommand::AddTerm { category, term } => terms.add_term(&category, &term)?,
        TermsCommand::RemoveTerm { category, term } => {
            terms.remove_term(&category, &term)?;
        }
    }

    search_config.save(path)?;
    output_terms(&search_config.terms, format)
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

/// Shorten to at most `max` characters, marking the cut with "..."
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn new_table(header: Vec<&str>) -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(header);
    table
}

fn output_queries(queries: &[(DatabaseId, String)], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = queries
                .iter()
                .map(|(database, query)| {
                    serde_json::json!({ "database": database.name(), "query": query })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Plain => {
            for (database, query) in queries {
                println!("{}: {}", database, query);
            }
        }
        _ => {
            use comfy_table::{Attribute, Cell};
            let mut table = new_table(vec!["Database", "Query"]);
            for (database, query) in queries {
                table.add_row(vec![
                    Cell::new(database.name()).add_attribute(Attribute::Bold),
                    Cell::new(query),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_records(records: &[Record], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        OutputFormat::Plain => {
            for record in records {
                let year = record.year.map(|y| y.to_string()).unwrap_or_default();
                println!("{} - {} ({}, {})", record.title, record.author_line(), record.source, year);
                if let Some(ref doi) = record.doi {
                    println!("  DOI: {}", doi);
                }
                if record.is_duplicate {
                    println!("  duplicate");
                }
                if record.screening_sample {
                    println!("  screening sample");
                }
                println!();
            }
        }
        _ => {
            use comfy_table::{Attribute, Cell};
            let mut table = new_table(vec![
                "#", "Title", "Authors", "Source", "Year", "DOI", "Dup", "Sample",
            ]);
            for (index, record) in records.iter().enumerate() {
                table.add_row(vec![
                    Cell::new(index),
                    Cell::new(truncate(&record.title, 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(&record.author_line(), 30)),
                    Cell::new(record.source.name()),
                    Cell::new(record.year.map(|y| y.to_string()).unwrap_or_default()),
                    Cell::new(record.doi.as_deref().unwrap_or("")),
                    Cell::new(if record.is_duplicate { "yes" } else { "" }),
                    Cell::new(if record.screening_sample { "yes" } else { "" }),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_comparison(compared: &[ComparedRecord], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(compared)?);
        }
        OutputFormat::Plain => {
            for entry in compared {
                println!("[{:?}] {}", entry.note, entry.record.title);
            }
        }
        _ => {
            use comfy_table::Cell;
            let mut table = new_table(vec!["Note", "Title", "Source", "Year"]);
            for entry in compared {
                table.add_row(vec![
                    Cell::new(format!("{:?}", entry.note)),
                    Cell::new(truncate(&entry.record.title, 60)),
                    Cell::new(entry.record.source.name()),
                    Cell::new(entry.record.year.map(|y| y.to_string()).unwrap_or_default()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_terms(terms: &TermModel, format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(terms.categories())?);
        }
        OutputFormat::Plain => {
            for category in terms.categories() {
                let marker = if category.is_exclusion { " (exclusion)" } else { "" };
                println!("{}{}:", category.name, marker);
                for term in &category.terms {
                    println!("  {}", term);
                }
            }
        }
        _ => {
            use comfy_table::{Attribute, Cell};
            let mut table = new_table(vec!["Category", "Exclusion", "Terms"]);
            for category in terms.categories() {
                let list = category
                    .terms
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(vec![
                    Cell::new(&category.name).add_attribute(Attribute::Bold),
                    Cell::new(if category.is_exclusion { "yes" } else { "" }),
                    Cell::new(list),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
