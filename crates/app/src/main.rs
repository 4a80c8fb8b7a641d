use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tally_core::EnrichedTransaction;
use tally_import::{AcceptDefault, CategoryClassifier, ClassificationOracle, Pipeline, RuleSet};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod summary;
mod terminal;

use config::AppConfig;

/// Normalize and categorize exported card statements.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version)]
struct Args {
    /// Config file (default: ./tally.toml when present)
    #[arg(short, long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the statement CSV files
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Categorization rule store
    #[arg(long)]
    rules: Option<PathBuf>,

    /// SQLite database to export into
    #[arg(long, env = "TALLY_DATABASE")]
    database: Option<PathBuf>,

    /// Export table name
    #[arg(long)]
    table: Option<String>,

    /// Skip the database export
    #[arg(long)]
    no_export: bool,

    /// Never prompt; unmatched merchants get the default category
    #[arg(long)]
    accept_default: bool,
}

impl Args {
    fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(dir) = &self.csv_dir {
            config.csv_folder = dir.clone();
        }
        if let Some(rules) = &self.rules {
            config.rules_file = rules.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(table) = &self.table {
            config.table = table.clone();
        }
        config
    }
}

fn categorize<O: ClassificationOracle>(config: &AppConfig, oracle: O) -> Result<Vec<EnrichedTransaction>> {
    let rules = RuleSet::load_or_default(&config.rules_file);
    let mut classifier = CategoryClassifier::new(rules, oracle)
        .with_store(&config.rules_file)
        .with_choices(config.categories.clone())
        .with_high_value_override(config.high_value.rule());

    Pipeline::new(config.profiles())
        .run(&config.csv_folder, &mut classifier)
        .with_context(|| format!("Failed to process '{}'", config.csv_folder.display()))
}

async fn export(database: &Path, table: &str, transactions: &[EnrichedTransaction]) -> Result<()> {
    let pool = tally_storage::create_db(database)
        .await
        .with_context(|| format!("Failed to open database '{}'", database.display()))?;

    tally_storage::replace_transactions(&pool, table, transactions)
        .await
        .context("Failed to export transactions")?;

    for row in tally_storage::recent_transactions(&pool, table, 5).await? {
        tracing::info!(
            date = %row.transaction_date,
            description = %row.description,
            amount = %row.amount,
            category = %row.category,
            "recent transaction"
        );
    }

    pool.close().await;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.apply(AppConfig::discover(args.config.as_deref())?);

    // Only the export and the Ctrl-C listener run on the runtime; the
    // pipeline itself stays on this thread.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let transactions = if args.accept_default {
        categorize(&config, AcceptDefault)?
    } else {
        categorize(&config, terminal::spawn(&runtime))?
    };

    let totals = summary::by_category(&transactions);
    println!("Categorized {} transactions:", transactions.len());
    print!("{}", summary::Report(&totals));

    if args.no_export {
        tracing::info!("export skipped");
    } else {
        runtime.block_on(export(&config.database, &config.table, &transactions))?;
    }

    Ok(())
}
