// Statement Analytics - CLI
//
//   statement-analytics init
//   statement-analytics import <csv> <user_id> <card_name>
//   statement-analytics report <user_id> [trends|rolling|yoy|summary|categories|dashboard]

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::env;
use std::path::Path;
use std::sync::Arc;

use statement_analytics::{
    import_csv, init_tracing, setup_database, AnalyticsEngine, AnalyticsFilter, AppConfig,
    SqliteStore,
};

const USAGE: &str = "\
Usage:
  statement-analytics init
  statement-analytics import <csv> <user_id> <card_name>
  statement-analytics report <user_id> [trends|rolling|yoy|summary|categories|dashboard]";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_level);

    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("init") => run_init(&config),
        Some("import") => match &args[1..] {
            [csv, user_id, card_name] => run_import(&config, Path::new(csv), user_id, card_name),
            _ => bail!("import expects <csv> <user_id> <card_name>\n\n{}", USAGE),
        },
        Some("report") => match &args[1..] {
            [user_id] => run_report(&config, user_id, "dashboard").await,
            [user_id, kind] => run_report(&config, user_id, kind).await,
            _ => bail!("report expects <user_id> [kind]\n\n{}", USAGE),
        },
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn run_init(config: &AppConfig) -> Result<()> {
    println!("🔧 Setting up database...");
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database at {:?}", config.database_path))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode: {:?}", config.database_path);
    Ok(())
}

fn run_import(config: &AppConfig, csv_path: &Path, user_id: &str, card_name: &str) -> Result<()> {
    println!("📂 Importing {:?} for {} / {}", csv_path, user_id, card_name);

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database at {:?}", config.database_path))?;
    setup_database(&conn)?;

    let report = import_csv(&conn, csv_path, user_id, card_name)?;

    println!("✓ Rows read:        {}", report.rows);
    println!("✓ Statements:       {}", report.statements);
    println!("✓ Inserted:         {}", report.inserted);
    println!("✓ Duplicates skipped: {}", report.duplicates);
    Ok(())
}

async fn run_report(config: &AppConfig, user_id: &str, kind: &str) -> Result<()> {
    if !config.database_path.exists() {
        bail!(
            "Database not found at {:?}. Run `statement-analytics init` or import a statement first.",
            config.database_path
        );
    }

    let store = SqliteStore::open(&config.database_path)?;
    let engine = AnalyticsEngine::new(Arc::new(store), config.engine.clone());

    let user = engine.resolve_identity(Some(user_id)).await?;
    let filter = AnalyticsFilter::default();

    match kind {
        "trends" => print_json(&engine.category_trends(&user, &filter).await?),
        "rolling" => print_json(&engine.rolling_average(&user, &filter, None).await?),
        "yoy" => print_json(&engine.year_over_year(&user, &filter).await?),
        "summary" => print_json(&engine.summary(&user, &filter).await?),
        "categories" => print_json(&engine.categories(&user).await?),
        "dashboard" => print_json(&engine.dashboard(&user, &filter).await?),
        other => Err(anyhow!("unknown report '{}'\n\n{}", other, USAGE)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
