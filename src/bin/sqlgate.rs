use sqlgate::config::{self, Config};
use sqlgate::core::db::format_value;
use sqlgate::{Query, Queryable, Result, Rows, SqlDatabase, Transactional};
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // Logs go to stderr so query output stays clean on stdout
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    info!("Starting sqlgate...");

    let statements: Vec<String> = std::env::args().skip(1).collect();
    if statements.is_empty() {
        eprintln!("usage: sqlgate <sql> [<sql> ...]");
        return ExitCode::from(2);
    }

    let config = match load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let db_config = &config.database;
    let mut db = SqlDatabase::new();
    if let Err(e) = db.init(&db_config.driver, &db_config.connection_string, db_config.max_retries) {
        // The process does not run without its database.
        error!("{}", e);
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let outcome = execute(&db, &statements);

    if let Err(e) = db.close() {
        warn!("Failed to close database connection: {}", e);
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load() -> Result<Config> {
    let path = config::config_path().ok_or_else(|| {
        sqlgate::SqlGateError::Config(format!(
            "no configuration directory; set {}",
            config::CONFIG_ENV
        ))
    })?;
    config::load_config(path)
}

/// One statement is a plain query; several run as a single transaction.
fn execute(db: &SqlDatabase, statements: &[String]) -> Result<()> {
    if let [sql] = statements {
        let rows = db.run_query(sql, &[])?;
        print_rows(rows);
        return Ok(());
    }

    let queries: Vec<Query> = statements
        .iter()
        .map(|sql| Query::text_only(sql.as_str()))
        .collect();
    db.run_transaction(&queries)?;
    println!("Transaction committed ({} statements)", queries.len());
    Ok(())
}

fn print_rows(rows: Rows) {
    if !rows.columns().is_empty() {
        println!("{}", rows.columns().join("\t"));
    }
    for row in rows {
        let line: Vec<String> = row.values().iter().map(format_value).collect();
        println!("{}", line.join("\t"));
    }
}
