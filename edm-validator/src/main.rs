// Loads spreadsheet/CSV data into SQLite tables named {file_stem}.{sheet},
// then runs declarative test cases (SQL or KEYWORD) against them.

// reset; cargo run -- ./data/people.csv --tests ./data/test_cases.csv
// reset; cargo run -- ./data/edm_extract.xlsx --tests ./data/test_cases.xlsx --report ./report.csv --verbose
// reset; cargo run -- ./data/people.csv --sql 'SELECT * FROM "people.csv" LIMIT 5'

mod output;

use std::path::PathBuf;

use clap::Parser;
use validator_lib::{
    ERRORS_LOG_FILE, LoadOutcome, Session, SqlOutcome, StoreMode, testcase::load_test_cases,
};

#[derive(Parser)]
#[command(name = "edm-validator")]
#[command(about = "A tool to load spreadsheet data into SQLite and validate it with declarative test cases")]
#[command(version)]
struct Args {
    /// Data files to load (.xlsx, .xlsm, .xlsb, .xls or .csv); every sheet becomes one table named {file_stem}.{sheet}
    #[arg(value_name = "DATA_FILE")]
    data_files: Vec<PathBuf>,

    /// Test case file with the columns TC_Name, Call Type, SQL/Keyword, Expected_Result
    #[arg(short, long, value_name = "FILE")]
    tests: Option<PathBuf>,

    /// Run one SQL statement against the loaded data and print the result (repeatable)
    #[arg(short = 's', long = "sql", value_name = "SQL")]
    sql: Vec<String>,

    /// List the tables the loaded files produced
    #[arg(long)]
    tables: bool,

    /// Print the first rows of one table
    #[arg(long, value_name = "TABLE")]
    preview: Option<String>,

    /// Maximum number of rows --preview prints
    #[arg(long, default_value_t = 100)]
    limit: usize,

    /// Write the run report to this CSV file
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Back the store with this SQLite file instead of memory (recreated fresh each run, kept afterwards)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Print the run report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Print load progress and one PASS/FAIL line per executed case
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arguments = Args::parse();

    let has_action = arguments.tests.is_some()
        || !arguments.sql.is_empty()
        || arguments.tables
        || arguments.preview.is_some();
    if !has_action {
        eprintln!("Nothing to do: pass --tests, --sql, --tables or --preview.");
        std::process::exit(2);
    }

    let mode = match &arguments.db {
        Some(path) => StoreMode::Disk(path.clone()),
        None => StoreMode::Memory,
    };
    let mut session = Session::new(mode)?;

    for file in &arguments.data_files {
        match session.load_data_file(file)? {
            LoadOutcome::Loaded(summary) => {
                if arguments.verbose {
                    println!("{}", summary.summary());
                }
            }
            LoadOutcome::AlreadyLoaded => {
                if arguments.verbose {
                    println!("Skipping '{}': already loaded", file.display());
                }
            }
        }
    }

    if arguments.tables {
        output::print_table_list(&session.table_names()?);
    }

    if let Some(table) = &arguments.preview {
        let preview = session.preview(table, arguments.limit)?;
        output::print_query_output(&preview);
    }

    for sql in &arguments.sql {
        match session.run_sql(sql)? {
            SqlOutcome::Rows(result) => output::print_query_output(&result),
            SqlOutcome::Statement { .. } => println!("Query executed successfully."),
        }
    }

    let Some(tests) = &arguments.tests else {
        return Ok(());
    };
    let cases = load_test_cases(tests)?;
    let report = session.run(&cases);

    if arguments.verbose {
        for result in &report.results {
            println!("[{}] {}", result.status, result.tc_name);
        }
    }

    if arguments.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.format_report());
    }

    if let Some(path) = &arguments.report {
        report.write_csv(path)?;
        println!("✅ Report saved to {}", path.display());
    }

    if report.all_passed() {
        println!(
            "✅ Validation completed: all {} test case(s) passed",
            report.total()
        );
    } else {
        println!(
            "❌ Validation finished with {} failure(s) and {} error(s)",
            report.failed(),
            report.errors()
        );
        eprintln!("❌ Check {} for details.", ERRORS_LOG_FILE);
        std::process::exit(1);
    }

    Ok(())
}
