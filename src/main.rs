use hrstore::{EmployeeStore, StoreConfig, StoreError};
use std::{env, process::exit};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // ─── init logging ────────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    // ─── resolve config ──────────────────────────────────────────────
    let config = match env::var("HRSTORE_CONFIG") {
        Ok(path) => match StoreConfig::from_yaml(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("config error: {:#}", e);
                exit(2);
            }
        },
        Err(_) => StoreConfig::default(),
    };

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        usage();
        exit(2);
    }

    let store = EmployeeStore::open(config);
    info!(loaded = store.is_loaded(), "store opened");

    if let Err(e) = run(&store, &args) {
        eprintln!("error: {}", e);
        exit(exit_code(&e));
    }
}

fn run(store: &EmployeeStore, args: &[String]) -> Result<(), StoreError> {
    match (args[0].as_str(), &args[1..]) {
        ("status", []) => {
            match store.row_count() {
                Some(rows) => println!("loaded: {} records", rows),
                None => println!("not loaded"),
            }
            Ok(())
        }
        ("lookup", [id]) => {
            let record = store.lookup_by_id(id)?;
            println!("{}", serde_json::to_string_pretty(&record).unwrap());
            Ok(())
        }
        ("lookup", ids) if !ids.is_empty() => {
            let outcomes = store.lookup_many(ids)?;
            println!("{}", serde_json::to_string_pretty(&outcomes).unwrap());
            Ok(())
        }
        ("dob", [date]) => {
            let summaries = store.lookup_by_dob(date)?;
            println!("{}", serde_json::to_string_pretty(&summaries).unwrap());
            Ok(())
        }
        ("merge", [file]) => {
            let report = store.merge_upload(file.as_ref())?;
            println!(
                "appended {}, skipped {} existing, {} records total",
                report.appended, report.skipped_existing, report.total
            );
            Ok(())
        }
        ("reset", []) => {
            let removed = store.reset()?;
            println!("removed {} snapshot file(s)", removed);
            Ok(())
        }
        _ => {
            usage();
            exit(2);
        }
    }
}

fn usage() {
    eprintln!("Usage: hrstore <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status              show whether the dataset is loaded");
    eprintln!("  lookup <ID>...      look up records by employee id");
    eprintln!("  dob <DATE>          list records matching a date of birth");
    eprintln!("  merge <FILE>        append a CSV/XLSX upload to the dataset");
    eprintln!("  reset               delete the dataset and clear the store");
    eprintln!();
    eprintln!("Set HRSTORE_CONFIG to a YAML config path to override defaults.");
}

fn exit_code(err: &StoreError) -> i32 {
    match err {
        StoreError::NotFound => 1,
        StoreError::InvalidId(_) | StoreError::InvalidDate(_) => 2,
        StoreError::NotLoaded => 3,
        _ => 4,
    }
}
