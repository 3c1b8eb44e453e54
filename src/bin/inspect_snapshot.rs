use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{env, fs::File, path::Path, process::exit};

/// Print schema and row-count details for the Parquet snapshot in a data
/// directory. Handy when deciding whether a merge actually landed.
fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <DATA_DIR>", args[0]);
        exit(1);
    }

    let snapshot = Path::new(&args[1]).join("employees.parquet");
    if !snapshot.is_file() {
        eprintln!("no parquet snapshot at {}", snapshot.display());
        exit(1);
    }
    if let Err(e) = inspect(&snapshot) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

fn inspect(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let parquet_meta = reader.metadata();
    let file_meta = parquet_meta.file_metadata();
    let file_size = std::fs::metadata(path)?.len();

    println!("=== Snapshot: {} ===", path.display());
    println!("Records:    {}", file_meta.num_rows());
    println!("Row groups: {}", parquet_meta.num_row_groups());
    println!("Size:       {} bytes", file_size);
    println!();

    println!("=== Columns ===");
    for col_desc in file_meta.schema_descr().columns() {
        let logical = col_desc
            .logical_type()
            .as_ref()
            .map_or("<none>".to_string(), |lt| format!("{:?}", lt));
        println!(
            "- {:<24} | Physical: {:<10} | Logical: {}",
            col_desc.name(),
            format!("{:?}", col_desc.physical_type()),
            logical
        );
    }

    Ok(())
}
