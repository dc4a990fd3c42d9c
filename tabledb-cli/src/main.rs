use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tabledb::display::{render_schema, render_table};
use tabledb::schema::{parse_column_list, parse_schema};
use tabledb::{StoreOptions, TableStore};

/// TableDB CLI: manage single-file JSON tables from the command line
#[derive(Parser)]
#[command(name = "tabledb", version, about)]
struct Cli {
    /// Directory holding the table files
    #[arg(long, default_value = tabledb::store::DEFAULT_BASE_DIR)]
    data_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    /// Skip the per-table write lock
    #[arg(long)]
    no_lock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new table
    #[command(group(ArgGroup::new("schema").required(true).args(["columns", "schema_file"])))]
    Create {
        /// Table name
        table: String,
        /// Columns as name:type[:primary],... (e.g. id:int:primary,username:string)
        #[arg(long)]
        columns: Option<String>,
        /// Read columns from a YAML or JSON file
        #[arg(long)]
        schema_file: Option<PathBuf>,
    },

    /// Append a row
    Insert {
        /// Table name
        table: String,
        /// Values for every non-key column, in column order
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
        /// Values include the primary key instead of assigning one
        #[arg(long)]
        with_key: bool,
    },

    /// Delete a row by primary key or by 1-based row number
    #[command(group(ArgGroup::new("target").required(true).args(["key", "row"])))]
    Delete {
        /// Table name
        table: String,
        /// Primary key of the row to delete
        #[arg(long)]
        key: Option<i64>,
        /// 1-based row number to delete
        #[arg(long)]
        row: Option<usize>,
    },

    /// Replace a single value
    #[command(group(ArgGroup::new("col").required(true).args(["column", "column_name"])))]
    Update {
        /// Table name
        table: String,
        /// 1-based row number
        #[arg(long)]
        row: usize,
        /// 1-based column number
        #[arg(long)]
        column: Option<usize>,
        /// Column name
        #[arg(long)]
        column_name: Option<String>,
        /// New value
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Print a table's columns and rows
    Show {
        /// Table name
        table: String,
    },

    /// List tables in the data directory
    List,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = TableStore::with_options(StoreOptions {
        base_dir: cli.data_dir.clone(),
        lock_writes: !cli.no_lock,
    });
    log::debug!("Using data directory {}", store.base_dir().display());

    match cli.command {
        Command::Create {
            table,
            columns,
            schema_file,
        } => {
            let schema = match (columns, schema_file) {
                (Some(list), _) => parse_column_list(&list)?,
                (None, Some(path)) => parse_schema(&path)?,
                (None, None) => return Err("either --columns or --schema-file is required".into()),
            };
            let doc = store.create(&table, schema)?;
            match cli.format {
                OutputFormat::Table => {
                    println!("Created table {}", doc.name());
                    print!("{}", render_schema(&doc));
                }
                _ => print_output(&doc.to_json()?, &cli.format)?,
            }
        }

        Command::Insert {
            table,
            values,
            with_key,
        } => {
            let key = if with_key {
                store.insert_with_key(&table, values.as_slice())?
            } else {
                store.insert(&table, values.as_slice())?
            };
            print_output(&serde_json::json!({ "ok": true, "key": key }), &cli.format)?;
        }

        Command::Delete { table, key, row } => {
            let result = match (key, row) {
                (Some(key), _) => {
                    let deleted = store.delete_by_key(&table, key)?;
                    serde_json::json!({ "ok": true, "deleted": deleted, "key": key })
                }
                (None, Some(row)) => {
                    store.delete_by_position(&table, row)?;
                    serde_json::json!({ "ok": true, "deleted": true, "row": row })
                }
                (None, None) => return Err("either --key or --row is required".into()),
            };
            print_output(&result, &cli.format)?;
        }

        Command::Update {
            table,
            row,
            column,
            column_name,
            value,
        } => {
            match (column, column_name) {
                (Some(col), _) => store.update_by_position(&table, row, col, &value)?,
                (None, Some(name)) => store.update_by_column(&table, row, &name, &value)?,
                (None, None) => return Err("either --column or --column-name is required".into()),
            }
            print_output(&serde_json::json!({ "ok": true, "row": row }), &cli.format)?;
        }

        Command::Show { table } => {
            let doc = store.read(&table)?;
            match cli.format {
                OutputFormat::Table => print!("{}", render_table(&doc)),
                _ => print_output(&doc.to_json()?, &cli.format)?,
            }
        }

        Command::List => {
            let tables = store.list_tables()?;
            match cli.format {
                OutputFormat::Table => {
                    for name in tables {
                        println!("{name}");
                    }
                }
                _ => print_output(&serde_json::json!(tables), &cli.format)?,
            }
        }
    }

    Ok(())
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json | OutputFormat::Table => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
        }
    }
    Ok(())
}
