mod keys;
mod lock;

pub use keys::{allocate, ensure_unique};
pub use lock::TableLock;

use crate::document::TableDocument;
use crate::error::{Result, TableDbError};
use crate::schema::Schema;
use crate::validation;
use crate::value::{coerce, Row, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default directory holding table files
pub const DEFAULT_BASE_DIR: &str = "Database";

const TABLE_EXTENSION: &str = "json";

/// Settings for a TableStore
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Directory holding one `<table>.json` file per table
    pub base_dir: PathBuf,
    /// Serialize writers to the same table through a `.lock` sidecar file
    pub lock_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            lock_writes: true,
        }
    }
}

/// The main entry point for TableDB.
///
/// Every operation loads the table file, applies one change in memory and
/// writes the whole document back. Nothing is cached between calls; the
/// file is the source of truth.
pub struct TableStore {
    options: StoreOptions,
}

impl TableStore {
    /// Open a store rooted at `base_dir`. The directory is created on the
    /// first `create`.
    pub fn open(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(StoreOptions {
            base_dir: base_dir.into(),
            ..StoreOptions::default()
        })
    }

    pub fn with_options(options: StoreOptions) -> Self {
        TableStore { options }
    }

    pub fn base_dir(&self) -> &Path {
        &self.options.base_dir
    }

    /// File path for a table: `<base_dir>/<name>.json`
    pub fn table_path(&self, name: &str) -> Result<PathBuf> {
        validation::validate_table_name(name)?;
        Ok(self
            .options
            .base_dir
            .join(format!("{name}.{TABLE_EXTENSION}")))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.table_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Names of all tables in the base directory, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let base = &self.options.base_dir;
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = base.join(format!("*.{TABLE_EXTENSION}"));
        let pattern = pattern.to_string_lossy();
        let mut names = Vec::new();
        for entry in glob::glob(&pattern)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidInput, e.to_string()))?
        {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if validation::validate_table_name(stem).is_ok() && path.is_file() {
                names.push(stem.to_string());
            } else {
                log::warn!("Skipping non-table file {}", path.display());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a new, empty table. A primary `id:int` column is prepended
    /// when the schema declares no primary key.
    pub fn create(&self, name: &str, schema: Schema) -> Result<TableDocument> {
        let path = self.table_path(name)?;
        let schema = schema.with_primary_key()?;
        let doc = TableDocument::new(name, schema)?;

        std::fs::create_dir_all(&self.options.base_dir)?;
        let _lock = self.lock(&path)?;

        if path.exists() {
            return Err(TableDbError::AlreadyExists {
                table: name.to_string(),
            });
        }

        doc.save(&path)?;
        log::info!(
            "Created table '{}' with {} columns at {}",
            name,
            doc.schema().len(),
            path.display()
        );
        Ok(doc)
    }

    /// Load a table without changing it.
    pub fn read(&self, name: &str) -> Result<TableDocument> {
        let path = self.table_path(name)?;
        TableDocument::load(&path)
    }

    /// Append a row. `values` are raw values for every non-key column, in
    /// schema order; the primary key is assigned. Returns the new key.
    pub fn insert<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<i64> {
        self.mutate(name, |doc| {
            let schema = doc.schema();
            let expected: Vec<&str> = schema.value_columns().map(|(_, c)| c.name.as_str()).collect();
            if values.len() != expected.len() {
                return Err(TableDbError::SchemaMismatch(format!(
                    "table '{}' expects {} values ({}), got {}",
                    doc.name(),
                    expected.len(),
                    expected.join(", "),
                    values.len()
                )));
            }

            let key_index = doc.key_index();
            let key = allocate(doc.rows(), key_index)?;

            let mut raw = values.iter();
            let mut row: Row = Vec::with_capacity(schema.len());
            for (i, column) in schema.columns().iter().enumerate() {
                if i == key_index {
                    row.push(Value::Int(key));
                } else if let Some(v) = raw.next() {
                    row.push(coerce(v.as_ref(), &column.data_type)?);
                }
            }

            validation::check_row(schema, &row)?;
            doc.rows_mut().push(row);
            log::debug!("Inserted key {key} into '{name}'");
            Ok((key, true))
        })
    }

    /// Append a row whose primary key is supplied by the caller. `values`
    /// cover every column, key included, in schema order.
    pub fn insert_with_key<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<i64> {
        self.mutate(name, |doc| {
            let schema = doc.schema();
            if values.len() != schema.len() {
                return Err(TableDbError::SchemaMismatch(format!(
                    "table '{}' expects {} values including the key, got {}",
                    doc.name(),
                    schema.len(),
                    values.len()
                )));
            }

            let row = values
                .iter()
                .zip(schema.columns())
                .map(|(v, column)| coerce(v.as_ref(), &column.data_type))
                .collect::<Result<Row>>()?;
            validation::check_row(schema, &row)?;

            let key_index = doc.key_index();
            let key = validation::row_key(&row, key_index).ok_or_else(|| {
                TableDbError::SchemaMismatch("primary key value must be an int".into())
            })?;
            ensure_unique(doc.name(), doc.rows(), key_index, key)?;

            doc.rows_mut().push(row);
            log::debug!("Inserted caller-supplied key {key} into '{name}'");
            Ok((key, true))
        })
    }

    /// Remove the row with the given primary key. A key that is not
    /// present is not an error: nothing is written and `false` is returned.
    pub fn delete_by_key(&self, name: &str, key: i64) -> Result<bool> {
        self.mutate(name, |doc| match doc.position_of_key(key) {
            Some(pos) => {
                doc.rows_mut().remove(pos);
                log::debug!("Deleted key {key} from '{name}'");
                Ok((true, true))
            }
            None => {
                log::warn!("Delete of key {key} in '{name}' matched no row");
                Ok((false, false))
            }
        })
    }

    /// Remove the row at a 1-based ordinal and return it.
    pub fn delete_by_position(&self, name: &str, ordinal: usize) -> Result<Row> {
        self.mutate(name, |doc| {
            let index = row_index(doc, ordinal)?;
            let removed = doc.rows_mut().remove(index);
            log::debug!("Deleted row {ordinal} from '{name}'");
            Ok((removed, true))
        })
    }

    /// Replace one cell, addressed by 1-based row and column ordinals.
    pub fn update_by_position(
        &self,
        name: &str,
        row_ordinal: usize,
        col_ordinal: usize,
        raw: &str,
    ) -> Result<()> {
        self.mutate(name, |doc| {
            let col = col_ordinal
                .checked_sub(1)
                .filter(|c| *c < doc.schema().len())
                .ok_or_else(|| TableDbError::OutOfRange {
                    what: "column".into(),
                    index: col_ordinal,
                    max: doc.schema().len(),
                })?;
            set_cell(doc, row_ordinal, col, raw)?;
            Ok(((), true))
        })
    }

    /// Replace one cell, addressing the column by name.
    pub fn update_by_column(
        &self,
        name: &str,
        row_ordinal: usize,
        column: &str,
        raw: &str,
    ) -> Result<()> {
        self.mutate(name, |doc| {
            let col = doc.column_index(column).ok_or_else(|| {
                TableDbError::not_found(format!("column '{column}' in table '{name}'"))
            })?;
            set_cell(doc, row_ordinal, col, raw)?;
            Ok(((), true))
        })
    }

    /// Load, apply `f`, and save when `f` reports a change. The table lock
    /// is held across the whole cycle.
    fn mutate<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut TableDocument) -> Result<(T, bool)>,
    ) -> Result<T> {
        let path = self.table_path(name)?;
        if !path.is_file() {
            return Err(TableDbError::not_found(format!("table '{name}'")));
        }
        let _lock = self.lock(&path)?;

        let mut doc = TableDocument::load(&path)?;
        let (out, changed) = f(&mut doc)?;
        if changed {
            doc.save(&path)?;
        }
        Ok(out)
    }

    fn lock(&self, table_path: &Path) -> Result<Option<TableLock>> {
        if !self.options.lock_writes {
            return Ok(None);
        }
        TableLock::exclusive(table_path).map(Some)
    }
}

/// Coerce `raw` into the cell at `row_ordinal` / `col`. A new primary key
/// must not collide with another row's key.
fn set_cell(doc: &mut TableDocument, row_ordinal: usize, col: usize, raw: &str) -> Result<()> {
    let index = row_index(doc, row_ordinal)?;
    let column = &doc.schema().columns()[col];
    let value = coerce(raw, &column.data_type)?;

    if col == doc.key_index() {
        if let Some(new_key) = value.as_int() {
            let taken = doc
                .rows()
                .iter()
                .enumerate()
                .any(|(i, r)| i != index && validation::row_key(r, col) == Some(new_key));
            if taken {
                return Err(TableDbError::DuplicateKey {
                    table: doc.name().to_string(),
                    key: new_key,
                });
            }
        }
    }

    log::debug!(
        "Updated '{}' row {row_ordinal} column '{}'",
        doc.name(),
        column.name
    );
    doc.rows_mut()[index][col] = value;
    Ok(())
}

/// 0-based row index for a 1-based ordinal
fn row_index(doc: &TableDocument, ordinal: usize) -> Result<usize> {
    ordinal
        .checked_sub(1)
        .filter(|i| *i < doc.row_count())
        .ok_or_else(|| TableDbError::OutOfRange {
            what: "row".into(),
            index: ordinal,
            max: doc.row_count(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_column_list;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, TableStore) {
        let tmp = TempDir::new().unwrap();
        let store = TableStore::open(tmp.path().join("Database"));
        let schema =
            parse_column_list("id:int:primary,username:string,email:string,is_active:bool")
                .unwrap();
        store.create("users", schema).unwrap();
        (tmp, store)
    }

    fn keys(store: &TableStore, name: &str) -> Vec<i64> {
        store.read(name).unwrap().keys()
    }

    #[test]
    fn test_create_writes_empty_table() {
        let (tmp, store) = setup_test_store();
        let path = tmp.path().join("Database/users.json");
        assert!(path.is_file());

        let doc = store.read("users").unwrap();
        assert_eq!(doc.name(), "users");
        assert_eq!(doc.schema().len(), 4);
        assert_eq!(doc.row_count(), 0);
    }

    #[test]
    fn test_create_existing_table_fails() {
        let (_tmp, store) = setup_test_store();
        let schema = parse_column_list("id:int:primary").unwrap();
        let err = store.create("users", schema).unwrap_err();
        assert!(matches!(err, TableDbError::AlreadyExists { .. }));
        // The existing schema is untouched
        assert_eq!(store.read("users").unwrap().schema().len(), 4);
    }

    #[test]
    fn test_create_synthesizes_primary_key() {
        let (_tmp, store) = setup_test_store();
        let doc = store
            .create("notes", parse_column_list("title:string,body:string").unwrap())
            .unwrap();
        assert_eq!(doc.key_index(), 0);
        assert_eq!(doc.schema().columns()[0].name, "id");

        let key = store.insert("notes", &["hello", "world"]).unwrap();
        assert_eq!(key, 1);
    }

    #[test]
    fn test_create_rejects_non_int_primary_key() {
        let (_tmp, store) = setup_test_store();
        let err = parse_column_list("code:string:primary,title:string").unwrap_err();
        assert!(matches!(err, TableDbError::SchemaMismatch(_)));
        assert!(!store.exists("codes"));
    }

    #[test]
    fn test_create_rejects_bad_name() {
        let (_tmp, store) = setup_test_store();
        let schema = parse_column_list("id:int:primary").unwrap();
        assert!(matches!(
            store.create("../escape", schema),
            Err(TableDbError::InvalidName(_))
        ));
    }

    #[test]
    fn test_insert_assigns_increasing_keys() {
        let (_tmp, store) = setup_test_store();
        assert_eq!(store.insert("users", &["a", "a@x", "true"]).unwrap(), 1);
        assert_eq!(store.insert("users", &["b", "b@x", "false"]).unwrap(), 2);
        assert_eq!(store.insert("users", &["c", "c@x", "1"]).unwrap(), 3);
        assert_eq!(keys(&store, "users"), vec![1, 2, 3]);
    }

    #[test]
    fn test_insert_key_in_middle_column() {
        let (_tmp, store) = setup_test_store();
        let schema = parse_column_list("sku:string,id:int:primary,price:float").unwrap();
        store.create("items", schema).unwrap();

        store.insert("items", &["A-1", "9.99"]).unwrap();
        let doc = store.read("items").unwrap();
        assert_eq!(
            doc.rows()[0],
            vec![Value::from("A-1"), Value::Int(1), Value::Float(9.99)]
        );
    }

    #[test]
    fn test_insert_invalid_value_leaves_file_unchanged() {
        let (tmp, store) = setup_test_store();
        store.insert("users", &["a", "a@x", "true"]).unwrap();
        let path = tmp.path().join("Database/users.json");
        let before = std::fs::read_to_string(&path).unwrap();

        let err = store.insert("users", &["b", "b@x", "maybe"]).unwrap_err();
        assert!(matches!(err, TableDbError::InvalidValue { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_insert_into_missing_table() {
        let (tmp, store) = setup_test_store();
        let err = store.insert("ghosts", &["x"]).unwrap_err();
        assert!(matches!(err, TableDbError::NotFound { .. }));
        assert!(!tmp.path().join("Database/ghosts.json.lock").exists());
    }

    #[test]
    fn test_insert_with_key() {
        let (_tmp, store) = setup_test_store();
        store.insert_with_key("users", &["10", "a", "a@x", "true"]).unwrap();
        assert_eq!(store.insert("users", &["b", "b@x", "false"]).unwrap(), 11);

        let err = store
            .insert_with_key("users", &["10", "c", "c@x", "true"])
            .unwrap_err();
        assert!(matches!(err, TableDbError::DuplicateKey { key: 10, .. }));

        let err = store.insert_with_key("users", &["c", "c@x", "true"]).unwrap_err();
        assert!(matches!(err, TableDbError::SchemaMismatch(_)));

        let err = store
            .insert_with_key("users", &["x", "c", "c@x", "true"])
            .unwrap_err();
        assert!(matches!(err, TableDbError::InvalidValue { .. }));
        assert_eq!(keys(&store, "users"), vec![10, 11]);
    }

    #[test]
    fn test_delete_by_key_absent_is_noop() {
        let (tmp, store) = setup_test_store();
        store.insert("users", &["a", "a@x", "true"]).unwrap();
        let path = tmp.path().join("Database/users.json");
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(!store.delete_by_key("users", 42).unwrap());
        assert!(!store.delete_by_key("users", 42).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_delete_by_key_preserves_order() {
        let (_tmp, store) = setup_test_store();
        for n in ["a", "b", "c", "d"] {
            store.insert("users", &[n, "x@x", "true"]).unwrap();
        }
        assert!(store.delete_by_key("users", 2).unwrap());
        assert_eq!(keys(&store, "users"), vec![1, 3, 4]);
        // Gaps are kept; the next key follows the maximum
        assert_eq!(store.insert("users", &["e", "e@x", "true"]).unwrap(), 5);
    }

    #[test]
    fn test_delete_by_position() {
        let (_tmp, store) = setup_test_store();
        for n in ["a", "b", "c"] {
            store.insert("users", &[n, "x@x", "true"]).unwrap();
        }

        let removed = store.delete_by_position("users", 2).unwrap();
        assert_eq!(removed[1], Value::from("b"));
        assert_eq!(keys(&store, "users"), vec![1, 3]);

        for bad in [0, 3, 100] {
            let err = store.delete_by_position("users", bad).unwrap_err();
            assert!(matches!(err, TableDbError::OutOfRange { .. }), "ordinal {bad}");
        }
        assert_eq!(keys(&store, "users"), vec![1, 3]);
    }

    #[test]
    fn test_delete_by_position_empty_table() {
        let (_tmp, store) = setup_test_store();
        let err = store.delete_by_position("users", 1).unwrap_err();
        assert_eq!(err.to_string(), "row 1 out of range (valid: 1..=0)");
    }

    #[test]
    fn test_update_by_position() {
        let (_tmp, store) = setup_test_store();
        store.insert("users", &["a", "a@x", "true"]).unwrap();
        store.insert("users", &["b", "b@x", "true"]).unwrap();

        store.update_by_position("users", 2, 4, "false").unwrap();
        let doc = store.read("users").unwrap();
        assert_eq!(doc.rows()[1][3], Value::Bool(false));
        assert_eq!(doc.rows()[0][3], Value::Bool(true));
    }

    #[test]
    fn test_update_by_position_errors() {
        let (_tmp, store) = setup_test_store();
        store.insert("users", &["a", "a@x", "true"]).unwrap();

        assert!(matches!(
            store.update_by_position("users", 2, 1, "5"),
            Err(TableDbError::OutOfRange { .. })
        ));
        assert!(matches!(
            store.update_by_position("users", 1, 5, "x"),
            Err(TableDbError::OutOfRange { .. })
        ));
        assert!(matches!(
            store.update_by_position("users", 1, 0, "x"),
            Err(TableDbError::OutOfRange { .. })
        ));
        assert!(matches!(
            store.update_by_position("users", 1, 4, "nope"),
            Err(TableDbError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_update_primary_key_must_stay_unique() {
        let (_tmp, store) = setup_test_store();
        store.insert("users", &["a", "a@x", "true"]).unwrap();
        store.insert("users", &["b", "b@x", "true"]).unwrap();

        assert!(matches!(
            store.update_by_position("users", 2, 1, "1"),
            Err(TableDbError::DuplicateKey { key: 1, .. })
        ));
        // Rewriting a row's own key is fine
        store.update_by_position("users", 2, 1, "2").unwrap();
        store.update_by_position("users", 2, 1, "7").unwrap();
        assert_eq!(keys(&store, "users"), vec![1, 7]);
    }

    #[test]
    fn test_update_by_column_name() {
        let (_tmp, store) = setup_test_store();
        store.insert("users", &["a", "a@x", "true"]).unwrap();

        store.update_by_column("users", 1, "email", "new@x").unwrap();
        assert_eq!(store.read("users").unwrap().rows()[0][2], Value::from("new@x"));

        assert!(matches!(
            store.update_by_column("users", 1, "Email", "z"),
            Err(TableDbError::NotFound { .. })
        ));
        assert!(matches!(
            store.update_by_column("users", 2, "email", "z"),
            Err(TableDbError::OutOfRange { .. })
        ));
        assert!(matches!(
            store.update_by_column("ghosts", 1, "email", "z"),
            Err(TableDbError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_by_column_name_holds_the_lock() {
        let (tmp, store) = setup_test_store();
        store.insert("users", &["a", "a@x", "true"]).unwrap();

        let held = TableLock::try_exclusive(&tmp.path().join("Database/users.json")).unwrap();
        let other = TableStore::open(tmp.path().join("Database"));
        let writer =
            std::thread::spawn(move || other.update_by_column("users", 1, "username", "b"));
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(store.read("users").unwrap().rows()[0][1], Value::from("a"));

        drop(held);
        writer.join().unwrap().unwrap();
        assert_eq!(store.read("users").unwrap().rows()[0][1], Value::from("b"));
    }

    #[test]
    fn test_list_tables() {
        let (tmp, store) = setup_test_store();
        store
            .create("accounts", parse_column_list("name:string").unwrap())
            .unwrap();
        std::fs::write(tmp.path().join("Database/readme.txt"), "not a table").unwrap();
        std::fs::write(tmp.path().join("Database/has space.json"), "{}").unwrap();

        assert_eq!(store.list_tables().unwrap(), vec!["accounts", "users"]);
    }

    #[test]
    fn test_list_tables_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let store = TableStore::open(tmp.path().join("nowhere"));
        assert!(store.list_tables().unwrap().is_empty());
    }

    #[test]
    fn test_writes_without_lock_file() {
        let tmp = TempDir::new().unwrap();
        let store = TableStore::with_options(StoreOptions {
            base_dir: tmp.path().to_path_buf(),
            lock_writes: false,
        });
        store
            .create("t", parse_column_list("v:int").unwrap())
            .unwrap();
        store.insert("t", &["5"]).unwrap();
        assert!(!tmp.path().join("t.json.lock").exists());
        assert_eq!(store.read("t").unwrap().rows()[0], vec![Value::Int(1), Value::Int(5)]);
    }

    #[test]
    fn test_held_lock_is_released_after_error() {
        let (tmp, store) = setup_test_store();
        let _ = store.insert("users", &["too", "few"]);
        let path = tmp.path().join("Database/users.json");
        assert!(TableLock::try_exclusive(&path).is_ok());
    }
}
