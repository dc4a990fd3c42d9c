use crate::error::{Result, TableDbError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock on a table's sidecar `.lock` file.
///
/// Held for one load-mutate-save cycle. Released when dropped, which
/// closes the file descriptor.
#[derive(Debug)]
pub struct TableLock {
    _file: File,
    path: PathBuf,
}

impl TableLock {
    /// Lock file path for a table file: `users.json` -> `users.json.lock`
    pub fn path_for(table_path: &Path) -> PathBuf {
        let mut name = table_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Block until the exclusive lock for `table_path` is held.
    pub fn exclusive(table_path: &Path) -> Result<Self> {
        let path = Self::path_for(table_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.lock_exclusive()
            .map_err(|_| TableDbError::Lock { path: path.clone() })?;

        Ok(Self { _file: file, path })
    }

    /// Take the lock only if no other writer holds it.
    pub fn try_exclusive(table_path: &Path) -> Result<Self> {
        let path = Self::path_for(table_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive()
            .map_err(|_| TableDbError::Lock { path: path.clone() })?;

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path() {
        assert_eq!(
            TableLock::path_for(Path::new("Database/users.json")),
            PathBuf::from("Database/users.json.lock")
        );
    }

    #[test]
    fn test_exclusive_lock_blocks_second_writer() {
        let tmp = TempDir::new().unwrap();
        let table = tmp.path().join("users.json");

        let lock = TableLock::exclusive(&table).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            TableLock::try_exclusive(&table),
            Err(TableDbError::Lock { .. })
        ));

        drop(lock);
        assert!(TableLock::try_exclusive(&table).is_ok());
    }
}
