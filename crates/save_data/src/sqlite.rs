use crate::database::{self, SqlConnection, SqlValue};
use crate::{ChangeSet, PlotStorage, StorageError, WorldRecords};
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use std::path::Path;
use tracing::debug;

pub const FILE_NAME: &str = "plots.db";

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> SqlValue {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Int(i),
            ValueRef::Real(f) => SqlValue::Int(f as i64),
            ValueRef::Text(b) | ValueRef::Blob(b) => {
                SqlValue::Text(String::from_utf8_lossy(b).into_owned())
            }
        }
    }
}

impl SqlConnection for Connection {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), StorageError> {
        let mut stmt = self.prepare_cached(sql)?;
        stmt.execute(params_from_iter(params.iter()))?;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, StorageError> {
        let mut stmt = self.prepare(sql)?;
        let columns = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..columns)
                    .map(|idx| row.get_ref(idx).map(SqlValue::from))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn begin(&mut self) -> Result<(), StorageError> {
        self.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Plot storage backed by an SQLite database file.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(data_folder: impl AsRef<Path>) -> Result<SqliteStorage, StorageError> {
        let path = data_folder.as_ref().join(FILE_NAME);
        debug!("Opening sqlite plot storage at {}", path.display());
        let mut conn = Connection::open(path)?;
        database::init_schema(&mut conn)?;
        Ok(SqliteStorage { conn })
    }

    pub fn in_memory() -> Result<SqliteStorage, StorageError> {
        let mut conn = Connection::open_in_memory()?;
        database::init_schema(&mut conn)?;
        Ok(SqliteStorage { conn })
    }
}

impl PlotStorage for SqliteStorage {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn load(&mut self) -> Result<WorldRecords, StorageError> {
        database::load_all(&mut self.conn)
    }

    fn save(&mut self, worlds: &WorldRecords) -> Result<(), StorageError> {
        database::save_all(&mut self.conn, worlds)
    }

    fn supports_incremental(&self) -> bool {
        true
    }

    fn save_incremental(&mut self, changes: &ChangeSet) -> Result<(), StorageError> {
        database::save_changes(&mut self.conn, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlotRecord, PlotRecords};
    use std::collections::BTreeSet;

    const OWNER: u128 = 0xabcd;
    const OTHER: u128 = 0x1234;

    fn owned(owner: u128) -> PlotRecord {
        PlotRecord {
            owner: Some(owner),
            owner_name: Some("Alex".to_owned()),
            ..Default::default()
        }
    }

    fn world(plots: impl IntoIterator<Item = ((i32, i32), PlotRecord)>) -> WorldRecords {
        let plots: PlotRecords = plots.into_iter().collect();
        WorldRecords::from([("plotworld".to_owned(), plots)])
    }

    #[test]
    fn full_save_replaces_contents() {
        let mut storage = SqliteStorage::in_memory().unwrap();

        let mut first = owned(OWNER);
        first.home = true;
        first.denied.insert(OTHER);
        first.flags.insert("entry".to_owned(), "false".to_owned());
        first.merged.insert("south".to_owned());
        storage
            .save(&world([((0, 0), first.clone()), ((3, -4), owned(OTHER))]))
            .unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded["plotworld"].len(), 2);
        assert_eq!(loaded["plotworld"][&(0, 0)], first);

        storage.save(&world([((9, 9), owned(OTHER))])).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(
            loaded["plotworld"].keys().copied().collect::<Vec<_>>(),
            vec![(9, 9)]
        );
    }

    #[test]
    fn incremental_save_touches_only_changes() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage
            .save(&world([((0, 0), owned(OWNER)), ((1, 0), owned(OWNER))]))
            .unwrap();

        let mut updated = owned(OWNER);
        updated.trusted = BTreeSet::from([OTHER]);
        let mut changes = ChangeSet::default();
        changes.world_mut("plotworld").upsert((0, 0), updated.clone());
        changes.world_mut("plotworld").delete((1, 0));
        changes.world_mut("plotworld").upsert((2, 0), PlotRecord::default());
        storage.save_incremental(&changes).unwrap();

        let loaded = storage.load().unwrap();
        let plots = &loaded["plotworld"];
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[&(0, 0)], updated);
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        SqliteStorage::open(dir.path())
            .unwrap()
            .save(&world([((-2, 5), owned(OWNER))]))
            .unwrap();
        let loaded = SqliteStorage::open(dir.path()).unwrap().load().unwrap();
        assert_eq!(loaded["plotworld"][&(-2, 5)].owner, Some(OWNER));
    }
}
