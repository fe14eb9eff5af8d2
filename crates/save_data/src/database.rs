//! Shared SQL layout used by the SQLite and MySQL backends.

use crate::{
    ChangeSet, GridPos, HyphenatedUUID, PlotRecord, StorageError, WorldRecords,
};
use tracing::warn;

const CREATE_TABLES: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS plots (
        world_name VARCHAR(255) NOT NULL,
        plot_x INTEGER NOT NULL,
        plot_z INTEGER NOT NULL,
        owner VARCHAR(36),
        owner_name VARCHAR(255),
        home INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (world_name, plot_x, plot_z)
    )",
    "CREATE TABLE IF NOT EXISTS plot_trusted (
        world_name VARCHAR(255) NOT NULL,
        plot_x INTEGER NOT NULL,
        plot_z INTEGER NOT NULL,
        player_uuid VARCHAR(36) NOT NULL,
        PRIMARY KEY (world_name, plot_x, plot_z, player_uuid)
    )",
    "CREATE TABLE IF NOT EXISTS plot_denied (
        world_name VARCHAR(255) NOT NULL,
        plot_x INTEGER NOT NULL,
        plot_z INTEGER NOT NULL,
        player_uuid VARCHAR(36) NOT NULL,
        PRIMARY KEY (world_name, plot_x, plot_z, player_uuid)
    )",
    "CREATE TABLE IF NOT EXISTS plot_flags (
        world_name VARCHAR(255) NOT NULL,
        plot_x INTEGER NOT NULL,
        plot_z INTEGER NOT NULL,
        flag_key VARCHAR(64) NOT NULL,
        flag_value VARCHAR(255) NOT NULL,
        PRIMARY KEY (world_name, plot_x, plot_z, flag_key)
    )",
    "CREATE TABLE IF NOT EXISTS plot_merged (
        world_name VARCHAR(255) NOT NULL,
        plot_x INTEGER NOT NULL,
        plot_z INTEGER NOT NULL,
        direction VARCHAR(16) NOT NULL,
        PRIMARY KEY (world_name, plot_x, plot_z, direction)
    )",
];

/// Child tables first so a plot row is always removed last.
const TABLES: [&str; 5] = [
    "plot_flags",
    "plot_merged",
    "plot_denied",
    "plot_trusted",
    "plots",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
}

impl SqlValue {
    fn text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Null => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> SqlValue {
        SqlValue::Text(s.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> SqlValue {
        SqlValue::Text(s)
    }
}

impl From<i32> for SqlValue {
    fn from(i: i32) -> SqlValue {
        SqlValue::Int(i as i64)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> SqlValue {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// The handful of operations the plot tables need from a database driver.
pub trait SqlConnection {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), StorageError>;
    fn query(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, StorageError>;
    fn begin(&mut self) -> Result<(), StorageError>;
    fn commit(&mut self) -> Result<(), StorageError>;
    fn rollback(&mut self) -> Result<(), StorageError>;
}

pub fn init_schema(conn: &mut impl SqlConnection) -> Result<(), StorageError> {
    for sql in CREATE_TABLES {
        conn.execute(sql, &[])?;
    }
    Ok(())
}

fn in_transaction<C, F>(conn: &mut C, f: F) -> Result<(), StorageError>
where
    C: SqlConnection,
    F: FnOnce(&mut C) -> Result<(), StorageError>,
{
    conn.begin()?;
    match f(conn) {
        Ok(()) => conn.commit(),
        Err(err) => {
            if let Err(rollback_err) = conn.rollback() {
                warn!("Failed to roll back plot transaction: {}", rollback_err);
            }
            Err(err)
        }
    }
}

fn row_key(row: &[SqlValue]) -> Option<(String, GridPos)> {
    let world = row.first()?.text()?.trim();
    if world.is_empty() {
        return None;
    }
    let x = i32::try_from(row.get(1)?.int()?).ok()?;
    let z = i32::try_from(row.get(2)?.int()?).ok()?;
    Some((world.to_owned(), (x, z)))
}

fn resolve<'a>(result: &'a mut WorldRecords, row: &[SqlValue]) -> Option<&'a mut PlotRecord> {
    let (world, pos) = row_key(row)?;
    result.get_mut(&world)?.get_mut(&pos)
}

fn column_text(row: &[SqlValue], idx: usize) -> Option<&str> {
    row.get(idx)
        .and_then(SqlValue::text)
        .filter(|s| !s.trim().is_empty())
}

pub fn load_all(conn: &mut impl SqlConnection) -> Result<WorldRecords, StorageError> {
    init_schema(conn)?;
    let mut result = WorldRecords::new();

    let rows = conn.query("SELECT world_name, plot_x, plot_z, owner, owner_name, home FROM plots")?;
    for row in rows {
        let Some((world, pos)) = row_key(&row) else {
            continue;
        };
        let mut record = PlotRecord::default();
        if let Some(raw) = column_text(&row, 3) {
            match raw.parse::<HyphenatedUUID>() {
                Ok(uuid) => {
                    record.owner = Some(uuid.0);
                    record.owner_name = column_text(&row, 4).map(str::to_owned);
                }
                Err(_) => warn!(
                    "Invalid owner uuid {} for plot {};{} in {}",
                    raw, pos.0, pos.1, world
                ),
            }
        }
        record.home = record.owner.is_some() && row.get(5).and_then(SqlValue::int) == Some(1);
        result.entry(world).or_default().insert(pos, record);
    }

    for (table, trusted) in [("plot_trusted", true), ("plot_denied", false)] {
        let sql = format!("SELECT world_name, plot_x, plot_z, player_uuid FROM {}", table);
        for row in conn.query(&sql)? {
            let Some(raw) = column_text(&row, 3).map(str::to_owned) else {
                continue;
            };
            let Some(record) = resolve(&mut result, &row) else {
                continue;
            };
            match raw.parse::<HyphenatedUUID>() {
                Ok(uuid) if trusted => {
                    record.trusted.insert(uuid.0);
                }
                Ok(uuid) => {
                    record.denied.insert(uuid.0);
                }
                Err(_) => warn!("Invalid {} uuid {}", table, raw),
            }
        }
    }

    for row in conn.query("SELECT world_name, plot_x, plot_z, flag_key, flag_value FROM plot_flags")? {
        let (Some(key), Some(value)) = (column_text(&row, 3), column_text(&row, 4)) else {
            continue;
        };
        let (key, value) = (key.to_ascii_lowercase(), value.to_owned());
        if let Some(record) = resolve(&mut result, &row) {
            record.flags.insert(key, value);
        }
    }

    for row in conn.query("SELECT world_name, plot_x, plot_z, direction FROM plot_merged")? {
        let Some(direction) = column_text(&row, 3).map(|s| s.trim().to_ascii_lowercase()) else {
            continue;
        };
        if let Some(record) = resolve(&mut result, &row) {
            record.merged.insert(direction);
        }
    }

    for plots in result.values_mut() {
        plots.retain(|_, record| !record.is_default());
    }
    result.retain(|_, plots| !plots.is_empty());
    Ok(result)
}

fn insert_record(
    conn: &mut impl SqlConnection,
    world: &str,
    (x, z): GridPos,
    record: &PlotRecord,
) -> Result<(), StorageError> {
    if record.is_default() {
        return Ok(());
    }
    let key = |extra: SqlValue| vec![world.into(), x.into(), z.into(), extra];

    conn.execute(
        "INSERT INTO plots (world_name, plot_x, plot_z, owner, owner_name, home) VALUES (?, ?, ?, ?, ?, ?)",
        &[
            world.into(),
            x.into(),
            z.into(),
            record.owner.map(|o| HyphenatedUUID(o).to_string()).into(),
            record
                .owner_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .into(),
            SqlValue::Int(record.home as i64),
        ],
    )?;
    for uuid in &record.trusted {
        conn.execute(
            "INSERT INTO plot_trusted (world_name, plot_x, plot_z, player_uuid) VALUES (?, ?, ?, ?)",
            &key(HyphenatedUUID(*uuid).to_string().into()),
        )?;
    }
    for uuid in &record.denied {
        conn.execute(
            "INSERT INTO plot_denied (world_name, plot_x, plot_z, player_uuid) VALUES (?, ?, ?, ?)",
            &key(HyphenatedUUID(*uuid).to_string().into()),
        )?;
    }
    for (flag, value) in &record.flags {
        if value.trim().is_empty() {
            continue;
        }
        let mut params = key(flag.as_str().into());
        params.push(value.as_str().into());
        conn.execute(
            "INSERT INTO plot_flags (world_name, plot_x, plot_z, flag_key, flag_value) VALUES (?, ?, ?, ?, ?)",
            &params,
        )?;
    }
    for direction in &record.merged {
        conn.execute(
            "INSERT INTO plot_merged (world_name, plot_x, plot_z, direction) VALUES (?, ?, ?, ?)",
            &key(direction.as_str().into()),
        )?;
    }
    Ok(())
}

fn delete_record(
    conn: &mut impl SqlConnection,
    world: &str,
    (x, z): GridPos,
) -> Result<(), StorageError> {
    for table in TABLES {
        let sql = format!(
            "DELETE FROM {} WHERE world_name = ? AND plot_x = ? AND plot_z = ?",
            table
        );
        conn.execute(&sql, &[world.into(), x.into(), z.into()])?;
    }
    Ok(())
}

pub fn save_all(conn: &mut impl SqlConnection, worlds: &WorldRecords) -> Result<(), StorageError> {
    init_schema(conn)?;
    in_transaction(conn, |conn| {
        for table in TABLES {
            conn.execute(&format!("DELETE FROM {}", table), &[])?;
        }
        for (world, plots) in worlds {
            for (pos, record) in plots {
                insert_record(conn, world, *pos, record)?;
            }
        }
        Ok(())
    })
}

pub fn save_changes(conn: &mut impl SqlConnection, changes: &ChangeSet) -> Result<(), StorageError> {
    init_schema(conn)?;
    in_transaction(conn, |conn| {
        for (world, world_changes) in &changes.worlds {
            for pos in &world_changes.deletes {
                delete_record(conn, world, *pos)?;
            }
            for (pos, record) in &world_changes.upserts {
                delete_record(conn, world, *pos)?;
                insert_record(conn, world, *pos, record)?;
            }
        }
        Ok(())
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    fn row(x: i64, z: i64) -> Vec<SqlValue> {
        vec![
            SqlValue::Text("plotworld".to_owned()),
            SqlValue::Int(x),
            SqlValue::Int(z),
        ]
    }

    #[test]
    fn row_key_rejects_out_of_range_coordinates() {
        assert_eq!(row_key(&row(-3, 4)), Some(("plotworld".to_owned(), (-3, 4))));
        assert_eq!(row_key(&row(1 << 32, 0)), None);
        assert_eq!(row_key(&row(0, i64::from(i32::MIN) - 1)), None);
        assert_eq!(row_key(&[SqlValue::Text(" ".to_owned())]), None);
    }
}
