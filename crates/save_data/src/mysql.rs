use crate::database::{self, SqlConnection, SqlValue};
use crate::{ChangeSet, PlotStorage, StorageError, WorldRecords};
use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Params, Pool, PooledConn, Row, Value};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Connection settings for the `mysql` storage type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct MySqlSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for MySqlSettings {
    fn default() -> MySqlSettings {
        MySqlSettings {
            host: "localhost".to_owned(),
            port: 3306,
            database: "allayplots".to_owned(),
            username: "root".to_owned(),
            password: String::new(),
        }
    }
}

fn to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Int(i) => Value::Int(*i),
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
    }
}

fn from_mysql(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::Int(i),
        Value::UInt(u) => SqlValue::Int(u as i64),
        Value::Float(f) => SqlValue::Int(f as i64),
        Value::Double(f) => SqlValue::Int(f as i64),
        Value::Bytes(b) => SqlValue::Text(String::from_utf8_lossy(&b).into_owned()),
        other => SqlValue::Text(other.as_sql(true)),
    }
}

impl SqlConnection for PooledConn {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), StorageError> {
        let params = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.iter().map(to_mysql).collect())
        };
        self.exec_drop(sql, params)?;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, StorageError> {
        let rows: Vec<Row> = Queryable::query(self, sql)?;
        Ok(rows
            .into_iter()
            .map(|row| row.unwrap().into_iter().map(from_mysql).collect())
            .collect())
    }

    fn begin(&mut self) -> Result<(), StorageError> {
        self.query_drop("START TRANSACTION")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.query_drop("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.query_drop("ROLLBACK")?;
        Ok(())
    }
}

/// Plot storage backed by a MySQL server.
pub struct MySqlStorage {
    pool: Pool,
}

impl MySqlStorage {
    pub fn connect(settings: &MySqlSettings) -> Result<MySqlStorage, StorageError> {
        info!(
            "Connecting to mysql plot storage at {}:{}/{}",
            settings.host, settings.port, settings.database
        );
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(settings.host.clone()))
            .tcp_port(settings.port)
            .db_name(Some(settings.database.clone()))
            .user(Some(settings.username.clone()))
            .pass(Some(settings.password.clone()));
        let pool = Pool::new(opts)?;
        database::init_schema(&mut pool.get_conn()?)?;
        Ok(MySqlStorage { pool })
    }
}

impl PlotStorage for MySqlStorage {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn load(&mut self) -> Result<WorldRecords, StorageError> {
        database::load_all(&mut self.pool.get_conn()?)
    }

    fn save(&mut self, worlds: &WorldRecords) -> Result<(), StorageError> {
        database::save_all(&mut self.pool.get_conn()?, worlds)
    }

    fn supports_incremental(&self) -> bool {
        true
    }

    fn save_incremental(&mut self, changes: &ChangeSet) -> Result<(), StorageError> {
        database::save_changes(&mut self.pool.get_conn()?, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fill_missing_keys() {
        let settings: MySqlSettings = serde_yaml_ng::from_str("host: db.local\nport: 3307\n").unwrap();
        assert_eq!(settings.host, "db.local");
        assert_eq!(settings.port, 3307);
        assert_eq!(settings.database, "allayplots");
        assert_eq!(settings.username, "root");
    }

    #[test]
    fn values_convert_from_driver() {
        assert_eq!(from_mysql(Value::Bytes(b"east".to_vec())), SqlValue::Text("east".to_owned()));
        assert_eq!(from_mysql(Value::UInt(4)), SqlValue::Int(4));
        assert_eq!(from_mysql(Value::NULL), SqlValue::Null);
        assert_eq!(to_mysql(&SqlValue::Int(-3)), Value::Int(-3));
    }
}
