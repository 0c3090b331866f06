//! Local store: one key-value table per collection

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{Collection, Record};
use crate::util::{format_timestamp, parse_timestamp, timestamp_now};

/// Trait for per-collection record storage
pub trait RecordRepository {
    /// Insert or fully replace a record, stamping `updated_at` with the
    /// current time. Returns the stored copy.
    fn upsert(&self, collection: Collection, record: Record) -> Result<Record>;

    /// All records of a collection, most recently written first
    fn get_all(&self, collection: Collection) -> Result<Vec<Record>>;

    /// Get a record by id
    fn get_by_id(&self, collection: Collection, id: &str) -> Result<Option<Record>>;

    /// Delete a record; returns whether a row was removed
    fn delete(&self, collection: Collection, id: &str) -> Result<bool>;

    /// Remove every record of a collection
    fn clear(&self, collection: Collection) -> Result<()>;

    /// Records whose domain field `field` equals `value`
    fn find_by_field(&self, collection: Collection, field: &str, value: &Value)
        -> Result<Vec<Record>>;

    /// Number of records in a collection
    fn count(&self, collection: Collection) -> Result<usize>;
}

/// `SQLite` implementation of `RecordRepository`
pub struct SqliteRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }

    fn into_record((id, data, updated_at): (String, String, String)) -> Result<Record> {
        let fields: Map<String, Value> = serde_json::from_str(&data)?;
        Ok(Record {
            id,
            updated_at: parse_timestamp(&updated_at)?,
            fields,
        })
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::into_record).collect()
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn upsert(&self, collection: Collection, mut record: Record) -> Result<Record> {
        if record.id.trim().is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".into()));
        }

        record.updated_at = timestamp_now();
        let data = serde_json::to_string(&record.fields)?;

        self.conn.execute(
            &format!(
                "INSERT INTO {} (id, data, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                collection.local_table()
            ),
            params![record.id, data, format_timestamp(record.updated_at)],
        )?;

        Ok(record)
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Record>> {
        self.query_records(
            &format!(
                "SELECT id, data, updated_at FROM {} ORDER BY updated_at DESC, id ASC",
                collection.local_table()
            ),
            [],
        )
    }

    fn get_by_id(&self, collection: Collection, id: &str) -> Result<Option<Record>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, data, updated_at FROM {} WHERE id = ?1",
                    collection.local_table()
                ),
                params![id],
                Self::parse_record,
            )
            .optional()?;

        row.map(Self::into_record).transpose()
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.local_table()),
            params![id],
        )?;
        Ok(rows > 0)
    }

    fn clear(&self, collection: Collection) -> Result<()> {
        self.conn
            .execute(&format!("DELETE FROM {}", collection.local_table()), [])?;
        Ok(())
    }

    fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>> {
        let path = json_path(field)?;
        let value = sql_value(value)?;

        self.query_records(
            &format!(
                "SELECT id, data, updated_at FROM {}
                 WHERE json_extract(data, ?1) = ?2
                 ORDER BY updated_at DESC, id ASC",
                collection.local_table()
            ),
            params![path, value],
        )
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.local_table()),
            [],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|error| Error::Database(error.to_string()))
    }
}

fn json_path(field: &str) -> Result<String> {
    let field = field.trim();
    if field.is_empty() || field.contains('"') {
        return Err(Error::InvalidInput(format!("invalid field name: {field:?}")));
    }
    Ok(format!("$.\"{field}\""))
}

/// Convert a JSON scalar into the value `json_extract` yields for it
fn sql_value(value: &Value) -> Result<SqlValue> {
    match value {
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real))
            .ok_or_else(|| Error::InvalidInput(format!("unsupported number: {number}"))),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(Error::InvalidInput(
            "only string, number and boolean values can be matched".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use chrono::Utc;
    use serde_json::json;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        let stored = repo
            .upsert(
                Collection::Estoque,
                Record::new("EST-001").with_field("estoqueAtual", 178),
            )
            .unwrap();

        let fetched = repo
            .get_by_id(Collection::Estoque, "EST-001")
            .unwrap()
            .unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.field("estoqueAtual"), Some(&json!(178)));
    }

    #[test]
    fn test_upsert_stamps_current_time() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        let mut record = Record::new("col-01");
        record.updated_at = Utc::now() - chrono::Duration::days(365);
        let before = timestamp_now();

        let stored = repo.upsert(Collection::Funcionarios, record).unwrap();
        assert!(stored.updated_at >= before);
    }

    #[test]
    fn test_upsert_replaces_without_merging() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        repo.upsert(
            Collection::Fornecedores,
            Record::new("forn-01")
                .with_field("nome", "ProtegeMax")
                .with_field("telefone", "(11) 3888-9001"),
        )
        .unwrap();
        repo.upsert(
            Collection::Fornecedores,
            Record::new("forn-01").with_field("nome", "ProtegeMax Ltda"),
        )
        .unwrap();

        let fetched = repo
            .get_by_id(Collection::Fornecedores, "forn-01")
            .unwrap()
            .unwrap();
        assert_eq!(fetched.field("nome"), Some(&json!("ProtegeMax Ltda")));
        assert!(fetched.field("telefone").is_none());
        assert_eq!(repo.count(Collection::Fornecedores).unwrap(), 1);
    }

    #[test]
    fn test_upsert_rejects_blank_id() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        assert!(repo.upsert(Collection::Prazos, Record::new("  ")).is_err());
    }

    #[test]
    fn test_collections_are_isolated() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        repo.upsert(Collection::Prazos, Record::new("X-1")).unwrap();

        assert!(repo.get_by_id(Collection::Lancamentos, "X-1").unwrap().is_none());
        assert_eq!(repo.get_all(Collection::Prazos).unwrap().len(), 1);
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        repo.upsert(Collection::Lancamentos, Record::new("LAN-001"))
            .unwrap();

        assert!(repo.delete(Collection::Lancamentos, "LAN-001").unwrap());
        assert!(!repo.delete(Collection::Lancamentos, "LAN-001").unwrap());
        assert!(repo
            .get_by_id(Collection::Lancamentos, "LAN-001")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_clear() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        repo.upsert(Collection::Estoque, Record::new("EST-001")).unwrap();
        repo.upsert(Collection::Estoque, Record::new("EST-002")).unwrap();
        repo.upsert(Collection::Prazos, Record::new("PRZ-001")).unwrap();

        repo.clear(Collection::Estoque).unwrap();

        assert_eq!(repo.count(Collection::Estoque).unwrap(), 0);
        assert_eq!(repo.count(Collection::Prazos).unwrap(), 1);
    }

    #[test]
    fn test_find_by_field() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        repo.upsert(
            Collection::Prazos,
            Record::new("PRZ-001").with_field("status", "No prazo"),
        )
        .unwrap();
        repo.upsert(
            Collection::Prazos,
            Record::new("PRZ-002").with_field("status", "Vencido"),
        )
        .unwrap();
        repo.upsert(
            Collection::Prazos,
            Record::new("PRZ-003").with_field("status", "No prazo"),
        )
        .unwrap();

        let found = repo
            .find_by_field(Collection::Prazos, "status", &json!("No prazo"))
            .unwrap();
        let mut ids = found.into_iter().map(|record| record.id).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec!["PRZ-001", "PRZ-003"]);
    }

    #[test]
    fn test_find_by_numeric_field() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        repo.upsert(
            Collection::Estoque,
            Record::new("EST-001").with_field("estoqueAtual", 178),
        )
        .unwrap();

        let found = repo
            .find_by_field(Collection::Estoque, "estoqueAtual", &json!(178))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_find_by_field_rejects_structured_values() {
        let db = setup();
        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);

        assert!(repo
            .find_by_field(Collection::Estoque, "nome", &json!(null))
            .is_err());
        assert!(repo
            .find_by_field(Collection::Estoque, "", &json!("x"))
            .is_err());
    }
}
