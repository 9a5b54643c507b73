//! Full-collection JSON backup.
//!
//! Every collection is dumped generically: column names become JSON keys so
//! the backup survives schema additions without this module changing.

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Map, Value};

use crate::{Database, Result};

/// Collections included in a backup, in dump order. The password column of
/// `users` is redacted.
const COLLECTIONS: &[&str] = &[
    "users",
    "organizations",
    "organization_settings",
    "transactions",
    "notifications",
    "audit_logs",
    "chat_threads",
    "chat_messages",
];

impl Database {
    pub fn export_collections(&self) -> Result<Value> {
        self.with_conn(|conn| {
            let mut out = Map::new();
            for name in COLLECTIONS {
                out.insert((*name).to_string(), dump_table(conn, name)?);
            }
            Ok(Value::Object(out))
        })
    }
}

fn dump_table(conn: &Connection, table: &str) -> Result<Value> {
    // Table names come from the fixed COLLECTIONS list, never from input.
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", table))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let rows = stmt.query_map([], |row| {
        let mut obj = Map::new();
        for (i, col) in columns.iter().enumerate() {
            if table == "users" && col == "password" {
                obj.insert(col.clone(), Value::Null);
                continue;
            }
            obj.insert(col.clone(), json_value(row.get_ref(i)?));
        }
        Ok(Value::Object(obj))
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(Value::Array(out))
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(hex::encode(b)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn backup_contains_every_collection_and_redacts_passwords() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(
            "USR-001",
            "Ana Reyes",
            "ana@farmaid.org",
            "argon2-hash",
            "Admin",
            &Utc::now().to_rfc3339(),
        )
        .unwrap();

        let backup = db.export_collections().unwrap();
        let obj = backup.as_object().unwrap();
        for name in COLLECTIONS {
            assert!(obj.contains_key(*name), "missing collection {}", name);
        }

        let users = obj["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["name"], "Ana Reyes");
        assert!(users[0]["password"].is_null());
    }
}
