//! Cache generation operations.
//!
//! A generation is one named snapshot of entries, superseded wholesale when
//! the version tag changes. Deleting a generation cascades to its entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Summary of a stored generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Generation {
    pub name: String,
    pub created_at: String,
    pub entry_count: u64,
}

impl CacheDb {
    /// Whether a generation with this name exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every stored generation with its entry count, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Generation>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, COUNT(e.key_hash)
                    FROM generations g
                    LEFT JOIN entries e ON e.generation = g.name
                    GROUP BY g.name, g.created_at
                    ORDER BY g.created_at, g.name",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(Generation { name: row.get(0)?, created_at: row.get(1)?, entry_count: row.get::<_, i64>(2)? as u64 })
                })?;
                let mut generations = Vec::new();
                for row in rows {
                    generations.push(row?);
                }
                Ok(generations)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation except `keep`, returning the deleted names.
    ///
    /// Running it again with the same name deletes nothing.
    pub async fn delete_generations_except(&self, keep: &str) -> Result<Vec<String>, Error> {
        let keep = keep.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let stale = {
                    let mut stmt = tx.prepare("SELECT name FROM generations WHERE name != ?1 ORDER BY name")?;
                    let rows = stmt.query_map(params![keep], |row| row.get::<_, String>(0))?;
                    let mut names = Vec::new();
                    for row in rows {
                        names.push(row?);
                    }
                    names
                };
                tx.execute("DELETE FROM generations WHERE name != ?1", params![keep])?;
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }
}
