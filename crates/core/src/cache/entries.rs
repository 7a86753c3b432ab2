//! Cache entry operations.
//!
//! An entry is a response snapshot stored under the request that produced it.
//! Only successful (2xx) responses are ever written.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Identity of a cache entry: method plus full URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedRequest {
    pub method: String,
    pub url: String,
}

impl CachedRequest {
    /// A GET request for the URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".into(), url: url.into() }
    }

    /// Storage key for this request.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Set when the snapshot was read back from storage.
    pub stored_at: Option<String>,
}

impl CachedResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn ensure_cacheable(response: &CachedResponse) -> Result<(), Error> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("refusing to cache {} with status {}", response.url, response.status)))
    }
}

fn upsert(
    conn: &rusqlite::Connection, generation: &str, request: &CachedRequest, response: &CachedResponse, now: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            request.key(),
            request.method.to_ascii_uppercase(),
            &request.url,
            response.status,
            headers_json,
            &response.body,
            now,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Look up the response stored for a request in a generation.
    ///
    /// Returns None if the generation or the entry doesn't exist.
    pub async fn match_entry(&self, generation: &str, request: &CachedRequest) -> Result<Option<CachedResponse>, Error> {
        let generation = generation.to_string();
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body, stored_at
                    FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let row = stmt.query_row(params![generation, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                match row {
                    Ok((url, status, headers_json, body, stored_at)) => Ok(Some(CachedResponse {
                        url,
                        status,
                        headers: serde_json::from_str(&headers_json)?,
                        body,
                        stored_at: Some(stored_at),
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under a request, creating the generation if needed.
    ///
    /// A later write for the same request replaces the earlier one.
    pub async fn put_entry(
        &self, generation: &str, request: &CachedRequest, response: &CachedResponse,
    ) -> Result<(), Error> {
        ensure_cacheable(response)?;

        let generation = generation.to_string();
        let request = request.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                upsert(&tx, &generation, &request, &response, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store every entry in one transaction, creating the generation if needed.
    ///
    /// All-or-nothing: if any entry is rejected or any write fails, nothing is
    /// stored, including the generation itself. Returns the number of entries written.
    pub async fn put_all(&self, generation: &str, entries: Vec<(CachedRequest, CachedResponse)>) -> Result<usize, Error> {
        for (_, response) in &entries {
            ensure_cacheable(response)?;
        }

        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                for (request, response) in &entries {
                    upsert(&tx, &generation, request, response, &now)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// List the requests stored in a generation, ordered by URL.
    pub async fn entry_requests(&self, generation: &str) -> Result<Vec<CachedRequest>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CachedRequest>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE generation = ?1 ORDER BY url, method")?;
                let rows = stmt.query_map(params![generation], |row| {
                    Ok(CachedRequest { method: row.get(0)?, url: row.get(1)? })
                })?;
                let mut requests = Vec::new();
                for row in rows {
                    requests.push(row?);
                }
                Ok(requests)
            })
            .await
            .map_err(Error::from)
    }

    /// Count the entries in a generation.
    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
