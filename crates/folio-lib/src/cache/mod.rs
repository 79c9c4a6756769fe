//! Offline asset cache with a network-first fetch policy.
//!
//! Responses are stored in SQLite under a generation name (the cache
//! version tag). `install` pre-populates the core assets, `activate` drops
//! every other generation, and `fetch` prefers the network but falls back
//! to the stored copy when the network is unreachable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::errors::{FolioError, Result};
use crate::http_client::HttpClient;

/// A response served either from the network or from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub from_cache: bool,
}

/// Summary of one stored entry, without its body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedAsset {
    pub generation: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub size: u64,
    pub stored_at: String,
}

pub struct AssetCache {
    db_path: PathBuf,
    db: Arc<Mutex<Connection>>,
    http: HttpClient,
    version: String,
}

impl AssetCache {
    /// Open (or create) the cache database at `db_path` for generation `version`.
    pub fn new(db_path: impl Into<PathBuf>, http: HttpClient, version: impl Into<String>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            db_path,
            db: Arc::new(Mutex::new(conn)),
            http,
            version: version.into(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// The generation this cache reads and writes.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS asset_cache (
                generation   TEXT    NOT NULL,
                url          TEXT    NOT NULL,
                status       INTEGER NOT NULL,
                content_type TEXT,
                body         BLOB    NOT NULL,
                stored_at    TEXT    NOT NULL,
                PRIMARY KEY (generation, url)
            );",
        )?;
        Ok(())
    }

    /// Fetch every url and store them all in the current generation.
    ///
    /// Nothing is written unless every url answers 200.
    pub async fn install(&self, urls: &[String]) -> Result<usize> {
        let mut fetched = Vec::with_capacity(urls.len());
        for url in urls {
            let resp = self.from_network(url).await?;
            if resp.status != 200 {
                return Err(FolioError::Request {
                    operation: "install".into(),
                    status: resp.status,
                    message: format!("{} did not answer 200", url),
                });
            }
            fetched.push(resp);
        }

        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        for resp in &fetched {
            Self::store(&tx, &self.version, resp)?;
        }
        tx.commit()?;

        tracing::info!(version = %self.version, count = fetched.len(), "Installed core assets");
        Ok(fetched.len())
    }

    /// Drop every generation other than the current one, returning their names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let stale: Vec<String> = {
            let mut stmt = db.prepare(
                "SELECT DISTINCT generation FROM asset_cache
                 WHERE generation != ?1 ORDER BY generation",
            )?;
            let rows = stmt.query_map(params![self.version], |row| row.get(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };
        db.execute(
            "DELETE FROM asset_cache WHERE generation != ?1",
            params![self.version],
        )?;
        for generation in &stale {
            tracing::info!(%generation, "Removed stale cache generation");
        }
        Ok(stale)
    }

    /// Network-first fetch.
    ///
    /// 200 answers replace the stored copy. Other statuses are returned
    /// untouched. When the request cannot be sent or read, the stored copy
    /// for `url` in the current generation is served instead.
    pub async fn fetch(&self, url: &str) -> Result<AssetResponse> {
        match self.from_network(url).await {
            Ok(resp) => {
                if resp.status == 200 {
                    let db = self.db.lock().await;
                    Self::store(&db, &self.version, &resp)?;
                }
                Ok(resp)
            }
            Err(FolioError::Http(e)) => {
                tracing::debug!(%url, error = %e, "Network failed, trying cache");
                self.cached(url)
                    .await?
                    .ok_or_else(|| FolioError::CacheMiss(url.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// The stored copy of `url` in the current generation, if any.
    pub async fn cached(&self, url: &str) -> Result<Option<AssetResponse>> {
        let db = self.db.lock().await;
        let row = db
            .query_row(
                "SELECT status, content_type, body FROM asset_cache
                 WHERE generation = ?1 AND url = ?2",
                params![self.version, url],
                |row| {
                    Ok(AssetResponse {
                        url: url.to_string(),
                        status: row.get(0)?,
                        content_type: row.get(1)?,
                        body: Bytes::from(row.get::<_, Vec<u8>>(2)?),
                        from_cache: true,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Generation names present in the database.
    pub async fn generations(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare("SELECT DISTINCT generation FROM asset_cache ORDER BY generation")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Every stored entry across all generations.
    pub async fn entries(&self) -> Result<Vec<CachedAsset>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT generation, url, status, content_type, length(body), stored_at
             FROM asset_cache ORDER BY generation, url",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CachedAsset {
                generation: row.get(0)?,
                url: row.get(1)?,
                status: row.get(2)?,
                content_type: row.get(3)?,
                size: row.get::<_, i64>(4)? as u64,
                stored_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Remove every entry in every generation.
    pub async fn clear(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let removed = db.execute("DELETE FROM asset_cache", [])?;
        Ok(removed)
    }

    async fn from_network(&self, url: &str) -> Result<AssetResponse> {
        let client = self.http.api().await;
        tracing::debug!(%url, "GET");
        let resp = client.get(url).send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;
        Ok(AssetResponse {
            url: url.to_string(),
            status,
            content_type,
            body,
            from_cache: false,
        })
    }

    fn store(conn: &Connection, generation: &str, resp: &AssetResponse) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO asset_cache
                (generation, url, status, content_type, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                generation,
                resp.url,
                resp.status,
                resp.content_type,
                resp.body.as_ref(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
