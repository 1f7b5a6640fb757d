//! C9 — Collaborator interfaces (spec §6).
//!
//! The optimizer core never touches a filesystem, a clock, or a
//! network socket directly; it calls through these traits instead.
//! Concrete implementations live alongside the traits rather than
//! behind a separate "infra" crate.

use crate::error::{OptimizerError, Result};
use crate::model::{Contest, Player};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Injectable time source so deadline expiry (spec §5) is
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock pinned to a fixed instant, advanced manually by tests.
pub struct FixedClock {
    at: std::sync::Mutex<SystemTime>,
}

impl FixedClock {
    pub fn new(at: SystemTime) -> Self {
        Self {
            at: std::sync::Mutex::new(at),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.at.lock().unwrap();
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        *self.at.lock().unwrap()
    }
}

/// Supplies the raw player pool for a contest. Implementations may hit
/// a CSV export, a vendor API, or a local fixture; the core only ever
/// sees the resulting `Vec<Player>` (spec §6).
pub trait PlayerDataProvider: Send + Sync {
    fn fetch_pool(&self, contest: &Contest) -> Result<Vec<Player>>;
}

/// Generic byte-oriented cache used for pool snapshots and run
/// results. TTL is advisory — callers decide whether a hit is stale.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
}

/// Reads a player pool from a CSV file, one row per player, columns:
/// `id,name,team,opponent,position,salary_dk,salary_fd,projected_points,
/// floor_points,ceiling_points,ownership_dk,ownership_fd,is_injured`.
pub struct CsvPlayerDataProvider {
    path: PathBuf,
}

impl CsvPlayerDataProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PlayerDataProvider for CsvPlayerDataProvider {
    fn fetch_pool(&self, _contest: &Contest) -> Result<Vec<Player>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut players = Vec::new();
        for record in reader.deserialize() {
            let player: Player = record?;
            players.push(player);
        }
        Ok(players)
    }
}

/// File-backed cache under the OS cache directory, one file per key
/// (spec §6), with an explicit TTL check via a sidecar `.meta` file.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".cache"))
            .join("dfs-lineup-optimizer");
        Self { root }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.bin"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.meta"))
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let meta_path = self.meta_path(key);
        let Some(meta) = try_read_to_string(&meta_path) else {
            return Ok(None);
        };
        let (written_at, ttl_secs): (u64, u64) = match meta.split_once(':') {
            Some((a, b)) => (a.parse().unwrap_or(0), b.parse().unwrap_or(0)),
            None => return Ok(None),
        };
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if now.saturating_sub(written_at) > ttl_secs {
            return Ok(None);
        }
        Ok(std::fs::read(self.data_path(key)).ok())
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let data_path = self.data_path(key);
        if let Some(parent) = data_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&data_path, value)?;
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        write_string(&self.meta_path(key), &format!("{now}:{}", ttl.as_secs()))?;
        Ok(())
    }
}

fn try_read_to_string(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

fn write_string(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// Sqlite-backed cache. Stores opaque blobs keyed by string, with a
/// TTL column checked at read time.
pub struct SqliteCache {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                written_at INTEGER NOT NULL,
                ttl_secs INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                written_at INTEGER NOT NULL,
                ttl_secs INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }
}

impl Cache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().map_err(|_| OptimizerError::Cache {
            message: "sqlite cache mutex poisoned".to_string(),
        })?;
        let row: Option<(Vec<u8>, i64, i64)> = conn
            .query_row(
                "SELECT value, written_at, ttl_secs FROM cache_entries WHERE key = ?1",
                rusqlite::params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();
        let Some((value, written_at, ttl_secs)) = row else {
            return Ok(None);
        };
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        if now - written_at > ttl_secs {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| OptimizerError::Cache {
            message: "sqlite cache mutex poisoned".to_string(),
        })?;
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        conn.execute(
            "INSERT INTO cache_entries (key, value, written_at, ttl_secs)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, written_at = excluded.written_at, ttl_secs = excluded.ttl_secs",
            rusqlite::params![key, value, now, ttl.as_secs() as i64],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_only_advances_when_told() {
        let t0 = SystemTime::UNIX_EPOCH;
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), t0 + Duration::from_secs(5));
    }

    #[test]
    fn file_cache_round_trips_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::at(dir.path());
        cache.set("k", b"hello", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn file_cache_misses_when_key_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::at(dir.path());
        assert_eq!(cache.get("missing").unwrap(), None);
    }

    #[test]
    fn sqlite_cache_round_trips_and_overwrites() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache.set("k", b"v1", Duration::from_secs(60)).unwrap();
        cache.set("k", b"v2", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn sqlite_cache_misses_when_key_absent() {
        let cache = SqliteCache::open_in_memory().unwrap();
        assert_eq!(cache.get("missing").unwrap(), None);
    }
}
