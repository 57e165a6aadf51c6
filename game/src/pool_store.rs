//! Key-value persistence for the permanent piece pool.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::shapes::PieceKind;

pub const POOL_KEY: &str = "roguetris_pool";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("pool store io: {0}")]
    Io(#[from] io::Error),
    #[error("pool store json: {0}")]
    Json(#[from] serde_json::Error),
}

/// External key-value store. Values are JSON documents.
pub trait PoolStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// In-process store for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PoolStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Self {
        if let Some(dir) = std::env::var_os("ROGUETRIS_DATA_DIR") {
            return Self::new(dir);
        }
        // `CARGO_MANIFEST_DIR` is `.../game`; the workspace `target/` lives at `..`.
        Self::new(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("target"),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl PoolStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&value)?;
        atomic_write(&self.path_for(key), json.as_bytes())?;
        Ok(())
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Rename over an existing file can fail on some platforms.
            fs::copy(&tmp, path)?;
            let _ = fs::remove_file(&tmp);
            Ok(())
        }
    }
}

/// A stored pool is usable when it is a list of known kind names with at least `min_size`
/// distinct entries.
pub fn parse_pool(value: &Value, min_size: usize) -> Option<Vec<PieceKind>> {
    let items = value.as_array()?;
    let mut pool = Vec::with_capacity(items.len());
    for item in items {
        let kind = PieceKind::from_name(item.as_str()?)?;
        if !pool.contains(&kind) {
            pool.push(kind);
        }
    }
    (pool.len() >= min_size).then_some(pool)
}

/// Stored pool, or the starter set when it is missing, unreadable or invalid.
pub fn load_pool<S: PoolStore + ?Sized>(store: &S, min_size: usize) -> Vec<PieceKind> {
    match store.get(POOL_KEY) {
        Ok(Some(value)) => parse_pool(&value, min_size).unwrap_or_else(|| {
            log::warn!("stored pool is invalid; using the starter pool");
            PieceKind::starter_pool()
        }),
        Ok(None) => PieceKind::starter_pool(),
        Err(e) => {
            log::warn!("could not read stored pool ({e}); using the starter pool");
            PieceKind::starter_pool()
        }
    }
}

pub fn save_pool<S: PoolStore + ?Sized>(store: &mut S, pool: &[PieceKind]) -> Result<(), StoreError> {
    let value = Value::Array(
        pool.iter()
            .map(|k| Value::String(k.name().to_string()))
            .collect(),
    );
    store.set(POOL_KEY, value)
}
