//! Global TOML configuration cell.
//!
//! The launcher calls [`init`] once at startup; after that any crate can
//! pull a typed section out with [`get`]. Sections that are missing or fail
//! to deserialize fall back to their `Default`, so a half-written
//! config.toml degrades instead of aborting.

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use toml::Table;

static GLOBAL_CONFIG: OnceCell<RwLock<Table>> = OnceCell::new();

/// Loads the config file into the global cell. A missing file is only a
/// warning; defaults carry the engine.
pub fn init<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();

    let content = if path.exists() {
        log::info!("Loading config from {:?}", path);
        fs::read_to_string(path)?
    } else {
        log::warn!("Config file not found at {:?}, using defaults.", path);
        String::new()
    };

    init_from_str(&content)
}

/// Same as [`init`] but from in-memory TOML text. Tests and benches use
/// this to avoid touching the filesystem.
pub fn init_from_str(content: &str) -> anyhow::Result<()> {
    let table: Table = toml::from_str(content).unwrap_or_else(|e| {
        log::error!("Config syntax error: {}, using empty config.", e);
        Table::new()
    });

    GLOBAL_CONFIG
        .set(RwLock::new(table))
        .map_err(|_| anyhow::anyhow!("Config already initialized"))?;

    Ok(())
}

/// Reads section `[key]` as `T`, falling back to `T::default()` when the
/// section is absent or malformed.
pub fn get<T: DeserializeOwned + Default>(key: &str) -> T {
    let store = GLOBAL_CONFIG.get().expect("willow-shared config not initialized!");
    let read_guard = store.read().unwrap();

    if let Some(value) = read_guard.get(key) {
        value.clone().try_into().unwrap_or_else(|e| {
            log::warn!("Config section '[{}]' mismatch: {}. Using default.", key, e);
            T::default()
        })
    } else {
        T::default()
    }
}
