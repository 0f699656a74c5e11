//! Save files on disk.
//!
//! Slots are bincode under the configured `save_path`; auto saves rotate
//! through a fixed ring whose position lives in `persistent.json` so the
//! rotation survives restarts.

pub mod types;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::config::SystemConfig;
use types::{PersistentData, SaveFile, SaveKind, TraversalSnapshot};

/// Size of the auto-save ring.
pub const AUTO_SLOTS: u32 = 6;

const PERSISTENT_FILE: &str = "persistent.json";

pub fn save_root() -> PathBuf {
    let sys = willow_shared::config::get::<SystemConfig>("system");
    PathBuf::from(sys.save_path)
}

fn slot_path(kind: SaveKind, slot: u32) -> PathBuf {
    save_root().join(kind.file_name(slot))
}

pub fn save(kind: SaveKind, slot: u32, snapshot: &TraversalSnapshot) -> Result<()> {
    let root = save_root();
    fs::create_dir_all(&root).with_context(|| format!("creating save dir {:?}", root))?;
    let path = root.join(kind.file_name(slot));
    let file = File::create(&path).with_context(|| format!("creating {:?}", path))?;
    let mut writer = BufWriter::new(file);

    let save = SaveFile {
        timestamp: epoch_secs(),
        snapshot: snapshot.clone(),
    };
    bincode::serde::encode_into_std_write(&save, &mut writer, bincode::config::standard())
        .with_context(|| format!("writing {:?}", path))?;
    log::info!("Saved {:?} slot {} to {:?}", kind, slot, path);
    Ok(())
}

pub fn load(kind: SaveKind, slot: u32) -> Result<SaveFile> {
    let path = slot_path(kind, slot);
    let file = File::open(&path).with_context(|| format!("no save at {:?}", path))?;
    let mut reader = BufReader::new(file);
    let save: SaveFile =
        bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
            .with_context(|| format!("reading {:?}", path))?;
    log::info!("Loaded {:?} slot {} from {:?}", kind, slot, path);
    Ok(save)
}

/// Writes the next auto slot and advances the rotation. Returns the slot
/// that was written.
pub fn write_auto(snapshot: &TraversalSnapshot) -> Result<u32> {
    let mut data = load_persistent()?;
    let slot = data.next_auto_slot % AUTO_SLOTS;
    save(SaveKind::Auto, slot, snapshot)?;
    // 轮转位置落盘，重启后继续接着写
    data.next_auto_slot = (slot + 1) % AUTO_SLOTS;
    store_persistent(&data)?;
    Ok(slot)
}

/// Reads `persistent.json`, creating it with defaults when missing and
/// resetting it when unreadable.
pub fn load_persistent() -> Result<PersistentData> {
    let root = save_root();
    fs::create_dir_all(&root).with_context(|| format!("creating save dir {:?}", root))?;
    let path = root.join(PERSISTENT_FILE);
    if !path.exists() {
        let data = PersistentData::default();
        store_persistent(&data)?;
        return Ok(data);
    }
    let text = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    match serde_json::from_str(&text) {
        Ok(data) => Ok(data),
        Err(e) => {
            log::warn!("persistent data at {:?} is corrupt ({}), resetting", path, e);
            let data = PersistentData::default();
            store_persistent(&data)?;
            Ok(data)
        }
    }
}

pub fn store_persistent(data: &PersistentData) -> Result<()> {
    let root = save_root();
    fs::create_dir_all(&root).with_context(|| format!("creating save dir {:?}", root))?;
    let path = root.join(PERSISTENT_FILE);
    let text = serde_json::to_string_pretty(data)?;
    fs::write(&path, text).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
