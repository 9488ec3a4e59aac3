//! # Snapshot Store
//!
//! **Best-Effort Durable Save Record**
//!
//! One keyed record holds the whole economy. The store keeps an in-memory
//! cache of it and writes the full record through a [`StoragePort`] after
//! every mutation.
//!
//! ## Guarantees
//!
//! 1. **Never crashes readers**: an absent or malformed record loads as
//!    defaults; an old or partial record is deep-merged against the current
//!    defaults, unreadable map entries and event fields are dropped one by
//!    one, and top-level fields that still fail to parse fall back individually
//! 2. **Cache is authoritative**: a failed write is logged and ignored, the
//!    session continues from memory
//! 3. **One read per process**: the record is read on first access only
//!
//! ## File Format ([`FileStorage`])
//!
//! ```text
//! CSAV1 <crc32 of payload, 8 hex digits>\n
//! <JSON payload>
//! ```
//!
//! A bare JSON payload without the header is accepted as a legacy record.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{EconomyError, EconomyResult};
use crate::snapshot::{Snapshot, CURRENT_SCHEMA_VERSION};

/// Magic prefix of a [`FileStorage`] record.
const RECORD_MAGIC: &str = "CSAV1";

/// Store shared by every manager of one economy.
pub type SharedStore = Arc<Mutex<SnapshotStore>>;

/// Durable medium for the save record.
pub trait StoragePort: Send + Sync {
    /// Reads the record, `None` if none was ever written.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium fails or the record is corrupted.
    fn read(&self) -> EconomyResult<Option<String>>;

    /// Replaces the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium fails.
    fn write(&self, record: &str) -> EconomyResult<()>;

    /// Deletes the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium fails.
    fn clear(&self) -> EconomyResult<()>;
}

// ============================================================================
// Ports
// ============================================================================

/// Save record in a single file, replaced atomically on each write.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }
}

impl StoragePort for FileStorage {
    fn read(&self) -> EconomyResult<Option<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let Some(rest) = raw.strip_prefix(RECORD_MAGIC) else {
            // Legacy record: bare JSON, no checksum.
            return Ok(Some(raw));
        };

        let (header, payload) = rest
            .split_once('\n')
            .ok_or_else(|| EconomyError::CorruptedRecord("missing header line".to_string()))?;
        let expected = u32::from_str_radix(header.trim(), 16)
            .map_err(|_| EconomyError::CorruptedRecord(format!("bad checksum field {header:?}")))?;
        let actual = crc32fast::hash(payload.as_bytes());
        if actual != expected {
            return Err(EconomyError::CorruptedRecord(format!(
                "checksum mismatch: expected {expected:08x}, got {actual:08x}"
            )));
        }

        Ok(Some(payload.to_string()))
    }

    fn write(&self, record: &str) -> EconomyResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        {
            let mut file = File::create(&temp)?;
            writeln!(file, "{RECORD_MAGIC} {:08x}", crc32fast::hash(record.as_bytes()))?;
            file.write_all(record.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> EconomyResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory record. Clones share the same buffer, so a clone handed to a
/// fresh [`SnapshotStore`] behaves like the same save after a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    record: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with a raw record.
    #[must_use]
    pub fn with_record(record: impl Into<String>) -> Self {
        let storage = Self::default();
        *storage.record.lock() = Some(record.into());
        storage
    }

    /// Current raw record.
    #[must_use]
    pub fn record(&self) -> Option<String> {
        self.record.lock().clone()
    }

    /// Makes subsequent writes fail, as a full disk would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl StoragePort for MemoryStorage {
    fn read(&self) -> EconomyResult<Option<String>> {
        Ok(self.record.lock().clone())
    }

    fn write(&self, record: &str) -> EconomyResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(std::io::Error::new(ErrorKind::Other, "storage full").into());
        }
        *self.record.lock() = Some(record.to_string());
        Ok(())
    }

    fn clear(&self) -> EconomyResult<()> {
        *self.record.lock() = None;
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

/// Cached, write-through access to the save record.
pub struct SnapshotStore {
    port: Box<dyn StoragePort>,
    cache: Option<Snapshot>,
}

impl SnapshotStore {
    /// Creates a store over `port`. Nothing is read until first access.
    #[must_use]
    pub fn new(port: impl StoragePort + 'static) -> Self {
        Self {
            port: Box::new(port),
            cache: None,
        }
    }

    /// Creates a store ready to share between managers.
    #[must_use]
    pub fn shared(port: impl StoragePort + 'static) -> SharedStore {
        Arc::new(Mutex::new(Self::new(port)))
    }

    /// Returns the snapshot, reading the durable record on first call.
    pub fn load(&mut self) -> &Snapshot {
        self.cache.get_or_insert_with(|| read_record(self.port.as_ref()))
    }

    /// Returns an owned copy of the snapshot.
    pub fn snapshot(&mut self) -> Snapshot {
        self.load().clone()
    }

    /// Replaces the snapshot and writes it through.
    pub fn save(&mut self, snapshot: Snapshot) {
        self.cache = Some(snapshot);
        self.persist();
    }

    /// Mutates the snapshot and writes it through.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        self.load();
        let result = f(self.cache_mut());
        self.persist();
        result
    }

    /// Runs a validated mutation. The record is written only on `Ok`; `f`
    /// must check before it mutates so an `Err` leaves the snapshot as it was.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn try_update<T>(
        &mut self,
        f: impl FnOnce(&mut Snapshot) -> EconomyResult<T>,
    ) -> EconomyResult<T> {
        self.load();
        let value = f(self.cache_mut())?;
        self.persist();
        Ok(value)
    }

    /// Clears the durable record and restores defaults.
    pub fn reset(&mut self) {
        if let Err(err) = self.port.clear() {
            tracing::warn!("Failed to clear save record: {}", err);
        }
        self.cache = Some(Snapshot::default());
    }

    fn cache_mut(&mut self) -> &mut Snapshot {
        self.cache.get_or_insert_with(Snapshot::default)
    }

    fn persist(&self) {
        let Some(snapshot) = self.cache.as_ref() else {
            return;
        };
        let result = serde_json::to_string(snapshot)
            .map_err(EconomyError::from)
            .and_then(|record| self.port.write(&record));
        if let Err(err) = result {
            tracing::warn!("Failed to save snapshot, keeping in-memory state: {}", err);
        }
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("loaded", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

fn read_record(port: &dyn StoragePort) -> Snapshot {
    match port.read() {
        Ok(None) => {
            tracing::debug!("No save record, starting from defaults");
            Snapshot::default()
        }
        Ok(Some(raw)) => decode(&raw).unwrap_or_else(|err| {
            tracing::warn!("Unreadable save record, starting from defaults: {}", err);
            Snapshot::default()
        }),
        Err(err) => {
            tracing::warn!("Failed to read save record, starting from defaults: {}", err);
            Snapshot::default()
        }
    }
}

/// Decodes a raw record, merging it against current defaults.
///
/// # Errors
///
/// Returns an error if the record is not a JSON object.
pub fn decode(raw: &str) -> EconomyResult<Snapshot> {
    let stored: Value = serde_json::from_str(raw)?;
    if !stored.is_object() {
        return Err(EconomyError::CorruptedRecord(
            "record is not a JSON object".to_string(),
        ));
    }

    let defaults = serde_json::to_value(Snapshot::default())?;
    let mut merged = defaults.clone();
    merge_defaults(&mut merged, stored);
    prune_unreadable(&mut merged);

    let mut snapshot = match serde_json::from_value::<Snapshot>(merged.clone()) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::warn!("Save record has unreadable fields, salvaging: {}", err);
            salvage(&defaults, &merged)?
        }
    };

    snapshot.inventory.retain(|_, count| *count > 0);

    if snapshot.schema_version < CURRENT_SCHEMA_VERSION {
        tracing::info!(
            "Migrating save record from schema {} to {}",
            snapshot.schema_version,
            CURRENT_SCHEMA_VERSION
        );
        snapshot.schema_version = CURRENT_SCHEMA_VERSION;
    }

    Ok(snapshot)
}

/// Deep-merges `stored` over `target`. Objects merge key by key; `null`
/// counts as missing; any other stored value replaces the default.
fn merge_defaults(target: &mut Value, stored: Value) {
    match (target, stored) {
        (_, Value::Null) => {}
        (Value::Object(target), Value::Object(stored)) => {
            for (key, value) in stored {
                match target.get_mut(&key) {
                    Some(slot) => merge_defaults(slot, value),
                    None if value.is_null() => {}
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Drops unreadable entries from the collections and event fields of a
/// merged record, so one bad value costs only itself. Dropped event fields
/// fall back to their serde defaults.
fn prune_unreadable(merged: &mut Value) {
    let Some(root) = merged.as_object_mut() else {
        return;
    };

    retain_readable::<u32>(root.get_mut("inventory"), "inventory");
    if let Some(Value::Object(mini_games)) = root.get_mut("miniGames") {
        retain_readable::<NaiveDate>(
            mini_games.get_mut("lastPlayedDate"),
            "miniGames.lastPlayedDate",
        );
        retain_readable::<u64>(mini_games.get_mut("totalPlays"), "miniGames.totalPlays");
    }
    if let Some(Value::Object(event)) = root.get_mut("currentEvent") {
        retain_readable::<usize>(
            event.get_mut("claimedCheckpoints"),
            "currentEvent.claimedCheckpoints",
        );
        drop_unreadable::<Vec<usize>>(event, "claimedCheckpoints");
        drop_unreadable::<u64>(event, "points");
        drop_unreadable::<Option<NaiveDate>>(event, "startDate");
        drop_unreadable::<bool>(event, "completionBonusClaimed");
    }
}

/// Keeps the entries of an object or array that read as `T`.
fn retain_readable<T: DeserializeOwned>(collection: Option<&mut Value>, name: &str) {
    let readable = |value: &Value| serde_json::from_value::<T>(value.clone()).is_ok();
    let dropped = match collection {
        Some(Value::Object(entries)) => {
            let before = entries.len();
            entries.retain(|_, value| readable(value));
            before - entries.len()
        }
        Some(Value::Array(entries)) => {
            let before = entries.len();
            entries.retain(|value| readable(value));
            before - entries.len()
        }
        _ => 0,
    };
    if dropped > 0 {
        tracing::warn!("Discarding {} unreadable entries of save field {}", dropped, name);
    }
}

/// Removes `key` from `object` if its value does not read as `T`.
fn drop_unreadable<T: DeserializeOwned>(object: &mut Map<String, Value>, key: &str) {
    let unreadable = object
        .get(key)
        .is_some_and(|value| serde_json::from_value::<T>(value.clone()).is_err());
    if unreadable {
        tracing::warn!("Discarding unreadable save field currentEvent.{}", key);
        object.remove(key);
    }
}

/// Keeps each top-level field of `merged` that parses on its own and resets
/// the rest to defaults.
fn salvage(defaults: &Value, merged: &Value) -> EconomyResult<Snapshot> {
    let (Some(defaults), Some(merged)) = (defaults.as_object(), merged.as_object()) else {
        return Err(EconomyError::CorruptedRecord(
            "record is not a JSON object".to_string(),
        ));
    };

    let mut kept: Map<String, Value> = defaults.clone();
    for (key, value) in merged {
        let mut probe = defaults.clone();
        probe.insert(key.clone(), value.clone());
        if serde_json::from_value::<Snapshot>(Value::Object(probe)).is_ok() {
            kept.insert(key.clone(), value.clone());
        } else {
            tracing::warn!("Discarding unreadable save field {}", key);
        }
    }

    Ok(serde_json::from_value(Value::Object(kept))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_save_path() -> PathBuf {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("test_cascade_save_{id}.json"))
    }

    #[test]
    fn test_absent_record_loads_defaults() {
        let mut store = SnapshotStore::new(MemoryStorage::new());
        assert_eq!(*store.load(), Snapshot::default());
    }

    #[test]
    fn test_malformed_record_loads_defaults() {
        let mut store = SnapshotStore::new(MemoryStorage::with_record("{not json"));
        assert_eq!(*store.load(), Snapshot::default());

        let mut store = SnapshotStore::new(MemoryStorage::with_record("[1, 2, 3]"));
        assert_eq!(*store.load(), Snapshot::default());
    }

    #[test]
    fn test_partial_record_merges_sub_objects() {
        let raw = r#"{
            "schemaVersion": 1,
            "coins": 250,
            "inventory": { "hammer": 2 },
            "miniGames": { "totalPlays": { "bubble_pop": 3 } },
            "dailyReplay": null
        }"#;
        let mut store = SnapshotStore::new(MemoryStorage::with_record(raw));
        let snapshot = store.snapshot();

        assert_eq!(snapshot.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(snapshot.coins, 250);
        assert_eq!(snapshot.diamonds, 0);
        assert_eq!(snapshot.item_count("hammer"), 2);
        assert_eq!(snapshot.mini_game_stats("bubble_pop").total_plays, 3);
        assert!(snapshot.mini_games.last_played_date.is_empty());
        assert_eq!(snapshot.daily_replay, Default::default());
    }

    #[test]
    fn test_bad_field_is_salvaged() {
        let raw = r#"{ "coins": -40, "diamonds": 9, "inventory": { "shuffle": 1 } }"#;
        let snapshot = decode(raw).unwrap();
        assert_eq!(snapshot.coins, 0);
        assert_eq!(snapshot.diamonds, 9);
        assert_eq!(snapshot.item_count("shuffle"), 1);
    }

    #[test]
    fn test_event_without_start_date_keeps_progress() {
        let raw = r#"{
            "schemaVersion": 1,
            "coins": 10,
            "currentEvent": { "eventId": "gem_rush", "points": 4200, "claimedCheckpoints": [0, 1] }
        }"#;
        let snapshot = decode(raw).unwrap();
        let event = snapshot.current_event.unwrap();

        assert_eq!(snapshot.coins, 10);
        assert_eq!(event.event_id, "gem_rush");
        assert_eq!(event.points, 4200);
        assert_eq!(event.claimed_checkpoints.len(), 2);
        assert_eq!(event.start_date, None);
        assert!(!event.completion_bonus_claimed);
    }

    #[test]
    fn test_bad_event_fields_dropped_individually() {
        let raw = r#"{
            "currentEvent": {
                "eventId": "gem_rush",
                "points": -5,
                "claimedCheckpoints": [0, "one", 2, null],
                "startDate": "someday",
                "completionBonusClaimed": null
            }
        }"#;
        let event = decode(raw).unwrap().current_event.unwrap();

        assert_eq!(event.points, 0);
        assert_eq!(event.claimed_checkpoints.into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(event.start_date, None);
        assert!(!event.completion_bonus_claimed);
    }

    #[test]
    fn test_bad_map_entries_dropped_individually() {
        let raw = r#"{
            "inventory": { "hammer": 5, "rainbow": 3, "shuffle": null, "bomb": -2, "dud": 0 },
            "miniGames": {
                "lastPlayedDate": { "bubble_pop": "2026-10-16", "gem_slide": "yesterday" },
                "totalPlays": { "bubble_pop": 4, "gem_slide": "many" }
            }
        }"#;
        let snapshot = decode(raw).unwrap();

        assert_eq!(snapshot.item_count("hammer"), 5);
        assert_eq!(snapshot.item_count("rainbow"), 3);
        assert_eq!(snapshot.inventory.len(), 2);

        let bubble_pop = snapshot.mini_game_stats("bubble_pop");
        assert_eq!(bubble_pop.total_plays, 4);
        assert_eq!(bubble_pop.last_played_date, chrono::NaiveDate::from_ymd_opt(2026, 10, 16));
        assert_eq!(snapshot.mini_game_stats("gem_slide"), Default::default());
    }

    #[test]
    fn test_update_writes_through() {
        let storage = MemoryStorage::new();
        let mut store = SnapshotStore::new(storage.clone());
        store.update(|s| s.coins = 77);

        let mut restarted = SnapshotStore::new(storage);
        assert_eq!(restarted.load().coins, 77);
    }

    #[test]
    fn test_failed_try_update_does_not_write() {
        let storage = MemoryStorage::new();
        let mut store = SnapshotStore::new(storage.clone());
        let result: EconomyResult<()> =
            store.try_update(|_| Err(EconomyError::ItemDepleted("hammer".to_string())));
        assert!(result.is_err());
        assert!(storage.record().is_none());
    }

    #[test]
    fn test_write_failure_keeps_cache() {
        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        let mut store = SnapshotStore::new(storage.clone());

        store.update(|s| s.diamonds = 12);

        assert_eq!(store.load().diamonds, 12);
        assert!(storage.record().is_none());
    }

    #[test]
    fn test_reset_clears_record() {
        let storage = MemoryStorage::new();
        let mut store = SnapshotStore::new(storage.clone());
        store.update(|s| s.coins = 5);
        store.reset();

        assert_eq!(store.load().coins, 0);
        assert!(storage.record().is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let path = temp_save_path();
        let mut snapshot = Snapshot::default();
        snapshot.coins = 1234;
        snapshot.diamonds = 56;
        snapshot.add_item("rainbow", 3);

        SnapshotStore::new(FileStorage::new(&path)).save(snapshot.clone());
        let loaded = SnapshotStore::new(FileStorage::new(&path)).snapshot();
        assert_eq!(loaded, snapshot);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_checksum_mismatch_loads_defaults() {
        let path = temp_save_path();
        let storage = FileStorage::new(&path);
        storage.write(r#"{"coins": 10}"#).unwrap();

        let tampered = std::fs::read_to_string(&path).unwrap().replace("10", "99");
        std::fs::write(&path, tampered).unwrap();

        assert!(matches!(storage.read(), Err(EconomyError::CorruptedRecord(_))));
        assert_eq!(SnapshotStore::new(storage).load().coins, 0);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_legacy_bare_json() {
        let path = temp_save_path();
        std::fs::write(&path, r#"{"coins": 42}"#).unwrap();

        assert_eq!(SnapshotStore::new(FileStorage::new(&path)).load().coins, 42);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_clear_missing_is_ok() {
        let storage = FileStorage::new(temp_save_path());
        storage.clear().unwrap();
        assert!(storage.read().unwrap().is_none());
    }
}
