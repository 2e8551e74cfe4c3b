//! The embedded document database.
//!
//! `VocabDb` holds the two collections as JSON documents keyed by id,
//! guarded by one `RwLock`. Writes go through [`VocabDb::commit`], which
//! mutates under the write lock, persists the file image atomically off the
//! async runtime, then publishes one change event per touched collection.
//! Readers take the read lock and can never observe a half-applied
//! transaction.

use crate::paths;
use crate::schema::{self, SchemaVersion, CURRENT_VERSION};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use memvocab_core::CoreError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task;

/// The two collections the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Decks,
    Cards,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Decks => "decks",
            Collection::Cards => "cards",
        }
    }

    fn schema(&self) -> &'static schema::CollectionSchema {
        schema::current()
            .collection(self.name())
            .expect("every collection is declared in the current schema")
    }
}

/// Published after a committed write; live queries re-run on matching events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
}

/// Storage-internal failures. These never leave the crate un-normalized;
/// repositories log them and map to [`CoreError::Storage`].
#[derive(Debug, Error)]
pub(crate) enum DbError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("duplicate id '{0}' in {1}")]
    DuplicateId(String, &'static str),
    #[error("document in {0} has no string id")]
    MissingId(&'static str),
    #[error("field '{field}' is not indexed on {collection}")]
    NotIndexed {
        collection: &'static str,
        field: String,
    },
    #[error("background write task failed")]
    Join,
}

/// Logs the underlying failure and degrades it to the domain-level message.
pub(crate) fn normalize(action: &'static str) -> impl FnOnce(DbError) -> CoreError {
    move |e| {
        tracing::error!(error = %e, action, "local storage failure");
        CoreError::Storage(action)
    }
}

/// On-disk layout. Documents are kept as raw JSON objects so legacy fields
/// survive loading and can be rewritten by migrations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileImage {
    pub version: SchemaVersion,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub decks: Vec<Value>,
    pub cards: Vec<Value>,
}

impl FileImage {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            version: CURRENT_VERSION,
            created_at: now,
            updated_at: now,
            decks: Vec::new(),
            cards: Vec::new(),
        }
    }
}

#[cfg(test)]
impl FileImage {
    pub(crate) fn empty_at_version(version: SchemaVersion) -> Self {
        let mut image = Self::new_empty();
        image.version = version;
        image
    }

    pub(crate) fn with_decks(mut self, decks: Vec<Value>) -> Self {
        self.decks = decks;
        self
    }

    pub(crate) fn with_cards(mut self, cards: Vec<Value>) -> Self {
        self.cards = cards;
        self
    }
}

pub(crate) struct DbState {
    version: SchemaVersion,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    decks: IndexMap<String, Value>,
    cards: IndexMap<String, Value>,
}

impl DbState {
    fn from_image(image: FileImage) -> Result<Self, CoreError> {
        let decks = index_by_id(image.decks, Collection::Decks)?;
        let cards = index_by_id(image.cards, Collection::Cards)?;
        Ok(Self {
            version: image.version,
            created_at: image.created_at,
            updated_at: image.updated_at,
            decks,
            cards,
        })
    }

    fn to_image(&self) -> FileImage {
        FileImage {
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            decks: self.decks.values().cloned().collect(),
            cards: self.cards.values().cloned().collect(),
        }
    }

    pub(crate) fn collection(&self, c: Collection) -> &IndexMap<String, Value> {
        match c {
            Collection::Decks => &self.decks,
            Collection::Cards => &self.cards,
        }
    }

    pub(crate) fn collection_mut(&mut self, c: Collection) -> &mut IndexMap<String, Value> {
        match c {
            Collection::Decks => &mut self.decks,
            Collection::Cards => &mut self.cards,
        }
    }

    /// Insert honoring the primary-key uniqueness constraint.
    pub(crate) fn insert_new(&mut self, c: Collection, doc: Value) -> Result<String, DbError> {
        let id = doc
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(DbError::MissingId(c.name()))?
            .to_string();
        let docs = self.collection_mut(c);
        if docs.contains_key(&id) {
            return Err(DbError::DuplicateId(id, c.name()));
        }
        docs.insert(id.clone(), doc);
        Ok(id)
    }
}

fn index_by_id(docs: Vec<Value>, c: Collection) -> Result<IndexMap<String, Value>, CoreError> {
    let mut map = IndexMap::with_capacity(docs.len());
    for doc in docs {
        let id = doc
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(CoreError::Corrupt {
                collection: c.name(),
                reason: "document has no string id".into(),
            })?
            .to_string();
        map.insert(id, doc);
    }
    Ok(map)
}

/// Capacity of the change-event channel. Slow subscribers that fall behind
/// see a lag and coalesce to a single re-query.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

pub struct VocabDb {
    path: Option<PathBuf>,
    backups_dir: Option<PathBuf>,
    max_backups: usize,
    state: RwLock<DbState>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl VocabDb {
    /// Volatile store for tests and `--ephemeral` runs.
    pub fn in_memory() -> Self {
        let image = FileImage::new_empty();
        let state = DbState::from_image(image).expect("empty image is well-formed");
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            path: None,
            backups_dir: None,
            max_backups: 0,
            state: RwLock::new(state),
            changes,
        }
    }

    pub async fn open_default() -> Result<Self, CoreError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, 10).await
    }

    /// Idempotent: creates the file and empty collections when absent, loads
    /// and migrates when present. A migration failure leaves the on-disk
    /// store untouched and the database unopened.
    pub async fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, CoreError> {
        ensure_parent_dirs(&path).map_err(normalize("open database"))?;
        ensure_dir(&backups_dir).map_err(normalize("open database"))?;

        let image = load_or_init(&path).await.map_err(normalize("open database"))?;
        let loaded_version = image.version;
        let image = schema::migrate_image(image)?;
        let state = DbState::from_image(image)?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let db = Self {
            path: Some(path),
            backups_dir: Some(backups_dir),
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
            changes,
        };

        if loaded_version != CURRENT_VERSION {
            tracing::info!(from = loaded_version, to = CURRENT_VERSION, "persisting migrated store");
            db.save().await.map_err(normalize("migrate database"))?;
        }
        Ok(db)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Run a read against a consistent snapshot of the state.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&DbState) -> R) -> R {
        f(&self.state.read())
    }

    /// All documents of a collection, in insertion order.
    pub(crate) fn all_docs(&self, c: Collection) -> Vec<Value> {
        self.with_state(|s| s.collection(c).values().cloned().collect())
    }

    pub(crate) fn get_doc(&self, c: Collection, id: &str) -> Option<Value> {
        self.with_state(|s| s.collection(c).get(id).cloned())
    }

    pub(crate) fn count_all(&self, c: Collection) -> usize {
        self.with_state(|s| s.collection(c).len())
    }

    /// Equality lookup, only permitted against declared indexed fields.
    pub(crate) fn find_eq(
        &self,
        c: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, DbError> {
        assert_indexed(c, field)?;
        Ok(self.with_state(|s| {
            s.collection(c)
                .values()
                .filter(|doc| doc.get(field) == Some(value))
                .cloned()
                .collect()
        }))
    }

    pub(crate) fn count_eq(&self, c: Collection, field: &str, value: &Value) -> Result<usize, DbError> {
        assert_indexed(c, field)?;
        Ok(self.with_state(|s| {
            s.collection(c)
                .values()
                .filter(|doc| doc.get(field) == Some(value))
                .count()
        }))
    }

    /// One write transaction: mutate under the lock, persist, then notify.
    /// When `f` fails nothing is persisted and no events fire. The closure
    /// returns the collections it touched.
    pub(crate) async fn commit<R>(
        &self,
        f: impl FnOnce(&mut DbState) -> Result<(R, Vec<Collection>), DbError>,
    ) -> Result<R, DbError> {
        let (result, mut touched) = {
            let mut s = self.state.write();
            let out = f(&mut s)?;
            s.updated_at = Utc::now();
            out
        };
        self.save().await?;

        touched.dedup();
        for collection in touched {
            // No subscribers is fine; the send result is informational only.
            let _ = self.changes.send(ChangeEvent { collection });
        }
        Ok(result)
    }

    async fn save(&self) -> Result<(), DbError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let image = self.with_state(|s| s.to_image());
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;

        task::spawn_blocking(move || write_with_backup(&path, backups.as_deref(), keep, &image))
            .await
            .map_err(|_| DbError::Join)??;
        Ok(())
    }
}

fn assert_indexed(c: Collection, field: &str) -> Result<(), DbError> {
    if c.schema().is_indexed(field) {
        Ok(())
    } else {
        Err(DbError::NotIndexed {
            collection: c.name(),
            field: field.to_string(),
        })
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), DbError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), DbError> {
    fs::create_dir_all(path)?;
    Ok(())
}

async fn load_or_init(path: &Path) -> Result<FileImage, DbError> {
    if path.exists() {
        let p = path.to_path_buf();
        let image = task::spawn_blocking(move || -> Result<FileImage, DbError> {
            let mut f = fs::File::open(&p)?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            Ok(serde_json::from_str::<FileImage>(&buf)?)
        })
        .await
        .map_err(|_| DbError::Join)??;
        Ok(image)
    } else {
        let image = FileImage::new_empty();
        write_with_backup(path, None, 0, &image)?;
        Ok(image)
    }
}

fn write_with_backup(
    path: &Path,
    backups_dir: Option<&Path>,
    max_backups: usize,
    image: &FileImage,
) -> Result<(), DbError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(image)?;
    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| DbError::Io(e.error))?;

    if let Some(backups) = backups_dir {
        fs::create_dir_all(backups)?;
        let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let backup_path = backups.join(format!("memvocab-{ts}.json"));
        let mut btmp = NamedTempFile::new_in(backups)?;
        btmp.write_all(&json)?;
        btmp.flush()?;
        btmp.persist(&backup_path).map_err(|e| DbError::Io(e.error))?;
        rotate_backups(backups, max_backups)?;
    }

    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), DbError> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    entries.sort_by_key(|e| e.metadata().and_then(|m| m.modified()).ok());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(e.path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deck_doc(id: &str) -> Value {
        json!({"id": id, "topic": "T", "languageFrom": "Polish", "languageTo": "English"})
    }

    fn card_doc(id: &str, deck_id: &str) -> Value {
        json!({
            "id": id, "deckId": deck_id, "sourceLanguage": "Polish", "targetLanguage": "English",
            "sourceWord": "Tak", "targetWord": "Yes", "pronunciation": "/tak/"
        })
    }

    #[tokio::test]
    async fn commit_inserts_and_reads_back() {
        let db = VocabDb::in_memory();
        db.commit(|s| {
            s.insert_new(Collection::Decks, deck_doc("d1"))?;
            Ok(((), vec![Collection::Decks]))
        })
        .await
        .unwrap();

        assert_eq!(db.count_all(Collection::Decks), 1);
        assert!(db.get_doc(Collection::Decks, "d1").is_some());
        assert!(db.get_doc(Collection::Decks, "nope").is_none());
    }

    #[tokio::test]
    async fn duplicate_primary_key_is_rejected() {
        let db = VocabDb::in_memory();
        db.commit(|s| {
            s.insert_new(Collection::Decks, deck_doc("d1"))?;
            Ok(((), vec![Collection::Decks]))
        })
        .await
        .unwrap();

        let err = db
            .commit(|s| {
                s.insert_new(Collection::Decks, deck_doc("d1"))?;
                Ok(((), vec![Collection::Decks]))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateId(id, "decks") if id == "d1"));
        // The failed transaction left nothing behind.
        assert_eq!(db.count_all(Collection::Decks), 1);
    }

    #[tokio::test]
    async fn equality_lookups_require_an_index() {
        let db = VocabDb::in_memory();
        db.commit(|s| {
            s.insert_new(Collection::Cards, card_doc("c1", "d1"))?;
            s.insert_new(Collection::Cards, card_doc("c2", "d2"))?;
            Ok(((), vec![Collection::Cards]))
        })
        .await
        .unwrap();

        let hits = db.find_eq(Collection::Cards, "deckId", &json!("d1")).unwrap();
        assert_eq!(hits.len(), 1);

        let err = db
            .find_eq(Collection::Cards, "nonIndexedField", &json!("x"))
            .unwrap_err();
        assert!(matches!(err, DbError::NotIndexed { .. }));
    }

    #[tokio::test]
    async fn committed_writes_publish_change_events() {
        let db = VocabDb::in_memory();
        let mut rx = db.subscribe();
        db.commit(|s| {
            s.insert_new(Collection::Cards, card_doc("c1", "d1"))?;
            Ok(((), vec![Collection::Cards]))
        })
        .await
        .unwrap();

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.collection, Collection::Cards);
    }

    #[tokio::test]
    async fn failed_transaction_publishes_nothing() {
        let db = VocabDb::in_memory();
        let mut rx = db.subscribe();
        let _ = db
            .commit(|s| {
                s.insert_new(Collection::Cards, json!({"noId": true}))?;
                Ok(((), vec![Collection::Cards]))
            })
            .await
            .unwrap_err();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn open_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("memvocab.json");
        let backups = dir.path().join("backups");

        {
            let db = VocabDb::open_with(file.clone(), backups.clone(), 3).await.unwrap();
            db.commit(|s| {
                s.insert_new(Collection::Decks, deck_doc("d1"))?;
                s.insert_new(Collection::Cards, card_doc("c1", "d1"))?;
                Ok(((), vec![Collection::Decks, Collection::Cards]))
            })
            .await
            .unwrap();
        }

        let db = VocabDb::open_with(file, backups, 3).await.unwrap();
        assert_eq!(db.count_all(Collection::Decks), 1);
        assert_eq!(db.count_all(Collection::Cards), 1);
    }

    #[tokio::test]
    async fn open_migrates_legacy_image_and_strips_amount() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("memvocab.json");
        let backups = dir.path().join("backups");

        let legacy = json!({
            "version": 1,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "decks": [
                {"id": "d1", "topic": "Legacy", "languageFrom": "Polish", "languageTo": "English", "amount": 30},
                {"id": "d2", "topic": "Other", "languageFrom": "French", "languageTo": "English", "amount": 4}
            ],
            "cards": []
        });
        fs::write(&file, serde_json::to_vec_pretty(&legacy).unwrap()).unwrap();

        let db = VocabDb::open_with(file.clone(), backups, 3).await.unwrap();
        assert_eq!(db.count_all(Collection::Decks), 2);
        for doc in db.all_docs(Collection::Decks) {
            assert!(doc.get("amount").is_none());
        }

        // The migrated image is what hit the disk.
        let raw: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(raw["version"], 2);
        assert!(raw["decks"][0].get("amount").is_none());
    }
}
