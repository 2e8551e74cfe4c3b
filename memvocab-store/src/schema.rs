//! Schema versions and forward-only migrations.
//!
//! Each version declares, per collection, the primary key and the full list
//! of secondary-indexed fields. Equality queries are only allowed against
//! declared fields, mirroring how an index-backed store behaves. Migrations
//! are pure functions over each full stored document; a version step either
//! rewrites every record or fails without touching the store.

use crate::db::FileImage;
use memvocab_core::CoreError;
use serde_json::Value;

pub type SchemaVersion = u32;

/// Schema version newly-created stores are written at.
pub const CURRENT_VERSION: SchemaVersion = 2;

/// Index declarations for one collection. Uniqueness holds only for the
/// primary key; secondary indexes permit equality lookups, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub indexes: &'static [&'static str],
}

impl CollectionSchema {
    pub fn is_indexed(&self, field: &str) -> bool {
        field == self.primary_key || self.indexes.contains(&field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub version: SchemaVersion,
    pub collections: &'static [CollectionSchema],
}

impl Schema {
    pub fn collection(&self, name: &str) -> Option<&'static CollectionSchema> {
        self.collections.iter().find(|c| c.name == name)
    }
}

/// v1 stored a denormalized `amount` on decks and indexed it.
static SCHEMA_V1: Schema = Schema {
    version: 1,
    collections: &[
        CollectionSchema {
            name: "decks",
            primary_key: "id",
            indexes: &[
                "topic",
                "description",
                "languageFrom",
                "languageTo",
                "amount",
            ],
        },
        CollectionSchema {
            name: "cards",
            primary_key: "id",
            indexes: &[
                "deckId",
                "sourceLanguage",
                "targetLanguage",
                "sourceWord",
                "targetWord",
                "pronunciation",
                "remark",
            ],
        },
    ],
};

/// v2 drops `amount` everywhere; the count is computed at read time.
static SCHEMA_V2: Schema = Schema {
    version: 2,
    collections: &[
        CollectionSchema {
            name: "decks",
            primary_key: "id",
            indexes: &["topic", "description", "languageFrom", "languageTo"],
        },
        CollectionSchema {
            name: "cards",
            primary_key: "id",
            indexes: &[
                "deckId",
                "sourceLanguage",
                "targetLanguage",
                "sourceWord",
                "targetWord",
                "pronunciation",
                "remark",
            ],
        },
    ],
};

pub fn schema(version: SchemaVersion) -> Option<&'static Schema> {
    match version {
        1 => Some(&SCHEMA_V1),
        2 => Some(&SCHEMA_V2),
        _ => None,
    }
}

pub fn current() -> &'static Schema {
    schema(CURRENT_VERSION).expect("current schema is always declared")
}

/// One forward version step. Both transforms receive the full prior-version
/// document and return the full next-version document.
struct MigrationStep {
    from: SchemaVersion,
    to: SchemaVersion,
    decks: fn(Value) -> Value,
    cards: fn(Value) -> Value,
}

fn identity(doc: Value) -> Value {
    doc
}

fn strip_deck_amount(mut doc: Value) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        obj.remove("amount");
    }
    doc
}

static STEPS: &[MigrationStep] = &[MigrationStep {
    from: 1,
    to: 2,
    decks: strip_deck_amount,
    cards: identity,
}];

/// Replay every pending step on an in-memory copy of the image. The caller
/// persists the result only when the whole chain succeeds, so a failed step
/// leaves the on-disk store at its prior version.
pub(crate) fn migrate_image(mut image: FileImage) -> Result<FileImage, CoreError> {
    if image.version > CURRENT_VERSION {
        return Err(CoreError::Migration {
            from: image.version,
            to: CURRENT_VERSION,
            reason: "store was written by a newer schema".into(),
        });
    }

    while image.version < CURRENT_VERSION {
        let step = STEPS
            .iter()
            .find(|s| s.from == image.version)
            .ok_or(CoreError::Migration {
                from: image.version,
                to: CURRENT_VERSION,
                reason: "no migration step declared for this version".into(),
            })?;

        for doc in &image.decks {
            ensure_object(doc, step)?;
        }
        for doc in &image.cards {
            ensure_object(doc, step)?;
        }

        image.decks = image.decks.into_iter().map(step.decks).collect();
        image.cards = image.cards.into_iter().map(step.cards).collect();
        image.version = step.to;
        tracing::debug!(from = step.from, to = step.to, "migrated store image");
    }

    Ok(image)
}

fn ensure_object(doc: &Value, step: &MigrationStep) -> Result<(), CoreError> {
    if doc.is_object() {
        Ok(())
    } else {
        Err(CoreError::Migration {
            from: step.from,
            to: step.to,
            reason: "record is not a JSON object".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FileImage;
    use serde_json::json;

    #[test]
    fn current_schema_has_no_deck_amount_index() {
        let decks = current().collection("decks").unwrap();
        assert!(!decks.is_indexed("amount"));
        assert!(decks.is_indexed("id"));
        assert!(decks.is_indexed("languageFrom"));
    }

    #[test]
    fn v1_indexed_amount() {
        let decks = schema(1).unwrap().collection("decks").unwrap();
        assert!(decks.is_indexed("amount"));
    }

    #[test]
    fn migration_strips_amount_from_every_deck() {
        let image = FileImage::empty_at_version(1)
            .with_decks(vec![
                json!({"id": "d1", "topic": "A", "languageFrom": "Polish", "languageTo": "English", "amount": 30}),
                json!({"id": "d2", "topic": "B", "languageFrom": "French", "languageTo": "English", "amount": 7}),
            ])
            .with_cards(vec![json!({
                "id": "c1", "deckId": "d1", "sourceLanguage": "Polish", "targetLanguage": "English",
                "sourceWord": "Tak", "targetWord": "Yes", "pronunciation": "/tak/"
            })]);

        let migrated = migrate_image(image).unwrap();
        assert_eq!(migrated.version, CURRENT_VERSION);
        assert_eq!(migrated.decks.len(), 2);
        for deck in &migrated.decks {
            assert!(deck.get("amount").is_none());
            assert!(deck.get("topic").is_some());
        }
        // Cards pass through unchanged.
        assert_eq!(migrated.cards.len(), 1);
        assert_eq!(migrated.cards[0]["sourceWord"], "Tak");
    }

    #[test]
    fn migration_is_a_noop_at_current_version() {
        let image = FileImage::empty_at_version(CURRENT_VERSION)
            .with_decks(vec![json!({"id": "d1", "topic": "A", "languageFrom": "x", "languageTo": "y"})]);
        let migrated = migrate_image(image).unwrap();
        assert_eq!(migrated.version, CURRENT_VERSION);
        assert_eq!(migrated.decks.len(), 1);
    }

    #[test]
    fn newer_store_version_is_rejected() {
        let image = FileImage::empty_at_version(CURRENT_VERSION + 1);
        let err = migrate_image(image).unwrap_err();
        assert!(matches!(err, CoreError::Migration { .. }));
    }

    #[test]
    fn malformed_record_fails_the_step() {
        let image = FileImage::empty_at_version(1).with_decks(vec![json!("not-an-object")]);
        let err = migrate_image(image).unwrap_err();
        assert!(matches!(err, CoreError::Migration { from: 1, to: 2, .. }));
    }
}
