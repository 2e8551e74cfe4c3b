//! Card repository over the embedded store.
//!
//! Mirrors the operation set the UI needs: deck-scoped reads, bulk
//! replace-on-edit, single-card CRUD, counts and substring search. Every
//! storage failure is logged and normalized to a `CoreError::Storage`
//! domain message.

use crate::db::{normalize, Collection, VocabDb};
use async_trait::async_trait;
use memvocab_core::{
    card_matches, normalize_query, Card, CardId, CardPatch, CardRepository, CoreError,
};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct CardStore {
    db: Arc<VocabDb>,
}

impl CardStore {
    pub fn new(db: Arc<VocabDb>) -> Self {
        Self { db }
    }

    pub(crate) fn db(&self) -> &Arc<VocabDb> {
        &self.db
    }
}

fn decode(doc: Value) -> Result<Card, CoreError> {
    serde_json::from_value(doc).map_err(|e| CoreError::Corrupt {
        collection: "cards",
        reason: e.to_string(),
    })
}

#[async_trait]
impl CardRepository for CardStore {
    async fn get_by_deck(&self, deck_id: &str) -> Result<Vec<Card>, CoreError> {
        let docs = self
            .db
            .find_eq(Collection::Cards, "deckId", &json!(deck_id))
            .map_err(normalize("load cards"))?;
        docs.into_iter().map(decode).collect()
    }

    async fn save_all(&self, cards: &[Card], deck_id: Option<&str>) -> Result<(), CoreError> {
        let docs = cards
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Corrupt {
                collection: "cards",
                reason: e.to_string(),
            })?;
        let scope = deck_id.map(str::to_string);

        self.db
            .commit(move |s| {
                let existing = s.collection_mut(Collection::Cards);
                match scope.as_deref() {
                    Some(did) => existing
                        .retain(|_, doc| doc.get("deckId").and_then(Value::as_str) != Some(did)),
                    None => existing.clear(),
                }
                for doc in docs {
                    s.insert_new(Collection::Cards, doc)?;
                }
                Ok(((), vec![Collection::Cards]))
            })
            .await
            .map_err(normalize("save cards"))
    }

    async fn add(&self, card: &Card) -> Result<CardId, CoreError> {
        let doc = serde_json::to_value(card).map_err(|e| CoreError::Corrupt {
            collection: "cards",
            reason: e.to_string(),
        })?;
        self.db
            .commit(move |s| {
                let id = s.insert_new(Collection::Cards, doc)?;
                Ok((id, vec![Collection::Cards]))
            })
            .await
            .map_err(normalize("add card"))
    }

    async fn update(&self, id: &str, patch: CardPatch) -> Result<usize, CoreError> {
        let id = id.to_string();
        self.db
            .commit(move |s| {
                let docs = s.collection_mut(Collection::Cards);
                let Some(doc) = docs.get_mut(&id) else {
                    return Ok((0, Vec::new()));
                };
                let mut card: Card = serde_json::from_value(doc.clone())?;
                patch.apply_to(&mut card);
                *doc = serde_json::to_value(&card)?;
                Ok((1, vec![Collection::Cards]))
            })
            .await
            .map_err(normalize("update card"))
    }

    async fn delete(&self, id: &str) -> Result<(), CoreError> {
        let id = id.to_string();
        self.db
            .commit(move |s| {
                let removed = s.collection_mut(Collection::Cards).shift_remove(&id);
                let touched = if removed.is_some() {
                    vec![Collection::Cards]
                } else {
                    Vec::new()
                };
                Ok(((), touched))
            })
            .await
            .map_err(normalize("delete card"))
    }

    async fn delete_by_deck(&self, deck_id: &str) -> Result<usize, CoreError> {
        let deck_id = deck_id.to_string();
        self.db
            .commit(move |s| {
                let docs = s.collection_mut(Collection::Cards);
                let before = docs.len();
                docs.retain(|_, doc| doc.get("deckId").and_then(Value::as_str) != Some(deck_id.as_str()));
                let removed = before - docs.len();
                let touched = if removed > 0 {
                    vec![Collection::Cards]
                } else {
                    Vec::new()
                };
                Ok((removed, touched))
            })
            .await
            .map_err(normalize("delete cards"))
    }

    async fn count(&self, deck_id: Option<&str>) -> Result<usize, CoreError> {
        match deck_id {
            Some(did) => self
                .db
                .count_eq(Collection::Cards, "deckId", &json!(did))
                .map_err(normalize("count cards")),
            None => Ok(self.db.count_all(Collection::Cards)),
        }
    }

    async fn exists(&self, deck_id: Option<&str>) -> Result<bool, CoreError> {
        Ok(self.count(deck_id).await? > 0)
    }

    async fn search(&self, query: &str, deck_id: Option<&str>) -> Result<Vec<Card>, CoreError> {
        let q = normalize_query(query);
        let docs = match deck_id {
            Some(did) => self
                .db
                .find_eq(Collection::Cards, "deckId", &json!(did))
                .map_err(normalize("search cards"))?,
            None => self.db.all_docs(Collection::Cards),
        };
        let cards = docs.into_iter().map(decode).collect::<Result<Vec<_>, _>>()?;
        Ok(cards.into_iter().filter(|c| card_matches(c, &q)).collect())
    }
}
