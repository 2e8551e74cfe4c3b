//! Deck repository over the embedded store.
//!
//! Decks come back decorated with their live card count (`amount`), computed
//! per deck from the card collection at read time. Deleting a deck cascades
//! to its cards inside the same transaction, so no reader can observe the
//! orphaned-card window the split-call pattern would leave.

use crate::db::{normalize, Collection, VocabDb};
use async_trait::async_trait;
use memvocab_core::{
    deck_matches, normalize_query, CoreError, Deck, DeckId, DeckPatch, DeckRepository,
    DeckWithAmount,
};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct DeckStore {
    db: Arc<VocabDb>,
}

impl DeckStore {
    pub fn new(db: Arc<VocabDb>) -> Self {
        Self { db }
    }

    pub(crate) fn db(&self) -> &Arc<VocabDb> {
        &self.db
    }

    fn amount_of(&self, deck_id: &str) -> Result<usize, CoreError> {
        self.db
            .count_eq(Collection::Cards, "deckId", &json!(deck_id))
            .map_err(normalize("count cards"))
    }

    fn decorate(&self, deck: Deck) -> Result<DeckWithAmount, CoreError> {
        let amount = self.amount_of(&deck.id)?;
        Ok(DeckWithAmount { deck, amount })
    }
}

fn decode(doc: Value) -> Result<Deck, CoreError> {
    serde_json::from_value(doc).map_err(|e| CoreError::Corrupt {
        collection: "decks",
        reason: e.to_string(),
    })
}

#[async_trait]
impl DeckRepository for DeckStore {
    async fn get_all(&self) -> Result<Vec<DeckWithAmount>, CoreError> {
        // One read for the decks, one count per deck. N+1 is fine at the
        // hundreds-of-decks scale this store serves.
        let docs = self.db.all_docs(Collection::Decks);
        docs.into_iter()
            .map(|doc| self.decorate(decode(doc)?))
            .collect()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<DeckWithAmount>, CoreError> {
        match self.db.get_doc(Collection::Decks, id) {
            Some(doc) => Ok(Some(self.decorate(decode(doc)?)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, deck: &Deck) -> Result<DeckId, CoreError> {
        let doc = serde_json::to_value(deck).map_err(|e| CoreError::Corrupt {
            collection: "decks",
            reason: e.to_string(),
        })?;
        self.db
            .commit(move |s| {
                let id = s.insert_new(Collection::Decks, doc)?;
                Ok((id, vec![Collection::Decks]))
            })
            .await
            .map_err(normalize("save deck"))
    }

    async fn save_many(&self, decks: &[Deck]) -> Result<(), CoreError> {
        let docs = decks
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Corrupt {
                collection: "decks",
                reason: e.to_string(),
            })?;
        self.db
            .commit(move |s| {
                for doc in docs {
                    s.insert_new(Collection::Decks, doc)?;
                }
                Ok(((), vec![Collection::Decks]))
            })
            .await
            .map_err(normalize("save decks"))
    }

    async fn update(&self, id: &str, patch: DeckPatch) -> Result<usize, CoreError> {
        let id = id.to_string();
        self.db
            .commit(move |s| {
                let docs = s.collection_mut(Collection::Decks);
                let Some(doc) = docs.get_mut(&id) else {
                    return Ok((0, Vec::new()));
                };
                let mut deck: Deck = serde_json::from_value(doc.clone())?;
                patch.apply_to(&mut deck);
                *doc = serde_json::to_value(&deck)?;
                Ok((1, vec![Collection::Decks]))
            })
            .await
            .map_err(normalize("update deck"))
    }

    async fn delete(&self, id: &str) -> Result<(), CoreError> {
        let id = id.to_string();
        self.db
            .commit(move |s| {
                let removed = s.collection_mut(Collection::Decks).shift_remove(&id);
                let mut touched = Vec::new();
                if removed.is_some() {
                    touched.push(Collection::Decks);
                }

                let cards = s.collection_mut(Collection::Cards);
                let before = cards.len();
                cards.retain(|_, doc| doc.get("deckId").and_then(Value::as_str) != Some(id.as_str()));
                if cards.len() != before {
                    touched.push(Collection::Cards);
                }
                Ok(((), touched))
            })
            .await
            .map_err(normalize("delete deck"))
    }

    async fn search(&self, query: &str) -> Result<Vec<DeckWithAmount>, CoreError> {
        let q = normalize_query(query);
        let docs = self.db.all_docs(Collection::Decks);
        let decks = docs.into_iter().map(decode).collect::<Result<Vec<_>, _>>()?;
        decks
            .into_iter()
            .filter(|d| deck_matches(d, &q))
            .map(|d| self.decorate(d))
            .collect()
    }

    async fn count(&self) -> Result<usize, CoreError> {
        Ok(self.db.count_all(Collection::Decks))
    }

    async fn exists(&self) -> Result<bool, CoreError> {
        Ok(self.db.count_all(Collection::Decks) > 0)
    }
}
