//! Application state for one deck's card set.
//!
//! Same contract as the decks store: explicit flags, guarded initialize,
//! cache reconciled against the repository after every successful write,
//! errors stored for display and returned to the caller.

use memvocab_core::{Card, CardRepository, CoreError};
use memvocab_store::SeedService;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct CardsSnapshot {
    pub cards: Vec<Card>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_initialized: bool,
}

pub struct CardsStore {
    repo: Arc<dyn CardRepository>,
    seeder: Arc<SeedService>,
    state: RwLock<CardsSnapshot>,
}

impl CardsStore {
    pub fn new(repo: Arc<dyn CardRepository>, seeder: Arc<SeedService>) -> Self {
        Self {
            repo,
            seeder,
            state: RwLock::new(CardsSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> CardsSnapshot {
        self.state.read().clone()
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    pub fn clear_cards(&self) {
        self.state.write().cards = Vec::new();
    }

    fn begin_initialize(&self) -> bool {
        let mut s = self.state.write();
        if s.has_initialized || s.is_loading {
            return false;
        }
        s.is_loading = true;
        s.error = None;
        true
    }

    fn begin_action(&self) {
        let mut s = self.state.write();
        s.is_loading = true;
        s.error = None;
    }

    fn fail_action(&self, e: &CoreError) {
        let mut s = self.state.write();
        s.is_loading = false;
        s.error = Some(e.to_string());
    }

    /// Seed the deck's defaults when it is empty, then cache its card set.
    /// Guarded exactly like `DecksStore::initialize`; seeding failures are
    /// soft.
    pub async fn initialize(&self, deck_id: &str) {
        if !self.begin_initialize() {
            return;
        }

        let result = self.seeder.ensure_default_cards(deck_id).await;

        let mut s = self.state.write();
        s.is_loading = false;
        s.has_initialized = true;
        match result {
            Ok(cards) => s.cards = cards,
            Err(e) => {
                tracing::warn!(error = %e, deck_id, "card initialization failed, continuing unseeded");
                s.error = Some(e.to_string());
            }
        }
    }

    pub async fn retry(&self, deck_id: &str) {
        {
            let mut s = self.state.write();
            s.has_initialized = false;
            s.error = None;
        }
        self.initialize(deck_id).await;
    }

    /// Bulk replace-on-edit: swap the deck's whole card set, then reconcile
    /// the cache against what the repository now returns.
    pub async fn save_cards(&self, cards: &[Card], deck_id: Option<&str>) -> Result<(), CoreError> {
        self.begin_action();
        if let Err(e) = self.repo.save_all(cards, deck_id).await {
            self.fail_action(&e);
            return Err(e);
        }
        if let Some(did) = deck_id {
            self.reconcile(did).await;
        } else {
            let mut s = self.state.write();
            s.cards = cards.to_vec();
            s.is_loading = false;
        }
        Ok(())
    }

    /// Load a deck's cards from storage into the cache.
    pub async fn load_cards(&self, deck_id: &str) -> Result<(), CoreError> {
        self.begin_action();
        match self.repo.get_by_deck(deck_id).await {
            Ok(cards) => {
                let mut s = self.state.write();
                s.cards = cards;
                s.is_loading = false;
                s.has_initialized = true;
                Ok(())
            }
            Err(e) => {
                self.fail_action(&e);
                Err(e)
            }
        }
    }

    /// Delete every card of the deck; the store goes back to uninitialized
    /// so the next mount can reseed.
    pub async fn clear_stored_cards(&self, deck_id: &str) -> Result<(), CoreError> {
        self.begin_action();
        if let Err(e) = self.repo.delete_by_deck(deck_id).await {
            self.fail_action(&e);
            return Err(e);
        }
        let mut s = self.state.write();
        s.cards = Vec::new();
        s.is_loading = false;
        s.has_initialized = false;
        Ok(())
    }

    pub async fn stored_cards_count(&self, deck_id: Option<&str>) -> Result<usize, CoreError> {
        match self.repo.count(deck_id).await {
            Ok(n) => Ok(n),
            Err(e) => {
                self.state.write().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn search_cards(
        &self,
        query: &str,
        deck_id: Option<&str>,
    ) -> Result<Vec<Card>, CoreError> {
        match self.repo.search(query, deck_id).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                self.state.write().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn reconcile(&self, deck_id: &str) {
        match self.repo.get_by_deck(deck_id).await {
            Ok(cards) => {
                let mut s = self.state.write();
                s.cards = cards;
                s.is_loading = false;
            }
            Err(e) => self.fail_action(&e),
        }
    }
}
