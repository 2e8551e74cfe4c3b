//! Application state for the deck list.
//!
//! Caches what the repository would return, owns the explicit
//! loading/error/initialized flags, and guards `initialize` so that any
//! number of concurrently mounted consumers trigger seeding exactly once.
//! The cached collection is re-fetched after each successful mutation, so
//! it always reconciles to the repository's view.

use memvocab_core::{CoreError, Deck, DeckId, DeckPatch, DeckRepository, DeckWithAmount};
use memvocab_store::SeedService;
use parking_lot::RwLock;
use std::sync::Arc;

/// A point-in-time copy of the store's state for rendering.
#[derive(Clone, Debug, Default)]
pub struct DecksSnapshot {
    pub decks: Vec<DeckWithAmount>,
    pub current_deck: Option<DeckWithAmount>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_initialized: bool,
}

pub struct DecksStore {
    repo: Arc<dyn DeckRepository>,
    seeder: Arc<SeedService>,
    state: RwLock<DecksSnapshot>,
}

impl DecksStore {
    pub fn new(repo: Arc<dyn DeckRepository>, seeder: Arc<SeedService>) -> Self {
        Self {
            repo,
            seeder,
            state: RwLock::new(DecksSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> DecksSnapshot {
        self.state.read().clone()
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    pub fn set_current_deck(&self, deck: DeckWithAmount) {
        self.state.write().current_deck = Some(deck);
    }

    /// Returns false when another initialization is running or already done.
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

    /// Seed defaults when necessary and populate the cache. Repeated or
    /// concurrent calls are no-ops. Seeding failures are soft: the error is
    /// stored for display and the store still counts as initialized, so a
    /// mount storm cannot hammer a broken backend; `retry` starts over.
    pub async fn initialize(&self) {
        if !self.begin_initialize() {
            return;
        }

        let result = async {
            let current = self.seeder.default_deck().await?;
            let all = self.repo.get_all().await?;
            Ok::<_, CoreError>((current, all))
        }
        .await;

        let mut s = self.state.write();
        s.is_loading = false;
        s.has_initialized = true;
        match result {
            Ok((current, all)) => {
                s.current_deck = Some(current);
                s.decks = all;
            }
            Err(e) => {
                tracing::warn!(error = %e, "deck initialization failed, continuing unseeded");
                s.error = Some(e.to_string());
            }
        }
    }

    /// Clear the guard flags and run initialization again.
    pub async fn retry(&self) {
        {
            let mut s = self.state.write();
            s.has_initialized = false;
            s.error = None;
        }
        self.initialize().await;
    }

    /// Re-fetch the deck list into the cache.
    pub async fn refresh(&self) {
        self.begin_action();
        match self.repo.get_all().await {
            Ok(decks) => {
                let mut s = self.state.write();
                s.decks = decks;
                s.is_loading = false;
            }
            Err(e) => self.fail_action(&e),
        }
    }

    pub async fn get_deck_by_id(&self, id: &str) -> Result<Option<DeckWithAmount>, CoreError> {
        match self.repo.get_by_id(id).await {
            Ok(deck) => Ok(deck),
            Err(e) => {
                self.state.write().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Failures are stored for passive display *and* returned, so a caller
    /// awaiting the result can react immediately.
    pub async fn create_deck(&self, deck: &Deck) -> Result<DeckId, CoreError> {
        self.begin_action();
        let id = match self.repo.save(deck).await {
            Ok(id) => id,
            Err(e) => {
                self.fail_action(&e);
                return Err(e);
            }
        };
        self.reconcile().await;
        Ok(id)
    }

    pub async fn update_deck(&self, id: &str, patch: DeckPatch) -> Result<(), CoreError> {
        self.begin_action();
        if let Err(e) = self.repo.update(id, patch).await {
            self.fail_action(&e);
            return Err(e);
        }
        self.reconcile().await;

        // Keep the current deck in step when it was the one edited.
        let is_current = self
            .state
            .read()
            .current_deck
            .as_ref()
            .map(|d| d.deck.id == id)
            .unwrap_or(false);
        if is_current {
            if let Ok(Some(updated)) = self.repo.get_by_id(id).await {
                self.state.write().current_deck = Some(updated);
            }
        }
        Ok(())
    }

    /// Deletes the deck (the repository cascades to its cards) and drops it
    /// from the cache and from `current_deck` if it was selected.
    pub async fn delete_deck(&self, id: &str) -> Result<(), CoreError> {
        self.begin_action();
        if let Err(e) = self.repo.delete(id).await {
            self.fail_action(&e);
            return Err(e);
        }
        self.reconcile().await;

        let mut s = self.state.write();
        if s.current_deck.as_ref().map(|d| d.deck.id == id) == Some(true) {
            s.current_deck = None;
        }
        Ok(())
    }

    pub async fn search_decks(&self, query: &str) -> Result<Vec<DeckWithAmount>, CoreError> {
        match self.repo.search(query).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                self.state.write().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Pull the authoritative list back into the cache after a write.
    async fn reconcile(&self) {
        match self.repo.get_all().await {
            Ok(decks) => {
                let mut s = self.state.write();
                s.decks = decks;
                s.is_loading = false;
            }
            Err(e) => self.fail_action(&e),
        }
    }
}
