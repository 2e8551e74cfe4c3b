//! State-store behavior: guarded initialization, cache reconciliation, and
//! the store-the-error-and-return-it contract for mutations.

use async_trait::async_trait;
use memvocab_app::stores::{CardsStore, DecksStore};
use memvocab_core::{
    Card, CardRepository, CoreError, Deck, DeckId, DeckPatch, DeckRepository, DeckWithAmount,
};
use memvocab_store::{CardStore, DeckStore, SeedDelay, SeedService, VocabDb, DEFAULT_DECK_ID};
use std::sync::Arc;

struct Context {
    decks: Arc<DecksStore>,
    cards: Arc<CardsStore>,
    deck_repo: DeckStore,
    card_repo: CardStore,
}

fn context() -> Context {
    let db = Arc::new(VocabDb::in_memory());
    let deck_repo = DeckStore::new(db.clone());
    let card_repo = CardStore::new(db);
    let seeder = Arc::new(SeedService::with_delay(
        deck_repo.clone(),
        card_repo.clone(),
        SeedDelay::None,
    ));
    Context {
        decks: Arc::new(DecksStore::new(Arc::new(deck_repo.clone()), seeder.clone())),
        cards: Arc::new(CardsStore::new(Arc::new(card_repo.clone()), seeder)),
        deck_repo,
        card_repo,
    }
}

#[tokio::test]
async fn initialize_seeds_once_and_flips_flags() {
    let ctx = context();
    let before = ctx.decks.snapshot();
    assert!(!before.has_initialized);
    assert!(!before.is_loading);

    ctx.decks.initialize().await;
    let snap = ctx.decks.snapshot();
    assert!(snap.has_initialized);
    assert!(!snap.is_loading);
    assert!(snap.error.is_none());
    assert_eq!(snap.decks.len(), 1);
    assert_eq!(
        snap.current_deck.as_ref().map(|d| d.deck.id.as_str()),
        Some(DEFAULT_DECK_ID)
    );

    // A second call is a no-op; nothing gets duplicated.
    ctx.decks.initialize().await;
    assert_eq!(ctx.decks.snapshot().decks.len(), 1);
    assert_eq!(ctx.deck_repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_initialize_calls_seed_exactly_once() {
    let ctx = context();
    tokio::join!(ctx.decks.initialize(), ctx.decks.initialize());
    assert_eq!(ctx.deck_repo.count().await.unwrap(), 1);

    // Same guard on the cards side.
    tokio::join!(
        ctx.cards.initialize(DEFAULT_DECK_ID),
        ctx.cards.initialize(DEFAULT_DECK_ID)
    );
    assert_eq!(ctx.card_repo.count(Some(DEFAULT_DECK_ID)).await.unwrap(), 10);
}

#[tokio::test]
async fn mutations_reconcile_the_cache_with_the_repository() {
    let ctx = context();
    ctx.decks.initialize().await;

    let mut deck = Deck::new("Food", "Polish", "English");
    deck.id = "food".into();
    ctx.decks.create_deck(&deck).await.unwrap();

    let snap = ctx.decks.snapshot();
    assert_eq!(snap.decks.len(), 2);
    let repo_view = ctx.deck_repo.get_all().await.unwrap();
    assert_eq!(snap.decks, repo_view);
}

#[tokio::test]
async fn save_cards_replaces_and_reconciles() {
    let ctx = context();
    ctx.cards.initialize(DEFAULT_DECK_ID).await;
    assert_eq!(ctx.cards.snapshot().cards.len(), 10);

    let mut replacement = Card::new(DEFAULT_DECK_ID, "własny", "custom");
    replacement.id = "user-1".into();
    ctx.cards
        .save_cards(&[replacement], Some(DEFAULT_DECK_ID))
        .await
        .unwrap();

    let snap = ctx.cards.snapshot();
    assert_eq!(snap.cards.len(), 1);
    assert_eq!(snap.cards[0].id, "user-1");
    assert_eq!(snap.cards, ctx.card_repo.get_by_deck(DEFAULT_DECK_ID).await.unwrap());
}

#[tokio::test]
async fn deleting_the_current_deck_clears_it_and_cascades() {
    let ctx = context();
    ctx.decks.initialize().await;
    ctx.cards.initialize(DEFAULT_DECK_ID).await;
    assert_eq!(ctx.card_repo.count(Some(DEFAULT_DECK_ID)).await.unwrap(), 10);

    ctx.decks.delete_deck(DEFAULT_DECK_ID).await.unwrap();

    let snap = ctx.decks.snapshot();
    assert!(snap.current_deck.is_none());
    assert!(snap.decks.is_empty());
    assert_eq!(ctx.card_repo.count(Some(DEFAULT_DECK_ID)).await.unwrap(), 0);
}

#[tokio::test]
async fn clearing_cards_resets_initialization_for_reseed() {
    let ctx = context();
    ctx.cards.initialize(DEFAULT_DECK_ID).await;
    ctx.cards.clear_stored_cards(DEFAULT_DECK_ID).await.unwrap();

    let snap = ctx.cards.snapshot();
    assert!(snap.cards.is_empty());
    assert!(!snap.has_initialized);

    // The next mount seeds again, because the deck is empty again.
    ctx.cards.initialize(DEFAULT_DECK_ID).await;
    assert_eq!(ctx.cards.snapshot().cards.len(), 10);
}

/// A repository whose every operation fails, for exercising error paths.
struct BrokenDecks;

#[async_trait]
impl DeckRepository for BrokenDecks {
    async fn get_all(&self) -> Result<Vec<DeckWithAmount>, CoreError> {
        Err(CoreError::Storage("load decks"))
    }
    async fn get_by_id(&self, _id: &str) -> Result<Option<DeckWithAmount>, CoreError> {
        Err(CoreError::Storage("load deck"))
    }
    async fn save(&self, _deck: &Deck) -> Result<DeckId, CoreError> {
        Err(CoreError::Storage("save deck"))
    }
    async fn save_many(&self, _decks: &[Deck]) -> Result<(), CoreError> {
        Err(CoreError::Storage("save decks"))
    }
    async fn update(&self, _id: &str, _patch: DeckPatch) -> Result<usize, CoreError> {
        Err(CoreError::Storage("update deck"))
    }
    async fn delete(&self, _id: &str) -> Result<(), CoreError> {
        Err(CoreError::Storage("delete deck"))
    }
    async fn search(&self, _query: &str) -> Result<Vec<DeckWithAmount>, CoreError> {
        Err(CoreError::Storage("search decks"))
    }
    async fn count(&self) -> Result<usize, CoreError> {
        Err(CoreError::Storage("count decks"))
    }
    async fn exists(&self) -> Result<bool, CoreError> {
        Err(CoreError::Storage("count decks"))
    }
}

#[tokio::test]
async fn failed_mutation_stores_the_error_and_returns_it() {
    // Seeder over a healthy in-memory store; only the injected repo fails.
    let db = Arc::new(VocabDb::in_memory());
    let seeder = Arc::new(SeedService::with_delay(
        DeckStore::new(db.clone()),
        CardStore::new(db),
        SeedDelay::None,
    ));
    let store = DecksStore::new(Arc::new(BrokenDecks), seeder);

    let deck = Deck::new("Food", "Polish", "English");
    let err = store.create_deck(&deck).await.unwrap_err();
    assert_eq!(err, CoreError::Storage("save deck"));

    let snap = store.snapshot();
    assert_eq!(
        snap.error.as_deref(),
        Some("failed to save deck in local storage")
    );
    assert!(!snap.is_loading);

    store.clear_error();
    assert!(store.snapshot().error.is_none());
}

#[tokio::test]
async fn initialization_failure_is_soft_and_retryable() {
    // The seeder itself runs against the broken repository, so seeding fails.
    let db = Arc::new(VocabDb::in_memory());
    let seeder = Arc::new(SeedService::with_delay(
        DeckStore::new(db.clone()),
        CardStore::new(db.clone()),
        SeedDelay::None,
    ));
    let store = DecksStore::new(Arc::new(BrokenDecks), seeder.clone());

    store.initialize().await;
    let snap = store.snapshot();
    // Seeding succeeded (healthy seeder) but the repo read failed; either
    // way the store degrades without panicking and stays initialized.
    assert!(snap.has_initialized);
    assert!(snap.error.is_some());
    assert!(snap.decks.is_empty());

    // A healthy store retries into a working state.
    let healthy = DecksStore::new(Arc::new(DeckStore::new(Arc::new(VocabDb::in_memory()))), {
        let db = Arc::new(VocabDb::in_memory());
        Arc::new(SeedService::with_delay(
            DeckStore::new(db.clone()),
            CardStore::new(db),
            SeedDelay::None,
        ))
    });
    healthy.initialize().await;
    assert!(healthy.snapshot().has_initialized);
}
