use crate::{Card, CardId, CardPatch, CoreError, Deck, DeckId, DeckPatch, DeckWithAmount};
use async_trait::async_trait;

/// CRUD and search over decks, decorated with live card counts.
#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// All decks, each carrying its computed card count.
    async fn get_all(&self) -> Result<Vec<DeckWithAmount>, CoreError>;

    /// A missing id is not an error.
    async fn get_by_id(&self, id: &str) -> Result<Option<DeckWithAmount>, CoreError>;

    async fn save(&self, deck: &Deck) -> Result<DeckId, CoreError>;

    /// Bulk insert, used by seeding.
    async fn save_many(&self, decks: &[Deck]) -> Result<(), CoreError>;

    /// Returns the number of affected records (0 when the id is unknown).
    async fn update(&self, id: &str, patch: DeckPatch) -> Result<usize, CoreError>;

    /// Removes the deck and all cards referencing it in one transaction.
    async fn delete(&self, id: &str) -> Result<(), CoreError>;

    /// Case-insensitive substring match on topic, description and the two
    /// language names. Blank queries return everything.
    async fn search(&self, query: &str) -> Result<Vec<DeckWithAmount>, CoreError>;

    async fn count(&self) -> Result<usize, CoreError>;
    async fn exists(&self) -> Result<bool, CoreError>;
}

/// CRUD, bulk replace and search over cards, scoped by deck where it matters.
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn get_by_deck(&self, deck_id: &str) -> Result<Vec<Card>, CoreError>;

    /// Replace semantics: delete the existing card set (for `deck_id` when
    /// given, otherwise the whole collection) and insert `cards`, atomically.
    /// Readers never observe the emptied intermediate state.
    async fn save_all(&self, cards: &[Card], deck_id: Option<&str>) -> Result<(), CoreError>;

    async fn add(&self, card: &Card) -> Result<CardId, CoreError>;

    /// Returns the number of affected records (0 when the id is unknown).
    async fn update(&self, id: &str, patch: CardPatch) -> Result<usize, CoreError>;

    async fn delete(&self, id: &str) -> Result<(), CoreError>;

    /// Returns how many cards were removed.
    async fn delete_by_deck(&self, deck_id: &str) -> Result<usize, CoreError>;

    async fn count(&self, deck_id: Option<&str>) -> Result<usize, CoreError>;
    async fn exists(&self, deck_id: Option<&str>) -> Result<bool, CoreError>;

    /// Case-insensitive substring match across words, languages,
    /// pronunciation and remark. Blank queries return the scoped full set.
    async fn search(&self, query: &str, deck_id: Option<&str>) -> Result<Vec<Card>, CoreError>;
}
