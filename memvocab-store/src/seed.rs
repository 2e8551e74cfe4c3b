//! First-run seeding.
//!
//! Guarantees the app has usable data on first load without ever clobbering
//! user data: defaults are written only when the target collection is empty.
//! The simulated fetch delay keeps realistic async-loading states in UI
//! builds; tests run with [`SeedDelay::None`].

use crate::cards::CardStore;
use crate::decks::DeckStore;
use memvocab_core::{Card, CardRepository, CoreError, Deck, DeckRepository, DeckWithAmount};
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_DECK_ID: &str = "default-deck-1";

fn default_decks() -> Vec<Deck> {
    vec![Deck {
        id: DEFAULT_DECK_ID.into(),
        topic: "Polish Common Phrases".into(),
        description: Some("Essential Polish phrases for everyday conversation".into()),
        language_from: "Polish".into(),
        language_to: "English".into(),
        prompt_to_ai_agent: Some(
            "Please create JSON with Polish common phrases and their English translations, \
             including pronunciation and remarks for context."
                .into(),
        ),
    }]
}

fn phrase(
    n: usize,
    deck_id: &str,
    source: &str,
    target: &str,
    pronunciation: &str,
    remark: Option<&str>,
) -> Card {
    // Ids are scoped by deck: the primary key is unique across the whole
    // collection, and more than one deck can be seeded.
    Card {
        id: format!("{deck_id}-card-{n}"),
        deck_id: deck_id.into(),
        source_language: "Polish".into(),
        target_language: "English".into(),
        source_word: source.into(),
        target_word: target.into(),
        pronunciation: pronunciation.into(),
        remark: remark.map(Into::into),
    }
}

fn default_cards(deck_id: &str) -> Vec<Card> {
    vec![
        phrase(
            1,
            deck_id,
            "Dzień dobry",
            "Good morning / Good day",
            "/d͡ʑɛɲ ˈdɔbrɨ/",
            Some("Formal greeting used until afternoon"),
        ),
        phrase(
            2,
            deck_id,
            "Do widzenia",
            "Goodbye",
            "/dɔ viˈd͡zɛɲa/",
            Some("Formal farewell, literally 'until seeing'"),
        ),
        phrase(
            3,
            deck_id,
            "Cześć",
            "Hi / Hello / Bye (informal)",
            "/t͡ʂɛɕt͡ɕ/",
            Some("Informal greeting, also used for goodbye"),
        ),
        phrase(
            4,
            deck_id,
            "Proszę",
            "Please",
            "/ˈprɔʂɛ/",
            Some("Also means 'you're welcome' or 'here you go'"),
        ),
        phrase(5, deck_id, "Dziękuję", "Thank you", "/d͡ʑɛŋˈkujɛ/", None),
        phrase(
            6,
            deck_id,
            "Przepraszam",
            "Sorry",
            "/pʂɛˈpraʂam/",
            Some("Also used for 'excuse me' to get attention"),
        ),
        phrase(7, deck_id, "Tak", "Yes", "/tak/", None),
        phrase(8, deck_id, "Nie", "No", "/ɲɛ/", None),
        phrase(
            9,
            deck_id,
            "Na zdrowie",
            "Cheers / Bless you",
            "/na ˈzdrɔvjɛ/",
            Some("Said when toasting, or after a sneeze"),
        ),
        phrase(
            10,
            deck_id,
            "Smacznego",
            "Enjoy your meal",
            "/smat͡ʂˈnɛɡɔ/",
            Some("Said before eating, like 'bon appétit'"),
        ),
    ]
}

/// Whether to simulate the network-like fetch latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedDelay {
    /// Random 500–1500 ms wait before resolving.
    Simulated,
    None,
}

pub struct SeedService {
    decks: DeckStore,
    cards: CardStore,
    delay: SeedDelay,
}

impl SeedService {
    pub fn new(decks: DeckStore, cards: CardStore) -> Self {
        Self::with_delay(decks, cards, SeedDelay::Simulated)
    }

    pub fn with_delay(decks: DeckStore, cards: CardStore, delay: SeedDelay) -> Self {
        Self {
            decks,
            cards,
            delay,
        }
    }

    async fn simulate_fetch(&self) {
        if self.delay == SeedDelay::Simulated {
            let ms = rand::thread_rng().gen_range(500..=1500);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Seed the built-in deck list when the collection is empty, otherwise
    /// return existing decks unchanged. Safe to call any number of times.
    pub async fn ensure_default_decks(&self) -> Result<Vec<DeckWithAmount>, CoreError> {
        self.simulate_fetch().await;
        if !self.decks.exists().await? {
            tracing::info!("deck collection is empty, seeding defaults");
            self.decks.save_many(&default_decks()).await?;
        }
        self.decks.get_all().await
    }

    /// Per-deck analogue: seed the built-in card list only when the deck
    /// currently has zero cards.
    pub async fn ensure_default_cards(&self, deck_id: &str) -> Result<Vec<Card>, CoreError> {
        self.simulate_fetch().await;
        if !self.cards.exists(Some(deck_id)).await? {
            tracing::info!(deck_id, "deck has no cards, seeding defaults");
            self.cards
                .save_all(&default_cards(deck_id), Some(deck_id))
                .await?;
        }
        self.cards.get_by_deck(deck_id).await
    }

    /// The deck the UI lands on first; seeds when necessary.
    pub async fn default_deck(&self) -> Result<DeckWithAmount, CoreError> {
        let decks = self.ensure_default_decks().await?;
        decks
            .into_iter()
            .next()
            .ok_or(CoreError::Storage("load default deck"))
    }
}
