use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, client-generated identifiers. Seed data ships fixed ids such as
/// `default-deck-1`; everything else gets a v4 uuid string.
pub type DeckId = String;
pub type CardId = String;

/// A named topic grouping a set of translation cards.
///
/// `amount` is intentionally absent: the card count is derived at read time
/// (see [`DeckWithAmount`]) and never persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub language_from: String,
    pub language_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_to_ai_agent: Option<String>,
}

impl Deck {
    pub fn new(
        topic: impl Into<String>,
        language_from: impl Into<String>,
        language_to: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            description: None,
            language_from: language_from.into(),
            language_to: language_to.into(),
            prompt_to_ai_agent: None,
        }
    }
}

/// A deck decorated with its live card count.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckWithAmount {
    #[serde(flatten)]
    pub deck: Deck,
    pub amount: usize,
}

/// One source/target translation pair belonging to exactly one deck.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub deck_id: DeckId,
    pub source_language: String,
    pub target_language: String,
    pub source_word: String,
    pub target_word: String,
    pub pronunciation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl Card {
    pub fn new(
        deck_id: impl Into<DeckId>,
        source_word: impl Into<String>,
        target_word: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            deck_id: deck_id.into(),
            source_language: String::new(),
            target_language: String::new(),
            source_word: source_word.into(),
            target_word: target_word.into(),
            pronunciation: String::new(),
            remark: None,
        }
    }
}

/// Partial update for a deck. `id` is immutable and not patchable.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckPatch {
    pub topic: Option<String>,
    pub description: Option<String>,
    pub language_from: Option<String>,
    pub language_to: Option<String>,
    pub prompt_to_ai_agent: Option<String>,
}

impl DeckPatch {
    pub fn apply_to(&self, deck: &mut Deck) {
        if let Some(t) = &self.topic {
            deck.topic = t.clone();
        }
        if let Some(d) = &self.description {
            deck.description = Some(d.clone());
        }
        if let Some(f) = &self.language_from {
            deck.language_from = f.clone();
        }
        if let Some(t) = &self.language_to {
            deck.language_to = t.clone();
        }
        if let Some(p) = &self.prompt_to_ai_agent {
            deck.prompt_to_ai_agent = Some(p.clone());
        }
    }
}

/// Partial update for a card. `id` is immutable; `deck_id` is patchable so a
/// card can be moved between decks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    pub deck_id: Option<DeckId>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub source_word: Option<String>,
    pub target_word: Option<String>,
    pub pronunciation: Option<String>,
    pub remark: Option<String>,
}

impl CardPatch {
    pub fn apply_to(&self, card: &mut Card) {
        if let Some(d) = &self.deck_id {
            card.deck_id = d.clone();
        }
        if let Some(s) = &self.source_language {
            card.source_language = s.clone();
        }
        if let Some(t) = &self.target_language {
            card.target_language = t.clone();
        }
        if let Some(s) = &self.source_word {
            card.source_word = s.clone();
        }
        if let Some(t) = &self.target_word {
            card.target_word = t.clone();
        }
        if let Some(p) = &self.pronunciation {
            card.pronunciation = p.clone();
        }
        if let Some(r) = &self.remark {
            card.remark = Some(r.clone());
        }
    }
}
